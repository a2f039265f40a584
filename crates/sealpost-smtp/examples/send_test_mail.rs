#![allow(clippy::expect_used, clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: Probe a submission server and send a test message
//!
//! Detects whether the server offers STARTTLS or implicit TLS, then sends a
//! short HTML message with an inline logo through it.
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=sealpost_smtp=debug cargo run --package sealpost-smtp --example send_test_mail
//! ```

use sealpost_smtp::{
    Attachment, AuthMode, Charset, Completion, MailMessage, Security, Session, SessionConfig,
};
use std::io::{self, Write};

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("sealpost - SMTP send test");
    println!("=========================\n");

    let host = prompt("SMTP host")?;
    let port: u16 = prompt("Port [587]")?.parse().unwrap_or(587);
    let user = prompt("User name")?;
    let password = prompt("Password")?;
    let to = prompt("Send test message to")?;

    let probe = Session::new(
        SessionConfig::builder(&host)
            .port(port)
            .auth(AuthMode::Base64, &user, &password)
            .build(),
    );
    println!("\nDetecting security mode on {}:{}...", host, port);
    let security = match probe.detect_security().await {
        Ok(security) => security,
        Err(e) => {
            println!("✗ {}", e);
            println!("Falling back to STARTTLS");
            Security::StartTls
        }
    };
    println!("✓ Using {:?}", security);

    let config = SessionConfig::builder(&host)
        .port(port)
        .security(security)
        .auth(AuthMode::Base64, &user, &password)
        .build();
    let session = Session::new(config).with_observer(|c: &Completion<'_>| {
        if let Some(reply) = c.last_reply {
            println!("  last reply: {}", reply);
        }
    });

    let logo = Attachment::from_bytes("logo.txt", b"sealpost".to_vec()).inline();
    let message = MailMessage::new()
        .from(user.as_str())
        .to(to.as_str())
        .subject("sealpost test message ✉")
        .subject_charset(Charset::UTF_8)
        .html_body("<p>Hello from <b>sealpost</b>.</p><img src=\"cid:logo\">")
        .attach(logo.with_content_id("logo"));

    println!("Sending...");
    session.send_mail(&message).await?;
    println!("✓ Sent");

    Ok(())
}
