//! Message sink over an open DATA phase.

use crate::connection::Transport;
use crate::error::Result;
use sealpost_mime::MessageSink;

/// Buffered bytes are sent once they reach this size.
const FLUSH_THRESHOLD: usize = 8 * 1024;

/// Writes message lines to the server after `DATA` was accepted.
///
/// Lines starting with `.` are dot-stuffed. The end-of-data marker is not
/// written; call [`DataSink::finish`] and then send it as a command.
pub struct DataSink<'a, T> {
    transport: &'a mut T,
    buffer: Vec<u8>,
}

impl<'a, T: Transport> DataSink<'a, T> {
    /// Creates a sink writing to `transport`.
    pub fn new(transport: &'a mut T) -> Self {
        Self {
            transport,
            buffer: Vec::with_capacity(FLUSH_THRESHOLD),
        }
    }

    /// Sends whatever is still buffered.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport write fails.
    pub async fn finish(mut self) -> Result<()> {
        self.flush().await
    }

    async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.transport.send_data(&self.buffer).await?;
        self.buffer.clear();
        Ok(())
    }
}

impl<T: Transport> MessageSink for DataSink<'_, T> {
    async fn write_line(&mut self, line: &str) -> sealpost_mime::Result<()> {
        if line.starts_with('.') {
            self.buffer.push(b'.');
        }
        self.buffer.extend_from_slice(line.as_bytes());
        self.buffer.extend_from_slice(b"\r\n");

        if self.buffer.len() >= FLUSH_THRESHOLD {
            self.flush().await.map_err(sealpost_mime::Error::sink)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::connection::StreamTransport;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_dot_stuffing() {
        let mock = Builder::new()
            .write(b"Subject: x\r\n\r\n..hidden\r\nplain\r\n.\r\n")
            .build();
        let mut transport = StreamTransport::new(mock);

        let mut sink = DataSink::new(&mut transport);
        for line in ["Subject: x", "", ".hidden", "plain"] {
            sink.write_line(line).await.unwrap();
        }
        sink.finish().await.unwrap();
        transport.send_command(".").await.unwrap();
    }

    #[tokio::test]
    async fn test_large_body_is_flushed_in_chunks() {
        let line = "a".repeat(998);
        let mut expected = Vec::new();
        for _ in 0..20 {
            expected.extend_from_slice(line.as_bytes());
            expected.extend_from_slice(b"\r\n");
        }
        let mock = Builder::new()
            .write(&expected[..9_000])
            .write(&expected[9_000..18_000])
            .write(&expected[18_000..])
            .build();
        let mut transport = StreamTransport::new(mock);

        let mut sink = DataSink::new(&mut transport);
        for _ in 0..20 {
            sink.write_line(&line).await.unwrap();
        }
        sink.finish().await.unwrap();
    }
}
