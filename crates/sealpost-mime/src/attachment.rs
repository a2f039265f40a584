//! Attachments and the base64 attachment streamer.

use crate::content_type::{ContentType, escape_quoted};
use crate::encoding::{BASE64_LINE_BYTES, encode_base64};
use crate::error::{Error, Result};
use crate::sink::MessageSink;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Source blocks are read in whole base64 lines.
const READ_BLOCK: usize = BASE64_LINE_BYTES * 64;

/// Where an attachment's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// A file opened when the message is sent.
    File(PathBuf),
    /// Bytes held in memory.
    Memory(Bytes),
}

/// How an attachment relates to the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Placement {
    /// Referenced from an HTML body by Content-ID.
    Inline,
    /// A regular attachment.
    #[default]
    Attached,
}

impl Placement {
    /// Content-Disposition value.
    #[must_use]
    pub const fn disposition(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attached => "attachment",
        }
    }
}

/// A file or in-memory attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Byte source.
    pub source: AttachmentSource,
    /// Display name, used for `name=` and `filename=`.
    pub name: String,
    /// Content type of the payload.
    pub content_type: ContentType,
    /// Explicit Content-ID.
    pub content_id: Option<String>,
    /// Placement relative to the body.
    pub placement: Placement,
}

impl Attachment {
    /// Attaches a file; the display name is the file name.
    #[must_use]
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            source: AttachmentSource::File(path),
            name,
            content_type: ContentType::octet_stream(),
            content_id: None,
            placement: Placement::Attached,
        }
    }

    /// Attaches in-memory bytes under a display name.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            source: AttachmentSource::Memory(data.into()),
            name: name.into(),
            content_type: ContentType::octet_stream(),
            content_id: None,
            placement: Placement::Attached,
        }
    }

    /// Sets the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Sets an explicit Content-ID.
    #[must_use]
    pub fn with_content_id(mut self, id: impl Into<String>) -> Self {
        self.content_id = Some(id.into());
        self
    }

    /// Marks the attachment as inline.
    #[must_use]
    pub const fn inline(mut self) -> Self {
        self.placement = Placement::Inline;
        self
    }

    /// Content-ID without angle brackets.
    ///
    /// Falls back to the display name's stem with spaces replaced by hyphens.
    #[must_use]
    pub fn content_id(&self) -> String {
        match self.content_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => Path::new(&self.name)
                .file_stem()
                .map(|stem| stem.to_string_lossy().replace(' ', "-"))
                .unwrap_or_default(),
        }
    }

    fn header_lines(&self) -> [String; 4] {
        let escaped = escape_quoted(&self.name);
        [
            format!("Content-Type: {}; name=\"{escaped}\"", self.content_type),
            "Content-Transfer-Encoding: base64".to_string(),
            format!(
                "Content-Disposition: {}; filename=\"{escaped}\"",
                self.placement.disposition()
            ),
            format!("Content-ID: <{}>", self.content_id()),
        ]
    }

    fn io_error(&self, source: std::io::Error) -> Error {
        Error::Attachment {
            name: self.name.clone(),
            source,
        }
    }

    /// Streams this attachment as one MIME part preceded by `--boundary`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Attachment`] if the source cannot be read, or the
    /// sink's error.
    pub async fn write_part<S: MessageSink>(&self, sink: &mut S, boundary: &str) -> Result<()> {
        sink.write_line(&format!("--{boundary}")).await?;
        for line in self.header_lines() {
            sink.write_line(&line).await?;
        }
        sink.write_line("").await?;

        match &self.source {
            AttachmentSource::Memory(data) => {
                for chunk in data.chunks(BASE64_LINE_BYTES) {
                    sink.write_line(&encode_base64(chunk)).await?;
                }
            }
            AttachmentSource::File(path) => {
                let mut file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| self.io_error(e))?;
                let mut pending = Vec::with_capacity(READ_BLOCK);
                let mut block = vec![0u8; READ_BLOCK];
                loop {
                    let n = file.read(&mut block).await.map_err(|e| self.io_error(e))?;
                    if n == 0 {
                        break;
                    }
                    pending.extend_from_slice(&block[..n]);
                    let whole = pending.len() - pending.len() % BASE64_LINE_BYTES;
                    for chunk in pending[..whole].chunks(BASE64_LINE_BYTES) {
                        sink.write_line(&encode_base64(chunk)).await?;
                    }
                    pending.drain(..whole);
                }
                if !pending.is_empty() {
                    sink.write_line(&encode_base64(&pending)).await?;
                }
            }
        }

        sink.write_line("").await
    }
}

/// Streams every attachment matching `placement` (all of them for `None`)
/// as parts of the multipart body delimited by `boundary`.
///
/// # Errors
///
/// Stops at the first attachment that cannot be read or written.
pub async fn write_attachments<S: MessageSink>(
    sink: &mut S,
    attachments: &[Attachment],
    placement: Option<Placement>,
    boundary: &str,
) -> Result<()> {
    for attachment in attachments
        .iter()
        .filter(|a| placement.is_none_or(|p| a.placement == p))
    {
        attachment.write_part(sink, boundary).await?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::encoding::decode_base64;

    fn lines(out: &[u8]) -> Vec<String> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .split("\r\n")
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_content_id_fallback() {
        let a = Attachment::from_bytes("My Report 2024.pdf", &b"x"[..]);
        assert_eq!(a.content_id(), "My-Report-2024");
        let a = a.with_content_id("logo@sealpost");
        assert_eq!(a.content_id(), "logo@sealpost");
    }

    #[test]
    fn test_from_file_name() {
        let a = Attachment::from_file("/tmp/some dir/photo.jpg");
        assert_eq!(a.name, "photo.jpg");
        assert_eq!(a.placement, Placement::Attached);
    }

    #[tokio::test]
    async fn test_memory_part_layout() {
        let data = vec![7u8; 130];
        let attachment = Attachment::from_bytes("a \"b\".bin", data.clone())
            .with_content_type(ContentType::parse("image/png").unwrap())
            .inline();

        let mut out = Vec::new();
        attachment.write_part(&mut out, "=_b").await.unwrap();
        let lines = lines(&out);

        assert_eq!(lines[0], "--=_b");
        assert_eq!(lines[1], "Content-Type: image/png; name=\"a \\\"b\\\".bin\"");
        assert_eq!(lines[2], "Content-Transfer-Encoding: base64");
        assert_eq!(
            lines[3],
            "Content-Disposition: inline; filename=\"a \\\"b\\\".bin\""
        );
        assert_eq!(lines[4], "Content-ID: <a-\"b\">");
        assert_eq!(lines[5], "");
        assert_eq!(lines[6].len(), 76);
        assert_eq!(lines[7].len(), 76);
        let payload: String = lines[6..9].concat();
        assert_eq!(decode_base64(&payload).unwrap(), data);
        assert_eq!(lines[9], "");
        assert_eq!(lines[10], "");
        assert_eq!(lines.len(), 11);
    }

    #[tokio::test]
    async fn test_file_part_matches_memory() {
        let dir = std::env::temp_dir().join(format!("sealpost-att-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("blob.bin");
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let mut from_file = Vec::new();
        Attachment::from_file(&path)
            .write_part(&mut from_file, "x")
            .await
            .unwrap();
        let mut from_memory = Vec::new();
        Attachment::from_bytes("blob.bin", data)
            .write_part(&mut from_memory, "x")
            .await
            .unwrap();

        assert_eq!(from_file, from_memory);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file() {
        let attachment = Attachment::from_file("/definitely/not/here.txt");
        let mut out = Vec::new();
        let err = attachment.write_part(&mut out, "x").await.unwrap_err();
        assert!(matches!(err, Error::Attachment { ref name, .. } if name == "here.txt"));
    }

    #[tokio::test]
    async fn test_placement_filter() {
        let attachments = [
            Attachment::from_bytes("one.txt", &b"1"[..]),
            Attachment::from_bytes("two.png", &b"2"[..]).inline(),
            Attachment::from_bytes("three.txt", &b"3"[..]),
        ];

        let mut out = Vec::new();
        write_attachments(&mut out, &attachments, Some(Placement::Attached), "m")
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("one.txt") && text.contains("three.txt"));
        assert!(!text.contains("two.png"));

        let mut out = Vec::new();
        write_attachments(&mut out, &attachments, None, "m").await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap().matches("--m\r\n").count(), 3);
    }
}
