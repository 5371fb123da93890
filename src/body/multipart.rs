//! Multipart form assembly
//!
//! `multipart/form-data` encoding: a random hex boundary unless one is
//! supplied, each part line-terminated with CRLF, `Content-Disposition:
//! form-data; name="…"` with optional `filename` and `Content-Type`, and the
//! `--<boundary>--` terminator.

use crate::error::Error;
use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;
use std::path::PathBuf;

const CRLF: &str = "\r\n";

#[derive(Debug, Clone)]
enum PartContent {
    Text(String),
    File(PathBuf),
    Bytes(Bytes),
}

#[derive(Debug, Clone)]
struct MultipartPart {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    content: PartContent,
}

/// An ordered `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<MultipartPart>,
}

impl MultipartForm {
    /// Create a form with a random hex boundary.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let boundary = format!(
            "{:08x}{:08x}",
            rng.gen_range(0..u32::MAX),
            rng.gen_range(0..u32::MAX)
        );
        Self::with_boundary(boundary)
    }

    /// Create a form with an explicit boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// The boundary token in use.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value for this form.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Number of parts added.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether no parts were added.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Append a string part.
    pub fn add_text(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.parts.push(MultipartPart {
            name: name.into(),
            filename: None,
            content_type: None,
            content: PartContent::Text(value.into()),
        });
        self
    }

    /// Append a file part. The filename is taken from the path and the
    /// content type guessed from its extension.
    pub fn add_file(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> &mut Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let content_type = mime_guess::from_path(&path).first_raw().map(str::to_string);
        self.parts.push(MultipartPart {
            name: name.into(),
            filename,
            content_type,
            content: PartContent::File(path),
        });
        self
    }

    /// Append a raw bytes part.
    pub fn add_bytes(
        &mut self,
        name: impl Into<String>,
        filename: Option<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> &mut Self {
        self.parts.push(MultipartPart {
            name: name.into(),
            filename,
            content_type,
            content: PartContent::Bytes(data.into()),
        });
        self
    }

    /// Append a part read from a stream. The reader is drained eagerly so
    /// the form stays cloneable.
    pub fn add_reader<R: std::io::Read>(
        &mut self,
        name: impl Into<String>,
        filename: Option<String>,
        content_type: Option<String>,
        mut reader: R,
    ) -> Result<&mut Self, Error> {
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| Error::MultipartStreamReadFailed(e.to_string()))?;
        Ok(self.add_bytes(name, filename, content_type, buf))
    }

    /// Assemble the wire body, returning `(bytes, content type)`.
    pub async fn encode(&self) -> Result<(Bytes, String), Error> {
        let mut out = BytesMut::new();
        for part in &self.parts {
            validate_token(&part.name)?;
            if let Some(filename) = &part.filename {
                validate_token(filename)?;
            }

            out.put_slice(format!("--{}{CRLF}", self.boundary).as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
            if let Some(filename) = &part.filename {
                disposition.push_str(&format!("; filename=\"{filename}\""));
            }
            out.put_slice(disposition.as_bytes());
            out.put_slice(CRLF.as_bytes());
            if let Some(content_type) = &part.content_type {
                out.put_slice(format!("Content-Type: {content_type}{CRLF}").as_bytes());
            }
            out.put_slice(CRLF.as_bytes());

            match &part.content {
                PartContent::Text(text) => out.put_slice(text.as_bytes()),
                PartContent::Bytes(bytes) => out.put_slice(bytes),
                PartContent::File(path) => {
                    let data = tokio::fs::read(path).await.map_err(|e| {
                        Error::MultipartInvalidFile(format!("{}: {e}", path.display()))
                    })?;
                    out.put_slice(&data);
                }
            }
            out.put_slice(CRLF.as_bytes());
        }
        out.put_slice(format!("--{}--{CRLF}", self.boundary).as_bytes());
        Ok((out.freeze(), self.content_type()))
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

// Part names and filenames are embedded in quoted strings; reject input that
// would break out of the quoting.
fn validate_token(token: &str) -> Result<(), Error> {
    if token.contains('"') || token.contains('\r') || token.contains('\n') {
        return Err(Error::MultipartFailedStringEncoding(format!(
            "part token '{token}' contains quoting characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn encodes_text_parts_with_crlf_framing() {
        let mut form = MultipartForm::with_boundary("abc123");
        form.add_text("field", "value");
        let (bytes, content_type) = form.encode().await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();

        assert_eq!(content_type, "multipart/form-data; boundary=abc123");
        assert_eq!(
            body,
            "--abc123\r\nContent-Disposition: form-data; name=\"field\"\r\n\r\nvalue\r\n--abc123--\r\n"
        );
    }

    #[tokio::test]
    async fn file_parts_carry_filename_and_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hi there").unwrap();

        let mut form = MultipartForm::with_boundary("b");
        form.add_file("doc", &path);
        let (bytes, _) = form.encode().await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(body.contains("filename=\"hello.txt\""));
        assert!(body.contains("Content-Type: text/plain"));
        assert!(body.contains("hi there"));
    }

    #[tokio::test]
    async fn missing_file_part_is_invalid() {
        let mut form = MultipartForm::new();
        form.add_file("doc", "/nope/missing.bin");
        let err = form.encode().await.unwrap_err();
        assert!(matches!(err, Error::MultipartInvalidFile(_)));
    }

    #[tokio::test]
    async fn quoted_characters_in_names_are_rejected() {
        let mut form = MultipartForm::new();
        form.add_text("bad\"name", "v");
        let err = form.encode().await.unwrap_err();
        assert!(matches!(err, Error::MultipartFailedStringEncoding(_)));
    }

    #[test]
    fn reader_parts_are_drained_eagerly() {
        let mut form = MultipartForm::new();
        form.add_reader(
            "stream",
            Some("s.bin".to_string()),
            Some("application/octet-stream".to_string()),
            &b"streamed"[..],
        )
        .unwrap();
        assert_eq!(form.len(), 1);
    }

    #[test]
    fn random_boundaries_are_hex_and_distinct() {
        let a = MultipartForm::new();
        let b = MultipartForm::new();
        assert_eq!(a.boundary().len(), 16);
        assert!(a.boundary().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.boundary(), b.boundary());
    }
}
