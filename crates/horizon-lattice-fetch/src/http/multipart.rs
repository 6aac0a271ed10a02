//! `multipart/form-data` body builder.

use std::path::Path;

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use super::codec::mime;

const CRLF: &[u8] = b"\r\n";

#[derive(Clone, Debug)]
struct Field {
    name: String,
    value: String,
}

#[derive(Clone, Debug)]
struct FilePart {
    name: String,
    data: Bytes,
    filename: String,
    mime_type: String,
}

/// Accumulates text fields and file parts for a multipart request.
///
/// Each instance draws its own boundary token, so field content from one
/// request cannot collide with another request's delimiter. Fields are
/// always written before files, each group in the order it was added.
#[derive(Clone, Debug)]
pub struct FormData {
    boundary: String,
    fields: Vec<Field>,
    files: Vec<FilePart>,
}

impl Default for FormData {
    fn default() -> Self {
        Self::new()
    }
}

impl FormData {
    /// Create an empty form with a fresh boundary.
    pub fn new() -> Self {
        Self {
            boundary: format!("BOUNDARY-{}", Uuid::new_v4().hyphenated()),
            fields: Vec::new(),
            files: Vec::new(),
        }
    }

    /// The boundary token separating parts.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Whether no fields or files have been added.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

    /// Add a text field.
    pub fn append_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(Field {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Add a file part. The MIME type is guessed from `filename` when omitted.
    pub fn append_file(
        &mut self,
        name: impl Into<String>,
        data: impl Into<Bytes>,
        filename: impl Into<String>,
        mime_type: Option<String>,
    ) {
        let filename = filename.into();
        let mime_type = mime_type.unwrap_or_else(|| mime_type_for(&filename));
        self.files.push(FilePart {
            name: name.into(),
            data: data.into(),
            filename,
            mime_type,
        });
    }

    /// The `Content-Type` header value carrying this form's boundary.
    pub fn content_type(&self) -> String {
        format!("{}; boundary={}", mime::MULTIPART_FORM_DATA, self.boundary)
    }

    /// Serialize all parts, or `None` if nothing was added.
    pub fn serialize(&self) -> Option<Bytes> {
        if self.is_empty() {
            return None;
        }

        let mut body = BytesMut::new();
        for field in &self.fields {
            self.put_boundary(&mut body);
            body.put_slice(
                format!("Content-Disposition: form-data; name=\"{}\"", field.name).as_bytes(),
            );
            body.put_slice(CRLF);
            body.put_slice(CRLF);
            body.put_slice(field.value.as_bytes());
            body.put_slice(CRLF);
        }

        for file in &self.files {
            self.put_boundary(&mut body);
            body.put_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
                    file.name, file.filename
                )
                .as_bytes(),
            );
            body.put_slice(CRLF);
            body.put_slice(format!("Content-Type: {}", file.mime_type).as_bytes());
            body.put_slice(CRLF);
            body.put_slice(CRLF);
            body.put_slice(&file.data);
            body.put_slice(CRLF);
        }

        body.put_slice(format!("--{}--", self.boundary).as_bytes());
        body.put_slice(CRLF);
        Some(body.freeze())
    }

    fn put_boundary(&self, body: &mut BytesMut) {
        body.put_slice(b"--");
        body.put_slice(self.boundary.as_bytes());
        body.put_slice(CRLF);
    }
}

/// Best-guess MIME type for a filename, by extension.
pub fn mime_type_for(filename: impl AsRef<Path>) -> String {
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(mime::OCTET_STREAM)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(bytes: &Bytes) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_empty_form_serializes_to_none() {
        let form = FormData::new();
        assert!(form.is_empty());
        assert!(form.serialize().is_none());
    }

    #[test]
    fn test_boundaries_are_unique() {
        let a = FormData::new();
        let b = FormData::new();
        assert!(a.boundary().starts_with("BOUNDARY-"));
        assert_ne!(a.boundary(), b.boundary());
    }

    #[test]
    fn test_content_type_carries_boundary() {
        let form = FormData::new();
        assert_eq!(
            form.content_type(),
            format!("multipart/form-data; boundary={}", form.boundary())
        );
    }

    #[test]
    fn test_single_field_layout() {
        let mut form = FormData::new();
        form.append_field("key", "value");
        let boundary = form.boundary().to_string();

        let expected = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"key\"\r\n\r\nvalue\r\n--{boundary}--\r\n"
        );
        assert_eq!(text(&form.serialize().unwrap()), expected);
    }

    #[test]
    fn test_fields_precede_files() {
        let mut form = FormData::new();
        form.append_file("file1", "<html>1</html>", "file1.html", None);
        form.append_field("key", "value");
        form.append_field("key2", "value2");
        let body = text(&form.serialize().unwrap());

        let key = body.find("name=\"key\"").unwrap();
        let key2 = body.find("name=\"key2\"").unwrap();
        let file = body.find("name=\"file1\"; filename=\"file1.html\"").unwrap();
        assert!(key < key2);
        assert!(key2 < file);
        assert!(body.contains("Content-Type: text/html\r\n\r\n<html>1</html>\r\n"));
        assert!(body.ends_with(&format!("--{}--\r\n", form.boundary())));
    }

    #[test]
    fn test_explicit_mime_type_wins() {
        let mut form = FormData::new();
        form.append_file("doc", vec![0u8, 1, 2], "doc.html", Some("text/plain".into()));
        let body = form.serialize().unwrap();
        let rendered = String::from_utf8_lossy(&body);
        assert!(rendered.contains("Content-Type: text/plain\r\n"));
    }

    #[test]
    fn test_mime_type_fallback() {
        assert_eq!(mime_type_for("notes.html"), "text/html");
        assert_eq!(mime_type_for("photo.png"), "image/png");
        assert_eq!(mime_type_for("blob.unknownext"), "application/octet-stream");
        assert_eq!(mime_type_for("no_extension"), "application/octet-stream");
    }

    #[test]
    fn test_binary_file_data_preserved() {
        let mut form = FormData::new();
        let data = vec![0xffu8, 0x00, 0x10];
        form.append_file("bin", data.clone(), "data.bin", None);
        let body = form.serialize().unwrap();
        assert!(body.windows(data.len()).any(|window| window == data.as_slice()));
    }
}
