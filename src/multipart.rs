//! Minimal multipart/form-data encoder (RFC 7578). The core builds the full
//! request body itself so the shell's HTTP layer stays a dumb byte pipe.

use uuid::Uuid;

const CRLF: &str = "\r\n";

pub struct MultipartBody {
    boundary: String,
    buf: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: format!("cleansnap-{}", Uuid::new_v4().simple()),
            buf: Vec::new(),
        }
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn add_text(&mut self, name: &str, value: &str) {
        self.open_part();
        self.write_str(&format!(
            "Content-Disposition: form-data; name=\"{}\"{CRLF}{CRLF}",
            sanitize_token(name)
        ));
        self.write_str(value);
        self.write_str(CRLF);
    }

    pub fn add_file(&mut self, name: &str, filename: &str, mime_type: &str, data: &[u8]) {
        self.open_part();
        self.write_str(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"{CRLF}",
            sanitize_token(name),
            sanitize_token(filename)
        ));
        self.write_str(&format!("Content-Type: {mime_type}{CRLF}{CRLF}"));
        self.buf.extend_from_slice(data);
        self.write_str(CRLF);
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.write_str(&format!("--{}--{CRLF}", self.boundary));
        self.buf
    }

    fn open_part(&mut self) {
        self.write_str(&format!("--{}{CRLF}", self.boundary));
    }

    fn write_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

// Quotes and CR/LF inside a field or file name would break part framing.
fn sanitize_token(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != '"' && *c != '\r' && *c != '\n')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_contains_both_parts_and_closing_boundary() {
        let mut body = MultipartBody::new();
        let boundary = body.content_type();
        body.add_file("image", "report.jpg", "image/jpeg", &[0xFF, 0xD8, 0xFF]);
        body.add_text("area_name", "Springfield");
        let bytes = body.finish();
        let text = String::from_utf8_lossy(&bytes);

        assert!(boundary.starts_with("multipart/form-data; boundary=cleansnap-"));
        assert!(text.contains("Content-Disposition: form-data; name=\"image\"; filename=\"report.jpg\""));
        assert!(text.contains("Content-Type: image/jpeg"));
        assert!(text.contains("Content-Disposition: form-data; name=\"area_name\""));
        assert!(text.contains("Springfield"));
        assert!(text.trim_end().ends_with("--"));
    }

    #[test]
    fn binary_payload_survives_verbatim() {
        let payload = vec![0u8, 1, 2, 253, 254, 255];
        let mut body = MultipartBody::new();
        body.add_file("image", "x.png", "image/png", &payload);
        let bytes = body.finish();
        assert!(bytes
            .windows(payload.len())
            .any(|window| window == payload.as_slice()));
    }

    #[test]
    fn quotes_are_stripped_from_names() {
        let mut body = MultipartBody::new();
        body.add_text("na\"me", "v");
        let text = String::from_utf8_lossy(&body.finish()).into_owned();
        assert!(text.contains("name=\"name\""));
    }

    #[test]
    fn boundaries_are_unique_per_body() {
        assert_ne!(
            MultipartBody::new().content_type(),
            MultipartBody::new().content_type()
        );
    }
}
