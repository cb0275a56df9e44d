//! Building `multipart/form-data` request bodies for tests

/// Builder for a `multipart/form-data` body.
///
/// # Example
///
/// ```rust
/// use tideway_forms::testing::MultipartBuilder;
///
/// let form = MultipartBuilder::new()
///     .text("title", "Holiday")
///     .file("photo", "beach.jpg", b"\xFF\xD8\xFF".to_vec());
///
/// let content_type = form.content_type();
/// let body = form.build();
/// assert!(content_type.starts_with("multipart/form-data; boundary="));
/// assert!(!body.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct MultipartBuilder {
    boundary: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone)]
struct Part {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self {
            boundary: format!("tideway-boundary-{}", uuid::Uuid::new_v4().simple()),
            parts: Vec::new(),
        }
    }

    /// Add a plain text field
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(Part {
            name: name.into(),
            file_name: None,
            content_type: None,
            data: value.into().into_bytes(),
        });
        self
    }

    /// Add a file part sent as `application/octet-stream`
    pub fn file(self, name: impl Into<String>, file_name: impl Into<String>, data: Vec<u8>) -> Self {
        self.file_with_type(name, file_name, "application/octet-stream", data)
    }

    /// Add a file part with the given client-declared content type
    pub fn file_with_type(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            data,
        });
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value for this body
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Encode the body
    pub fn build(self) -> Vec<u8> {
        let mut body = Vec::new();

        for part in self.parts {
            body.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());

            let disposition = match &part.file_name {
                Some(file_name) => format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, file_name
                ),
                None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
            };
            body.extend_from_slice(disposition.as_bytes());

            if let Some(content_type) = &part.content_type {
                body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(&part.data);
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        body
    }
}

impl Default for MultipartBuilder {
    fn default() -> Self {
        Self::new()
    }
}
