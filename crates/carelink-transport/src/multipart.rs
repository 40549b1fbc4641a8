//! Multipart request bodies
//!
//! A [`MultipartBody`] is what callers build: ordered named fields (any JSON
//! value) and file attachments. [`MultipartForm::encode`] flattens the fields
//! with the same bracket paths the query encoder uses and keeps file parts as
//! binary attachments. The encoded form carries its own header set and can be
//! streamed straight onto a socket without buffering file contents.

use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use http::{HeaderMap, HeaderValue, header};
use serde_json::Value;
use std::{fmt, pin::Pin};

use crate::encoding::flatten_with_prefix;
use crate::error::{Error, Result};

/// Boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + 'static>>;

/// Contents of a file attachment.
pub enum FileSource {
    /// Fully buffered contents
    Bytes(Bytes),
    /// Contents produced lazily by the caller
    Stream(ByteStream),
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSource::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            FileSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A binary attachment in a multipart body.
#[derive(Debug)]
pub struct FilePart {
    file_name: String,
    content_type: Option<String>,
    source: FileSource,
}

impl FilePart {
    /// Attachment from in-memory bytes.
    pub fn bytes(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            source: FileSource::Bytes(data.into()),
        }
    }

    /// Attachment read from a caller-supplied stream.
    pub fn stream<S>(file_name: impl Into<String>, stream: S) -> Self
    where
        S: Stream<Item = std::io::Result<Bytes>> + Send + 'static,
    {
        Self {
            file_name: file_name.into(),
            content_type: None,
            source: FileSource::Stream(Box::pin(stream)),
        }
    }

    /// Set the MIME type of the attachment.
    pub fn mime(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// File name sent in the `Content-Disposition` header.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// MIME type, if one was set.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Whether the attachment is streamed rather than buffered.
    pub fn is_streaming(&self) -> bool {
        matches!(self.source, FileSource::Stream(_))
    }
}

/// Value of a multipart entry before encoding.
#[derive(Debug)]
pub enum MultipartValue {
    /// Plain value, stringified (and flattened when nested)
    Field(Value),
    /// Binary attachment
    File(FilePart),
}

/// Caller-facing multipart body.
#[derive(Debug, Default)]
pub struct MultipartBody {
    entries: Vec<(String, MultipartValue)>,
}

impl MultipartBody {
    /// Create an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a body whose fields come from the top-level keys of a JSON object.
    pub fn from_fields(fields: Value) -> Self {
        let mut body = Self::new();
        if let Value::Object(map) = fields {
            for (name, value) in map {
                body = body.field(name, value);
            }
        }
        body
    }

    /// Add a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries
            .push((name.into(), MultipartValue::Field(value.into())));
        self
    }

    /// Add a file attachment.
    pub fn file(mut self, name: impl Into<String>, part: FilePart) -> Self {
        self.entries.push((name.into(), MultipartValue::File(part)));
        self
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[(String, MultipartValue)] {
        &self.entries
    }

    /// Whether the body has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One encoded part.
#[derive(Debug)]
pub enum FormPart {
    /// Text field
    Text {
        /// Part name (bracket path for nested fields)
        name: String,
        /// Stringified value
        value: String,
    },
    /// File attachment
    File {
        /// Part name
        name: String,
        /// Attachment
        part: FilePart,
    },
}

/// Encoded multipart form with a fixed boundary.
#[derive(Debug)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<FormPart>,
}

impl MultipartForm {
    /// Encode a body into named parts.
    pub fn encode(body: MultipartBody) -> Self {
        let mut parts = Vec::new();
        for (name, value) in body.entries {
            match value {
                MultipartValue::Field(value) => {
                    parts.extend(
                        flatten_with_prefix(&name, &value)
                            .into_iter()
                            .map(|(name, value)| FormPart::Text { name, value }),
                    );
                }
                MultipartValue::File(part) => parts.push(FormPart::File { name, part }),
            }
        }

        Self {
            boundary: format!("carelink-{}", uuid::Uuid::new_v4().simple()),
            parts,
        }
    }

    /// Boundary separating the parts.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Encoded parts.
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// `Content-Type` value including the boundary.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Headers that must accompany the streamed body.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&self.content_type())
            .map_err(|e| Error::InvalidRequest(format!("Invalid multipart boundary: {e}")))?;
        headers.insert(header::CONTENT_TYPE, value);
        Ok(headers)
    }

    /// Stream the encoded body. File streams are forwarded chunk by chunk.
    pub fn into_stream(self) -> ByteStream {
        let boundary = self.boundary;
        let mut segments: Vec<ByteStream> = Vec::with_capacity(self.parts.len() * 3 + 1);

        for part in self.parts {
            match part {
                FormPart::Text { name, value } => {
                    let head = format!(
                        "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n",
                        escape(&name)
                    );
                    segments.push(chunk(head));
                    segments.push(chunk(value));
                }
                FormPart::File { name, part } => {
                    let mut head = format!(
                        "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"; ",
                        escape(&name)
                    );
                    head.push_str(&format!("filename=\"{}\"\r\n", escape(&part.file_name)));
                    let content_type = part
                        .content_type
                        .as_deref()
                        .unwrap_or("application/octet-stream");
                    head.push_str(&format!("Content-Type: {content_type}\r\n\r\n"));
                    segments.push(chunk(head));
                    segments.push(match part.source {
                        FileSource::Bytes(bytes) => stream::iter([Ok(bytes)]).boxed(),
                        FileSource::Stream(stream) => stream,
                    });
                }
            }
            segments.push(chunk("\r\n"));
        }
        segments.push(chunk(format!("--{boundary}--\r\n")));

        stream::iter(segments).flatten().boxed()
    }

    /// Convert into a `reqwest` form; `reqwest` picks its own boundary.
    pub fn into_reqwest_form(self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for part in self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File { name, part } => {
                    let mut file = match part.source {
                        FileSource::Bytes(bytes) => reqwest::multipart::Part::bytes(bytes.to_vec()),
                        FileSource::Stream(stream) => {
                            reqwest::multipart::Part::stream(reqwest::Body::wrap_stream(stream))
                        }
                    }
                    .file_name(part.file_name);
                    if let Some(content_type) = part.content_type {
                        file = file.mime_str(&content_type).map_err(|e| {
                            Error::InvalidRequest(format!(
                                "Invalid content type '{content_type}': {e}"
                            ))
                        })?;
                    }
                    form.part(name, file)
                }
            };
        }
        Ok(form)
    }
}

fn chunk(data: impl Into<Bytes>) -> ByteStream {
    stream::iter([Ok(data.into())]).boxed()
}

fn escape(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
