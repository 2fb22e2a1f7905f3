//! HTTP request parsing
//!
//! Reads one HTTP/1.1 request (request line, headers, `Content-Length`
//! body) and decodes url-encoded and multipart form bodies.

use std::collections::HashMap;
use std::convert::Infallible;
use std::io;

use futures_util::stream;
use multer::Multipart;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

const MAX_HEAD_BYTES: u64 = 16 * 1024;

const URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

#[derive(Debug, Error)]
pub enum RequestError {
    /// The peer closed the connection before sending a request.
    #[error("connection closed before a request was received")]
    Closed,

    #[error("malformed request: {0}")]
    Malformed(String),

    #[error("request body of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl Method {
    fn parse(token: &str) -> Self {
        match token {
            "GET" => Method::Get,
            "POST" => Method::Post,
            other => Method::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Other(token) => token,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl HttpRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request target without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Decodes the form fields of the body according to its `Content-Type`:
    /// `application/x-www-form-urlencoded` (also assumed when the header is
    /// absent) or `multipart/form-data`. File parts of a multipart body are
    /// not form fields and are skipped. A repeated field keeps its first
    /// value.
    pub async fn form(&self) -> Result<Form, FormError> {
        let content_type = self.header("content-type").unwrap_or(URLENCODED);
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            URLENCODED => Ok(Form::from_urlencoded(&self.body)),
            MULTIPART => Form::from_multipart(content_type, self.body.clone()).await,
            _ => Err(FormError::UnsupportedType(media_type)),
        }
    }
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error("unsupported content type '{0}'")]
    UnsupportedType(String),

    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),
}

/// Decoded form fields.
#[derive(Debug, Clone, Default)]
pub struct Form {
    fields: HashMap<String, String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("missing form field '{0}'")]
pub struct MissingField(pub String);

impl Form {
    fn from_urlencoded(body: &[u8]) -> Self {
        let mut fields = HashMap::new();
        for (name, value) in url::form_urlencoded::parse(body) {
            fields
                .entry(name.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self { fields }
    }

    async fn from_multipart(content_type: &str, body: Vec<u8>) -> Result<Self, FormError> {
        let boundary = multer::parse_boundary(content_type)?;
        let stream = stream::once(async move { Ok::<_, Infallible>(body) });
        let mut multipart = Multipart::new(stream, boundary);

        let mut fields = HashMap::new();
        while let Some(field) = multipart.next_field().await? {
            if field.file_name().is_some() {
                continue;
            }
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let value = field.text().await?;
            fields.entry(name).or_insert(value);
        }
        Ok(Self { fields })
    }

    pub fn field(&self, name: &str) -> Result<&str, MissingField> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| MissingField(name.to_string()))
    }
}

/// Reads one request from `reader`.
pub async fn read_request<R>(reader: &mut R, max_body_bytes: usize) -> Result<HttpRequest, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = (&mut *reader).take(MAX_HEAD_BYTES);
    let mut line = String::new();

    if head.read_line(&mut line).await? == 0 {
        return Err(RequestError::Closed);
    }

    let mut parts = line.split_whitespace();
    let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(target), Some(version)) => (method, target, version),
        _ => return Err(RequestError::Malformed(format!("request line {:?}", line.trim_end()))),
    };
    if !version.starts_with("HTTP/1.") {
        return Err(RequestError::Malformed(format!("unsupported version {version}")));
    }

    let method = Method::parse(method);
    let path = target.split('?').next().unwrap_or(target).to_string();

    let mut headers = HashMap::new();
    loop {
        let mut header = String::new();
        if head.read_line(&mut header).await? == 0 {
            return Err(RequestError::Malformed("truncated headers".into()));
        }
        let header = header.trim_end_matches(['\r', '\n']);
        if header.is_empty() {
            break;
        }
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| RequestError::Malformed(format!("header {header:?}")))?;
        headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    if headers.contains_key("transfer-encoding") {
        return Err(RequestError::Malformed(
            "transfer-encoding is not supported".into(),
        ));
    }

    let length = match headers.get("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| RequestError::Malformed(format!("content-length {value:?}")))?,
        None => 0,
    };
    if length > max_body_bytes {
        return Err(RequestError::TooLarge {
            size: length,
            limit: max_body_bytes,
        });
    }

    let mut body = vec![0; length];
    reader.read_exact(&mut body).await?;

    Ok(HttpRequest {
        method,
        path,
        headers,
        body,
    })
}
