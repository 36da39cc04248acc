use bytes::Bytes;
use std::io::Write;

/// HTTP methods supported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub const ALL: [Method; 4] = [Method::Get, Method::Post, Method::Put, Method::Delete];

    /// Parse a method token case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
    }

    /// Convert the method to its wire representation
    pub fn as_str(&self) -> &'static str {
        match *self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// A single request header. Names are stored trimmed and lower-cased;
/// values are trimmed with their case preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// HTTP Request
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Request path, always lower-cased
    pub url: String,
    pub headers: Vec<Header>,
    pub body: Option<Bytes>,
}

impl Request {
    /// Look up a header value, case-insensitively on the name
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }
}

/// Response status: a code plus an optional reason message. Handler and
/// parse failures carry their message through here onto the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: u16,
    pub message: Option<String>,
}

impl Status {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn ok() -> Self {
        Status::new(200, "OK")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Status::new(400, message)
    }

    pub fn not_found() -> Self {
        Status::new(404, "Not Found")
    }

    pub fn request_timeout() -> Self {
        Status::new(408, "Request Timeout")
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Status::new(500, message)
    }
}

/// HTTP Response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: Status,
    /// Handler-supplied header lines, emitted before the computed ones
    pub headers: Vec<String>,
    pub body: Option<Bytes>,
}

impl Response {
    /// Create a new response with the given status
    pub fn new(status: Status) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn ok() -> Self {
        Response::new(Status::ok())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Response::new(Status::bad_request(message))
    }

    pub fn not_found() -> Self {
        Response::new(Status::not_found())
    }

    pub fn request_timeout() -> Self {
        Response::new(Status::request_timeout())
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Response::new(Status::server_error(message))
    }

    /// Set the response body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Append a handler-supplied header line, e.g. `"X-Request-Id: 7"`
    pub fn with_header(mut self, line: impl Into<String>) -> Self {
        self.headers.push(line.into());
        self
    }

    /// Serialize the response to wire bytes.
    ///
    /// Handler-supplied headers come first and in order, followed by the
    /// computed `Content-Length`, `Content-Type` and `Connection: Close`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();

        // Writing into a Vec<u8> cannot fail
        let _ = match &self.status.message {
            Some(message) => write!(out, "HTTP/1.1 {} {}\r\n", self.status.code, message),
            None => write!(out, "HTTP/1.1 {}\r\n", self.status.code),
        };

        for header in &self.headers {
            let _ = write!(out, "{}\r\n", header);
        }

        let body_len = self.body.as_ref().map(Bytes::len).unwrap_or(0);
        let _ = write!(out, "Content-Length: {}\r\n", body_len);
        let _ = write!(out, "Content-Type: text/plain\r\n");
        let _ = write!(out, "Connection: Close\r\n");
        let _ = write!(out, "\r\n");

        if let Some(body) = &self.body {
            out.extend_from_slice(body);
        }

        out
    }
}
