use crate::error::{ServerError, ServerResult};
use crate::http::{Header, Method, Request};
use crate::stream::ByteStream;
use log::error;
use tokio::io::AsyncRead;

/// Parse one HTTP/1.1 request from the byte stream.
///
/// Protocol violations fail with `ServerError::BadRequest`; infrastructure
/// I/O failures propagate untouched so the caller can unwind and close the
/// connection without attempting a response.
pub async fn parse_request<R: AsyncRead + Unpin>(
    stream: &mut ByteStream<R>,
) -> ServerResult<Request> {
    let (method, url) = parse_start_line(stream).await?;
    let headers = parse_headers(stream).await?;

    let content_length = headers
        .iter()
        .find(|h| h.name == "content-length")
        .and_then(|h| h.value.parse::<usize>().ok())
        .unwrap_or(0);

    let body = if content_length > 0 {
        Some(stream.next_n(content_length).await?)
    } else {
        None
    };

    Ok(Request {
        method,
        url,
        headers,
        body,
    })
}

/// Parse the start line into a method and a lower-cased path. The HTTP
/// version token is required but not validated.
async fn parse_start_line<R: AsyncRead + Unpin>(
    stream: &mut ByteStream<R>,
) -> ServerResult<(Method, String)> {
    let line = read_utf8_line(stream).await?;

    let tokens: Vec<&str> = line.split(' ').collect();
    if tokens.len() != 3 {
        error!("start line should have 3 tokens, actual: {}", line);
        return Err(ServerError::BadRequest(format!(
            "invalid start line {}",
            line
        )));
    }

    let method = Method::parse(tokens[0]).ok_or_else(|| {
        error!("unsupported method {}", tokens[0]);
        ServerError::BadRequest(format!(
            "unsupported http method {}, should be one of {}",
            tokens[0],
            Method::ALL.map(|m| m.as_str()).join(", ")
        ))
    })?;

    Ok((method, tokens[1].to_lowercase()))
}

/// Read header lines until the empty line terminating the header section
async fn parse_headers<R: AsyncRead + Unpin>(
    stream: &mut ByteStream<R>,
) -> ServerResult<Vec<Header>> {
    let mut headers = Vec::new();

    loop {
        let line = read_utf8_line(stream).await?;
        if line.is_empty() {
            return Ok(headers);
        }
        headers.push(parse_header_line(&line)?);
    }
}

fn parse_header_line(line: &str) -> ServerResult<Header> {
    let colon = line
        .find(':')
        .ok_or_else(|| ServerError::BadRequest(format!("invalid header: {}", line)))?;

    Ok(Header::new(
        line[..colon].trim().to_lowercase(),
        line[colon + 1..].trim(),
    ))
}

async fn read_utf8_line<R: AsyncRead + Unpin>(stream: &mut ByteStream<R>) -> ServerResult<String> {
    let bytes = stream.read_line().await?;
    String::from_utf8(bytes)
        .map_err(|_| ServerError::BadRequest("line is not valid UTF-8".to_string()))
}
