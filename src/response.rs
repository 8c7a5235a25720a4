use std::str::FromStr;

use futures_lite::{io::BufReader, AsyncBufReadExt, AsyncRead, AsyncReadExt};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Version};

use crate::error::{RestQueryError, RestQueryResult};

// Reads the response status line from the stream
pub async fn read_response_status_line<S>(reader: &mut BufReader<S>) -> RestQueryResult<String>
where
    S: AsyncRead + Unpin,
{
    let mut response_status_line = String::new();
    let num_bytes_read = reader.read_line(&mut response_status_line).await?;
    if num_bytes_read == 0 {
        return Err(RestQueryError::transfer("Empty reply from server"));
    }
    Ok(response_status_line)
}

// Parses the response status line into a version and status code
pub fn parse_response_status_line(response_status_line: &str) -> RestQueryResult<(Version, StatusCode)> {
    let response_status_line_parts: Vec<&str> = response_status_line.split_whitespace().collect();
    if response_status_line_parts.len() < 2 {
        return Err(RestQueryError::transfer("Failed to parse response status line"));
    }

    let response_version = match response_status_line_parts[0] {
        "HTTP/1.0" => Version::HTTP_10,
        "HTTP/1.1" => Version::HTTP_11,
        other => return Err(RestQueryError::transfer(format!("Unsupported HTTP version '{other}'"))),
    };

    let response_status = StatusCode::from_u16(response_status_line_parts[1].parse()?)?;
    Ok((response_version, response_status))
}

// Reads header lines up to the blank line that ends the head
pub async fn read_response_headers<S>(reader: &mut BufReader<S>) -> RestQueryResult<HeaderMap<HeaderValue>>
where
    S: AsyncRead + Unpin,
{
    let mut headers = HeaderMap::new();
    let mut line = String::new();

    while reader.read_line(&mut line).await? != 0 && line != "\r\n" && line != "\n" {
        if let Some((key, value)) = line.split_once(':') {
            let header_name = HeaderName::from_str(key.trim())?;
            let header_value = HeaderValue::from_str(value.trim())?;
            headers.append(header_name, header_value);
        } else {
            log::warn!("Failed to parse header line: {line}");
        }
        line.clear();
    }

    Ok(headers)
}

// Appends exactly `len` bytes to `body`, growing it only as data arrives
async fn read_announced<S>(reader: &mut BufReader<S>, len: u64, body: &mut Vec<u8>) -> RestQueryResult<()>
where
    S: AsyncRead + Unpin,
{
    let read = (&mut *reader).take(len).read_to_end(body).await? as u64;
    if read < len {
        return Err(RestQueryError::transfer(format!(
            "Transfer closed with {} bytes remaining to read",
            len - read
        )));
    }
    Ok(())
}

// Reads a chunked HTTP body, then discards any trailer section
pub async fn read_chunked_body<S>(reader: &mut BufReader<S>) -> RestQueryResult<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut body = Vec::new();
    let mut chunk_size_line = String::new();

    loop {
        if reader.read_line(&mut chunk_size_line).await? == 0 {
            return Err(RestQueryError::transfer("Unexpected end of chunked body"));
        }
        let chunk_size_field = chunk_size_line.split(';').next().unwrap_or_default().trim();
        let chunk_size = u64::from_str_radix(chunk_size_field, 16)?;

        if chunk_size == 0 {
            break;
        }

        read_announced(reader, chunk_size, &mut body).await?;

        let mut crlf = [0; 2];
        reader.read_exact(&mut crlf).await?;
        if &crlf != b"\r\n" {
            return Err(RestQueryError::transfer("Invalid chunked encoding: missing CRLF"));
        }
        chunk_size_line.clear();
    }

    let mut trailer_line = String::new();
    while reader.read_line(&mut trailer_line).await? != 0 && trailer_line != "\r\n" && trailer_line != "\n" {
        trailer_line.clear();
    }

    Ok(body)
}

// Reads the response body based on status and headers
pub async fn read_response_body<S>(
    reader: &mut BufReader<S>,
    status: StatusCode,
    headers: &HeaderMap<HeaderValue>,
) -> RestQueryResult<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    if status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        return Ok(Vec::new());
    }

    if let Some(transfer_encoding) = headers.get(http::header::TRANSFER_ENCODING) {
        let transfer_encoding = transfer_encoding.to_str()?;
        if transfer_encoding.trim().eq_ignore_ascii_case("chunked") {
            read_chunked_body(reader).await
        } else {
            Err(RestQueryError::transfer(format!(
                "Unsupported transfer encoding '{transfer_encoding}'"
            )))
        }
    } else if let Some(content_length_value) = headers.get(http::header::CONTENT_LENGTH) {
        let content_length = content_length_value.to_str()?.trim().parse::<u64>()?;
        let mut response_body = Vec::new();
        read_announced(reader, content_length, &mut response_body).await?;
        Ok(response_body)
    } else {
        // No framing: the body runs until the server closes the connection
        let mut response_body = Vec::new();
        reader.read_to_end(&mut response_body).await?;
        Ok(response_body)
    }
}
