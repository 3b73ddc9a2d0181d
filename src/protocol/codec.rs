//! Protocol codec
//!
//! Reading requests and writing replies in the RESP-like text format.
//!
//! ## Request Framing
//! ```text
//! *<argc>\r\n
//! $<len>\r\n<arg bytes>\r\n      (argc times)
//! ```
//! Lines that do not start with `*` are inline commands split on ASCII
//! whitespace.

use std::io::{BufRead, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DriftError, Result};

use super::Response;

/// Maximum size of one bulk string (16 MB)
pub const MAX_BULK_SIZE: usize = 16 * 1024 * 1024;

/// Maximum number of arguments in one request
pub const MAX_ARGS: usize = 1024;

/// Longest accepted header or inline line
const MAX_LINE: usize = 64 * 1024;

// =============================================================================
// Requests
// =============================================================================

/// Read one request as its raw arguments.
///
/// Returns `Ok(None)` on a clean end of stream between requests.
pub fn read_request<R: BufRead>(reader: &mut R) -> Result<Option<Vec<Vec<u8>>>> {
    loop {
        let line = match read_line(reader)? {
            Some(line) => line,
            None => return Ok(None),
        };

        if line.is_empty() {
            continue;
        }

        if line[0] == b'*' {
            let argc = parse_len(&line[1..], "array length")?;
            if argc > MAX_ARGS {
                return Err(DriftError::Protocol(format!(
                    "too many arguments: {} (max {})",
                    argc, MAX_ARGS
                )));
            }

            let mut args = Vec::with_capacity(argc);
            for _ in 0..argc {
                args.push(read_bulk(reader)?);
            }
            return Ok(Some(args));
        }

        let args: Vec<Vec<u8>> = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| part.to_vec())
            .collect();
        if !args.is_empty() {
            return Ok(Some(args));
        }
    }
}

/// Read `$<len>\r\n<bytes>\r\n`
fn read_bulk<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let header = read_line(reader)?.ok_or_else(|| {
        DriftError::Protocol("stream ended inside a request".to_string())
    })?;

    if header.first() != Some(&b'$') {
        return Err(DriftError::Protocol(format!(
            "expected bulk string, got {:?}",
            String::from_utf8_lossy(&header)
        )));
    }

    let len = parse_len(&header[1..], "bulk length")?;
    if len > MAX_BULK_SIZE {
        return Err(DriftError::Protocol(format!(
            "bulk string too large: {} bytes (max {})",
            len, MAX_BULK_SIZE
        )));
    }

    let mut data = vec![0u8; len + 2];
    reader.read_exact(&mut data)?;
    if &data[len..] != b"\r\n" {
        return Err(DriftError::Protocol(
            "bulk string not terminated by CRLF".to_string(),
        ));
    }
    data.truncate(len);

    Ok(data)
}

/// Encode arguments as a RESP array (client side)
pub fn encode_request<A: AsRef<[u8]>>(args: &[A]) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        let arg = arg.as_ref();
        buf.put_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.put_slice(arg);
        buf.put_slice(b"\r\n");
    }
    buf.freeze()
}

// =============================================================================
// Replies
// =============================================================================

/// Encode a reply to bytes
pub fn encode_response(response: &Response) -> Bytes {
    let mut buf = BytesMut::new();

    match response {
        Response::Ok => buf.put_slice(b"+OK\r\n"),
        Response::Pong => buf.put_slice(b"+PONG\r\n"),
        Response::Bulk(value) => {
            buf.reserve(value.len() + 16);
            buf.put_slice(format!("${}\r\n", value.len()).as_bytes());
            buf.put_slice(value);
            buf.put_slice(b"\r\n");
        }
        Response::Nil => buf.put_slice(b"$-1\r\n"),
        Response::Integer(n) => buf.put_slice(format!(":{}\r\n", n).as_bytes()),
        Response::Error(message) => {
            // Keep the reply on one line
            let message = message.replace(['\r', '\n'], " ");
            buf.put_slice(format!("-ERR {}\r\n", message).as_bytes());
        }
    }

    buf.freeze()
}

/// Write a reply to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}

/// Read one reply (client side)
pub fn read_response<R: BufRead>(reader: &mut R) -> Result<Response> {
    let line = read_line(reader)?.ok_or_else(|| {
        DriftError::Protocol("connection closed before reply".to_string())
    })?;

    let (kind, rest) = match line.split_first() {
        Some((kind, rest)) => (*kind, rest),
        None => return Err(DriftError::Protocol("empty reply line".to_string())),
    };

    match kind {
        b'+' => match rest {
            b"OK" => Ok(Response::Ok),
            b"PONG" => Ok(Response::Pong),
            other => Err(DriftError::Protocol(format!(
                "unexpected status reply: {}",
                String::from_utf8_lossy(other)
            ))),
        },
        b'-' => {
            let text = String::from_utf8_lossy(rest);
            let message = text.strip_prefix("ERR ").unwrap_or(&text);
            Ok(Response::Error(message.to_string()))
        }
        b':' => {
            let text = String::from_utf8_lossy(rest);
            text.trim()
                .parse()
                .map(Response::Integer)
                .map_err(|_| DriftError::Protocol(format!("bad integer reply: {}", text)))
        }
        b'$' => {
            if rest == b"-1" {
                return Ok(Response::Nil);
            }
            let len = parse_len(rest, "bulk length")?;
            if len > MAX_BULK_SIZE {
                return Err(DriftError::Protocol(format!(
                    "bulk reply too large: {} bytes",
                    len
                )));
            }
            let mut data = vec![0u8; len + 2];
            reader.read_exact(&mut data)?;
            data.truncate(len);
            Ok(Response::Bulk(data))
        }
        other => Err(DriftError::Protocol(format!(
            "unknown reply type: {:?}",
            other as char
        ))),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Read one line without its trailing `\r\n` / `\n`.
/// `Ok(None)` at end of stream with nothing read.
fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE as u64 + 1)
        .read_until(b'\n', &mut line)?;

    if read == 0 {
        return Ok(None);
    }
    if line.last() != Some(&b'\n') {
        if line.len() > MAX_LINE {
            return Err(DriftError::Protocol(format!(
                "line longer than {} bytes",
                MAX_LINE
            )));
        }
        return Err(DriftError::Protocol(
            "stream ended in the middle of a line".to_string(),
        ));
    }

    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Some(line))
}

fn parse_len(digits: &[u8], what: &str) -> Result<usize> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .ok_or_else(|| {
            DriftError::Protocol(format!(
                "invalid {}: {:?}",
                what,
                String::from_utf8_lossy(digits)
            ))
        })
}
