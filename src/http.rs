//! Minimal HTTP/1.0 GET over any `embedded-io-async` byte stream.
//!
//! The data source is a plain-text file on the local network, so the client
//! only needs one request per connection and `Connection: close` framing.

use embedded_io_async::{Read, Write};

use crate::fault::{Fault, NetworkFault};

const DEFAULT_PORT: u16 = 80;
const HEADER_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
}

impl<'a> Endpoint<'a> {
    /// Accepts `http://host[:port][/path]`.
    pub fn parse(url: &'a str) -> Result<Self, Fault> {
        let rest = url
            .trim()
            .strip_prefix("http://")
            .ok_or(Fault::Configuration("DATA_SOURCE must be an http:// URL"))?;

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Fault::Configuration("DATA_SOURCE port is invalid"))?;
                (host, port)
            }
            None => (authority, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(Fault::Configuration("DATA_SOURCE has no host"));
        }

        Ok(Self { host, port, path })
    }
}

/// Sends a GET for `endpoint` and reads the response into `buf`.
///
/// On success the body is moved to the front of `buf` and its length is
/// returned.
pub async fn get<T>(transport: &mut T, endpoint: &Endpoint<'_>, buf: &mut [u8]) -> Result<usize, Fault>
where
    T: Read + Write,
{
    write_request(transport, endpoint)
        .await
        .map_err(|_| NetworkFault::Connect)?;

    let filled = read_to_end(transport, buf).await?;

    let head_end = find(&buf[..filled], HEADER_END).ok_or(NetworkFault::Malformed)?;
    let status = parse_status_line(&buf[..head_end])?;
    log::info!("[HTTP] GET {}{} -> status {}", endpoint.host, endpoint.path, status);
    if !(200..300).contains(&status) {
        return Err(NetworkFault::Status(status).into());
    }

    let body_start = head_end + HEADER_END.len();
    buf.copy_within(body_start..filled, 0);
    Ok(filled - body_start)
}

async fn write_request<T: Write>(transport: &mut T, endpoint: &Endpoint<'_>) -> Result<(), T::Error> {
    transport.write_all(b"GET ").await?;
    transport.write_all(endpoint.path.as_bytes()).await?;
    transport.write_all(b" HTTP/1.0\r\nHost: ").await?;
    transport.write_all(endpoint.host.as_bytes()).await?;
    transport.write_all(b"\r\nConnection: close\r\n\r\n").await?;
    transport.flush().await
}

async fn read_to_end<T: Read>(transport: &mut T, buf: &mut [u8]) -> Result<usize, NetworkFault> {
    let mut filled = 0;
    loop {
        if filled == buf.len() {
            // Full buffer is only fine if the peer has nothing more to send.
            let mut probe = [0u8; 1];
            return match transport.read(&mut probe).await {
                Ok(0) => Ok(filled),
                Ok(_) => Err(NetworkFault::TooLarge),
                Err(_) => Err(NetworkFault::Connect),
            };
        }
        match transport.read(&mut buf[filled..]).await {
            Ok(0) => return Ok(filled),
            Ok(n) => filled += n,
            Err(_) => return Err(NetworkFault::Connect),
        }
    }
}

/// Parses the `HTTP/1.x <code> <reason>` line at the start of `head`.
pub fn parse_status_line(head: &[u8]) -> Result<u16, NetworkFault> {
    let line_end = find(head, b"\r\n").unwrap_or(head.len());
    let line = core::str::from_utf8(&head[..line_end]).map_err(|_| NetworkFault::Malformed)?;

    let mut parts = line.split_ascii_whitespace();
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => {
            code.parse::<u16>().map_err(|_| NetworkFault::Malformed)
        }
        _ => Err(NetworkFault::Malformed),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
