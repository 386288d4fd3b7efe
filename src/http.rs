//! Minimal HTTP/1.1 transport over `TcpStream`.
//!
//! Serves the JSON-RPC client and the compiler build-list lookup. Plain HTTP
//! only: local development nodes and build-list mirrors speak it, and
//! keeping TLS out of the transport keeps the attack and dependency surface
//! small. HTTPS URLs are rejected with an explicit error.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Responses larger than this are rejected rather than buffered.
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Response {
    pub status: u16,
    pub body: String,
}

/// `GET` the given URL.
pub fn get(url: &str) -> Result<Response, String> {
    request("GET", url, None)
}

/// `POST` a JSON body to the given URL.
pub fn post_json(url: &str, body: &str) -> Result<Response, String> {
    request("POST", url, Some(body))
}

fn request(method: &str, url: &str, body: Option<&str>) -> Result<Response, String> {
    let target = Target::parse(url)?;

    let addr = format!("{}:{}", target.host, target.port);
    let sock_addr = addr
        .to_socket_addrs()
        .map_err(|e| format!("cannot resolve {}: {}", addr, e))?
        .next()
        .ok_or_else(|| format!("no addresses for {}", addr))?;

    let stream = TcpStream::connect_timeout(&sock_addr, CONNECT_TIMEOUT)
        .map_err(|e| format!("cannot connect to {}: {}", addr, e))?;
    stream
        .set_read_timeout(Some(READ_TIMEOUT))
        .map_err(|e| format!("set timeout: {}", e))?;

    let mut head = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nUser-Agent: solsh/0.1\r\n",
        method, target.path, target.host_header,
    );
    if let Some(body) = body {
        head.push_str(&format!(
            "Content-Type: application/json\r\nContent-Length: {}\r\n",
            body.len()
        ));
    }
    head.push_str("\r\n");

    (&stream)
        .write_all(head.as_bytes())
        .map_err(|e| format!("write request: {}", e))?;
    if let Some(body) = body {
        (&stream)
            .write_all(body.as_bytes())
            .map_err(|e| format!("write body: {}", e))?;
    }

    read_response(&stream)
}

struct Target {
    host: String,
    port: u16,
    /// Host as it appears in the URL (kept for the `Host:` header).
    host_header: String,
    path: String,
}

impl Target {
    fn parse(url: &str) -> Result<Target, String> {
        let url = url.trim();
        let rest = if let Some(rest) = url.strip_prefix("http://") {
            rest
        } else if url.starts_with("https://") {
            return Err("HTTPS is not supported by the built-in transport".to_string());
        } else {
            url
        };

        let (host_port, path) = match rest.split_once('/') {
            Some((hp, p)) => (hp, format!("/{}", p)),
            None => (rest, "/".to_string()),
        };
        if host_port.is_empty() {
            return Err(format!("invalid url: {}", url));
        }

        let (host, port) = match host_port.split_once(':') {
            Some((h, p)) => {
                let port: u16 = p.parse().map_err(|_| format!("invalid port in {}", url))?;
                (h.to_string(), port)
            }
            None => (host_port.to_string(), 80),
        };

        Ok(Target {
            host,
            port,
            host_header: host_port.to_string(),
            path,
        })
    }
}

fn read_response(stream: &TcpStream) -> Result<Response, String> {
    let mut reader = BufReader::new(stream);

    let mut status_line = String::new();
    reader
        .read_line(&mut status_line)
        .map_err(|e| format!("read status: {}", e))?;
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(500);

    let mut content_length: Option<usize> = None;
    let mut chunked = false;
    loop {
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| format!("read header: {}", e))?;
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_lowercase();
            let value = value.trim();
            if key == "content-length" {
                content_length = value.parse().ok();
            } else if key == "transfer-encoding" && value.to_lowercase().contains("chunked") {
                chunked = true;
            }
        }
    }

    let body = if chunked {
        read_chunked(&mut reader)?
    } else if let Some(len) = content_length {
        if len > MAX_RESPONSE_SIZE {
            return Err(format!(
                "response too large: {} bytes exceeds the {} byte limit",
                len, MAX_RESPONSE_SIZE
            ));
        }
        let mut buf = vec![0u8; len];
        reader
            .read_exact(&mut buf)
            .map_err(|e| format!("read body: {}", e))?;
        buf
    } else {
        let mut buf = Vec::new();
        let mut block = [0u8; 8192];
        loop {
            let n = reader
                .read(&mut block)
                .map_err(|e| format!("read body: {}", e))?;
            if n == 0 {
                break;
            }
            if buf.len() + n > MAX_RESPONSE_SIZE {
                return Err(format!(
                    "response too large: exceeds the {} byte limit",
                    MAX_RESPONSE_SIZE
                ));
            }
            buf.extend_from_slice(&block[..n]);
        }
        buf
    };

    Ok(Response {
        status,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn read_chunked(reader: &mut BufReader<&TcpStream>) -> Result<Vec<u8>, String> {
    let mut body = Vec::new();
    loop {
        let mut size_line = String::new();
        reader
            .read_line(&mut size_line)
            .map_err(|e| format!("read chunk size: {}", e))?;
        let size = usize::from_str_radix(size_line.trim(), 16)
            .map_err(|_| format!("invalid chunk size: {:?}", size_line.trim()))?;
        if size == 0 {
            break;
        }
        if body.len() + size > MAX_RESPONSE_SIZE {
            return Err(format!(
                "chunked response too large: exceeds the {} byte limit",
                MAX_RESPONSE_SIZE
            ));
        }
        let mut chunk = vec![0u8; size];
        reader
            .read_exact(&mut chunk)
            .map_err(|e| format!("read chunk: {}", e))?;
        body.extend_from_slice(&chunk);
        let mut crlf = String::new();
        let _ = reader.read_line(&mut crlf);
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_target_parsing() {
        let t = Target::parse("http://127.0.0.1:8545").unwrap();
        assert_eq!(t.host, "127.0.0.1");
        assert_eq!(t.port, 8545);
        assert_eq!(t.path, "/");

        let t = Target::parse("http://example.com/bin/list.json").unwrap();
        assert_eq!(t.port, 80);
        assert_eq!(t.path, "/bin/list.json");
        assert_eq!(t.host_header, "example.com");
    }

    #[test]
    fn test_https_is_rejected() {
        let err = Target::parse("https://example.com").unwrap_err();
        assert!(err.contains("HTTPS"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(Target::parse("http://host:notaport/").is_err());
    }

    #[test]
    fn test_round_trip_against_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(socket.try_clone().unwrap());
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            assert!(line.starts_with("POST / HTTP/1.1"));
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 15\r\n\r\n{\"result\":\"ok\"}")
                .unwrap();
        });

        let url = format!("http://{}", addr);
        let response = post_json(&url, "{}").unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "{\"result\":\"ok\"}");
        handle.join().unwrap();
    }
}
