//! Fake RESP2 store for wire-level client tests.
//!
//! Accepts any number of connections, records every command, and answers
//! with whatever the test handler returns. Unhandled commands get `+PONG`
//! for `PING`, `-NOSCRIPT` for `EVALSHA`, and `+OK` otherwise.

#![allow(dead_code)]

use std::net::TcpListener as StdTcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub type Command = Vec<Vec<u8>>;

/// Bytes written in response to one command, optionally followed by a
/// delayed push (used for pub/sub messages).
pub struct Reply {
    pub now: Vec<u8>,
    pub later: Option<(Duration, Vec<u8>)>,
}

impl Reply {
    pub fn raw(bytes: Vec<u8>) -> Option<Reply> {
        Some(Reply {
            now: bytes,
            later: None,
        })
    }

    pub fn then(now: Vec<u8>, delay: Duration, later: Vec<u8>) -> Option<Reply> {
        Some(Reply {
            now,
            later: Some((delay, later)),
        })
    }
}

type Handler = Arc<dyn Fn(&Command) -> Option<Reply> + Send + Sync>;

pub struct FakeServer {
    pub port: u16,
    log: Arc<Mutex<Vec<Command>>>,
}

impl FakeServer {
    /// Binds an ephemeral port and serves `make(port)` as the handler.
    pub async fn spawn<F, H>(make: F) -> FakeServer
    where
        F: FnOnce(u16) -> H,
        H: Fn(&Command) -> Option<Reply> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let handler: Handler = Arc::new(make(port));
        let log = Arc::new(Mutex::new(Vec::new()));

        let accept_log = log.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                tokio::spawn(serve(stream, handler.clone(), accept_log.clone()));
            }
        });

        FakeServer { port, log }
    }

    /// Every recorded command whose name matches `name` (case-insensitive).
    pub fn commands_named(&self, name: &str) -> Vec<Command> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|cmd| cmd.first().map_or(false, |head| head.eq_ignore_ascii_case(name.as_bytes())))
            .cloned()
            .collect()
    }
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

async fn serve(mut stream: TcpStream, handler: Handler, log: Arc<Mutex<Vec<Command>>>) {
    let mut buffer = BytesMut::with_capacity(8 * 1024);
    loop {
        match stream.read_buf(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }

        while let Some(args) = parse_command(&mut buffer) {
            log.lock().unwrap().push(args.clone());
            let reply = handler(&args).unwrap_or_else(|| default_reply(&args));
            if stream.write_all(&reply.now).await.is_err() {
                return;
            }
            if let Some((delay, bytes)) = reply.later {
                tokio::time::sleep(delay).await;
                if stream.write_all(&bytes).await.is_err() {
                    return;
                }
            }
        }
    }
}

fn default_reply(args: &Command) -> Reply {
    let name = args.first().map(|head| head.to_ascii_uppercase()).unwrap_or_default();
    let now = match name.as_slice() {
        b"PING" => simple("PONG"),
        b"EVALSHA" => error("NOSCRIPT No matching script. Please use EVAL."),
        _ => simple("OK"),
    };
    Reply { now, later: None }
}

/// Parses one complete `*N` array of bulk strings, leaving partial input.
fn parse_command(buffer: &mut BytesMut) -> Option<Command> {
    let (args, used) = try_parse(&buffer[..])?;
    buffer.advance(used);
    Some(args)
}

fn try_parse(data: &[u8]) -> Option<(Command, usize)> {
    let (count, mut pos) = read_header(data, 0, b'*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let (len, start) = read_header(data, pos, b'$')?;
        let end = start + len;
        if data.len() < end + 2 {
            return None;
        }
        args.push(data[start..end].to_vec());
        pos = end + 2;
    }
    Some((args, pos))
}

fn read_header(data: &[u8], pos: usize, marker: u8) -> Option<(usize, usize)> {
    if data.len() <= pos {
        return None;
    }
    assert_eq!(data[pos], marker, "clients send arrays of bulk strings");
    let line_len = data[pos..].windows(2).position(|w| w == b"\r\n")?;
    let digits = std::str::from_utf8(&data[pos + 1..pos + line_len]).ok()?;
    Some((digits.parse().ok()?, pos + line_len + 2))
}

pub fn simple(message: &str) -> Vec<u8> {
    format!("+{message}\r\n").into_bytes()
}

/// Error reply; `message` carries its own code (`ERR`, `WRONGTYPE`, ...).
pub fn error(message: &str) -> Vec<u8> {
    format!("-{message}\r\n").into_bytes()
}

pub fn integer(value: i64) -> Vec<u8> {
    format!(":{value}\r\n").into_bytes()
}

pub fn bulk(data: &[u8]) -> Vec<u8> {
    let mut buf = format!("${}\r\n", data.len()).into_bytes();
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
    buf
}

pub fn bulk_array<T: AsRef<[u8]>>(items: &[T]) -> Vec<u8> {
    let mut buf = format!("*{}\r\n", items.len()).into_bytes();
    for item in items {
        buf.extend_from_slice(&bulk(item.as_ref()));
    }
    buf
}

pub fn subscribe_ack(channel: &str, count: i64) -> Vec<u8> {
    let mut buf = b"*3\r\n".to_vec();
    buf.extend_from_slice(&bulk(b"subscribe"));
    buf.extend_from_slice(&bulk(channel.as_bytes()));
    buf.extend_from_slice(&integer(count));
    buf
}

pub fn published(channel: &str, payload: &[u8]) -> Vec<u8> {
    let mut buf = b"*3\r\n".to_vec();
    buf.extend_from_slice(&bulk(b"message"));
    buf.extend_from_slice(&bulk(channel.as_bytes()));
    buf.extend_from_slice(&bulk(payload));
    buf
}

/// `CLUSTER SLOTS` reply assigning each range to `127.0.0.1:port`.
pub fn cluster_slots(port: u16, ranges: &[(u16, u16)]) -> Vec<u8> {
    let mut buf = format!("*{}\r\n", ranges.len()).into_bytes();
    for &(start, end) in ranges {
        buf.extend_from_slice(b"*3\r\n");
        buf.extend_from_slice(&integer(start as i64));
        buf.extend_from_slice(&integer(end as i64));
        buf.extend_from_slice(b"*3\r\n");
        buf.extend_from_slice(&bulk(b"127.0.0.1"));
        buf.extend_from_slice(&integer(port as i64));
        buf.extend_from_slice(&bulk(b"fake-node-0000000000000000000000000000000"));
    }
    buf
}

pub fn is(cmd: &Command, name: &str) -> bool {
    cmd.first().map_or(false, |head| head.eq_ignore_ascii_case(name.as_bytes()))
}

pub fn arg_str(cmd: &Command, idx: usize) -> String {
    String::from_utf8_lossy(&cmd[idx]).into_owned()
}

pub fn args_str(cmd: &Command) -> Vec<String> {
    cmd.iter().map(|arg| String::from_utf8_lossy(arg).into_owned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_command() {
        let mut buf = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n"[..]);
        let cmd = parse_command(&mut buf).unwrap();
        assert_eq!(cmd, vec![b"GET".to_vec(), b"key".to_vec()]);
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_partial_command() {
        let mut buf = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$3\r\nke"[..]);
        let before = buf.len();
        assert!(parse_command(&mut buf).is_none());
        assert_eq!(buf.len(), before);
    }
}
