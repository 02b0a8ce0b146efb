//! Fetching the `stats` response from a running server.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use crate::config::Target;
use crate::error::CollectorError;
use crate::stats::{StatsBuffer, StatsMap};

/// Request line sent to the server.
pub const STATS_REQUEST: &[u8] = b"stats\r\n";

const QUIT_REQUEST: &[u8] = b"quit\r\n";
const READ_CHUNK: usize = 4096;

/// Anything that can produce a parsed stats response for a target.
pub trait StatsSource {
    fn fetch_stats(&self, target: &Target) -> Result<StatsMap, CollectorError>;
}

/// Plain TCP client with one deadline covering connect, write and read.
///
/// Name resolution goes through the system resolver and is not covered by
/// the deadline.
#[derive(Debug, Clone)]
pub struct TcpStatsClient {
    timeout: Duration,
}

impl TcpStatsClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn connect(&self, target: &Target, deadline: Instant) -> io::Result<TcpStream> {
        let addrs: Vec<SocketAddr> = (target.host.as_str(), target.port)
            .to_socket_addrs()?
            .collect();
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "host resolved to no addresses",
            ));
        }

        let mut last_err = None;
        for addr in addrs {
            let remaining = remaining_until(deadline)?;
            log::debug!("connecting to {addr}");
            match TcpStream::connect_timeout(&addr, remaining) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    log::debug!("connect to {addr} failed: {e}");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::NotConnected)))
    }

    fn exchange(&self, target: &Target) -> io::Result<StatsMap> {
        let deadline = Instant::now() + self.timeout;
        let mut stream = self.connect(target, deadline)?;

        stream.set_write_timeout(Some(remaining_until(deadline)?))?;
        stream.write_all(STATS_REQUEST)?;
        stream.flush()?;

        let mut buf = StatsBuffer::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            stream.set_read_timeout(Some(remaining_until(deadline)?))?;
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buf.push(&chunk[..n])?;
                    if buf.is_complete() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "timed out waiting for stats response",
                    ));
                }
                Err(e) => return Err(e),
            }
        }
        log::debug!("read {} stats lines from {target}", buf.line_count());

        // Best effort; the response is already complete.
        let _ = stream.write_all(QUIT_REQUEST);
        Ok(buf.finish())
    }
}

impl StatsSource for TcpStatsClient {
    fn fetch_stats(&self, target: &Target) -> Result<StatsMap, CollectorError> {
        self.exchange(target)
            .map_err(|source| CollectorError::UnknownHost {
                host: target.host.clone(),
                port: target.port,
                source,
            })
    }
}

fn remaining_until(deadline: Instant) -> io::Result<Duration> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if remaining.is_zero() {
        Err(io::Error::new(io::ErrorKind::TimedOut, "deadline expired"))
    } else {
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use std::net::TcpListener;
    use std::thread;

    fn serve_once(reply: Vec<Vec<u8>>) -> (u16, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = io::BufReader::new(stream.try_clone().unwrap());
            let mut request = String::new();
            reader.read_line(&mut request).unwrap();
            let mut writer = stream;
            for part in reply {
                writer.write_all(&part).unwrap();
                writer.flush().unwrap();
                thread::sleep(Duration::from_millis(5));
            }
            request
        });
        (port, handle)
    }

    fn target(port: u16) -> Target {
        Target {
            host: "127.0.0.1".to_string(),
            port,
        }
    }

    #[test]
    fn fetches_stats_in_one_chunk() {
        let reply = b"STAT threads 4\r\nSTAT cmd_get 9\r\nEND\r\n".to_vec();
        let (port, server) = serve_once(vec![reply]);
        let client = TcpStatsClient::new(Duration::from_secs(5));
        let stats = client.fetch_stats(&target(port)).unwrap();
        assert_eq!(stats["threads"], "4");
        assert_eq!(stats["cmd_get"], "9");
        assert_eq!(server.join().unwrap(), "stats\r\n");
    }

    #[test]
    fn fetches_stats_across_chunks() {
        let (port, server) = serve_once(vec![
            b"STAT thre".to_vec(),
            b"ads 4\r\nSTAT cmd".to_vec(),
            b"_get 9\r\nEN".to_vec(),
            b"D\r\n".to_vec(),
        ]);
        let client = TcpStatsClient::new(Duration::from_secs(5));
        let stats = client.fetch_stats(&target(port)).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["cmd_get"], "9");
        server.join().unwrap();
    }

    #[test]
    fn peer_close_without_end_still_returns_stats() {
        let (port, server) = serve_once(vec![b"STAT threads 4\r\n".to_vec()]);
        let client = TcpStatsClient::new(Duration::from_secs(5));
        let stats = client.fetch_stats(&target(port)).unwrap();
        assert_eq!(stats["threads"], "4");
        server.join().unwrap();
    }

    #[test]
    fn refused_connection_is_unknown_host() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let client = TcpStatsClient::new(Duration::from_secs(2));
        let err = client.fetch_stats(&target(port)).unwrap_err();
        assert_eq!(err.exit_code(), 28);
    }

    #[test]
    fn silent_server_times_out_as_unknown_host() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(800));
            drop(stream);
        });
        let client = TcpStatsClient::new(Duration::from_millis(200));
        let started = Instant::now();
        let err = client.fetch_stats(&target(port)).unwrap_err();
        assert!(started.elapsed() < Duration::from_millis(700));
        assert!(matches!(err, CollectorError::UnknownHost { .. }));
        server.join().unwrap();
    }

    #[test]
    fn endless_line_is_unknown_host() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let junk = vec![b'x'; 8192];
            // Stops once the client hangs up.
            while stream.write_all(&junk).is_ok() {}
        });
        let client = TcpStatsClient::new(Duration::from_secs(5));
        let started = Instant::now();
        let err = client.fetch_stats(&target(port)).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(4));
        match err {
            CollectorError::UnknownHost { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("unexpected error: {other}"),
        }
        server.join().unwrap();
    }

    #[test]
    fn unresolvable_host_is_unknown_host() {
        let client = TcpStatsClient::new(Duration::from_secs(2));
        let t = Target {
            host: "no-such-host.invalid".to_string(),
            port: 11211,
        };
        let err = client.fetch_stats(&t).unwrap_err();
        assert_eq!(err.exit_code(), 28);
    }
}
