//! Parsing of the line-oriented `stats` response.
//!
//! A memcached `stats` reply looks like:
//!
//! ```text
//! STAT pid 1162
//! STAT uptime 5022
//! STAT cmd_get 28
//! END
//! ```
//!
//! Only lines with exactly three whitespace-separated tokens contribute.
//! Everything else (the `END` terminator, `ERROR`, blank lines) is ignored.

use std::collections::HashMap;
use std::io;

/// Terminal line of a stats response.
pub const END_MARKER: &str = "END";

/// Longest single line accepted from the server.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Upper bound on the whole response.
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;

/// Flat mapping from stats key to its raw string value.
pub type StatsMap = HashMap<String, String>;

/// Parse a complete response. Later duplicates of a key win.
pub fn parse_stats(text: &str) -> StatsMap {
    let mut out = StatsMap::new();
    for line in text.lines() {
        parse_line(line, &mut out);
    }
    out
}

fn parse_line(line: &str, out: &mut StatsMap) {
    let mut tokens = line.split_whitespace();
    let (Some(_verb), Some(key), Some(value), None) =
        (tokens.next(), tokens.next(), tokens.next(), tokens.next())
    else {
        return;
    };
    out.insert(key.to_string(), value.to_string());
}

/// Accumulates a response that may arrive in any number of chunks.
///
/// Chunk boundaries may fall anywhere, including inside a line or inside a
/// multi-byte character; bytes are only decoded once a full line is present.
/// Each byte is scanned for a line break once.
#[derive(Debug, Default)]
pub struct StatsBuffer {
    pending: Vec<u8>,
    scanned: usize,
    received: usize,
    stats: StatsMap,
    complete: bool,
    lines: usize,
}

impl StatsBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of bytes.
    ///
    /// Fails with `InvalidData` once the response or its unterminated tail
    /// outgrows [`MAX_RESPONSE_BYTES`] or [`MAX_LINE_BYTES`].
    pub fn push(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.complete {
            return Ok(());
        }
        self.received += chunk.len();
        if self.received > MAX_RESPONSE_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("stats response exceeds {MAX_RESPONSE_BYTES} bytes"),
            ));
        }

        let mut pending = std::mem::take(&mut self.pending);
        pending.extend_from_slice(chunk);
        let mut start = 0;
        let mut scan = self.scanned;
        while let Some(offset) = pending[scan..].iter().position(|&b| b == b'\n') {
            let end = scan + offset + 1;
            self.consume_line(&pending[start..end]);
            if self.complete {
                self.scanned = 0;
                return Ok(());
            }
            start = end;
            scan = end;
        }
        pending.drain(..start);
        self.scanned = pending.len();
        self.pending = pending;

        if self.pending.len() > MAX_LINE_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("stats line exceeds {MAX_LINE_BYTES} bytes"),
            ));
        }
        Ok(())
    }

    fn consume_line(&mut self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim();
        self.lines += 1;
        if line == END_MARKER {
            self.complete = true;
            return;
        }
        parse_line(line, &mut self.stats);
    }

    /// True once the `END` line has been seen.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of full lines consumed so far.
    pub fn line_count(&self) -> usize {
        self.lines
    }

    /// Finish the response, parsing any trailing unterminated line.
    pub fn finish(mut self) -> StatsMap {
        if !self.complete && !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            self.consume_line(&tail);
        }
        self.stats
    }
}
