//! FTP Command parsing
//!
//! Accumulates control-connection bytes and splits them into CRLF-terminated
//! command lines.

const CRLF: &[u8] = b"\r\n";

/// Fixed-capacity receive buffer for one control connection.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    capacity: usize,
    /// Dropping the tail of an overlong line until its CRLF
    discarding: bool,
    last_was_cr: bool,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
            discarding: false,
            last_was_cr: false,
        }
    }

    /// Free space left before the buffer overflows.
    pub fn spare(&self) -> usize {
        self.capacity.saturating_sub(self.buf.len())
    }

    /// Appends received bytes and returns how many were consumed. Bytes
    /// skipped while discarding an overlong line count as consumed; bytes
    /// past the capacity do not and stay with the caller.
    pub fn extend(&mut self, bytes: &[u8]) -> usize {
        let mut rest = bytes;
        if self.discarding {
            match self.skip_to_line_end(rest) {
                Some(tail) => rest = tail,
                None => return bytes.len(),
            }
        }
        let take = rest.len().min(self.spare());
        self.buf.extend_from_slice(&rest[..take]);
        bytes.len() - rest.len() + take
    }

    /// Returns the bytes following the CRLF that ends the discarded line.
    fn skip_to_line_end<'a>(&mut self, bytes: &'a [u8]) -> Option<&'a [u8]> {
        for (i, &b) in bytes.iter().enumerate() {
            if self.last_was_cr && b == b'\n' {
                self.discarding = false;
                self.last_was_cr = false;
                return Some(&bytes[i + 1..]);
            }
            self.last_was_cr = b == b'\r';
        }
        None
    }

    fn line_end(&self) -> Option<usize> {
        self.buf.windows(CRLF.len()).position(|w| w == CRLF)
    }

    pub fn has_line(&self) -> bool {
        self.line_end().is_some()
    }

    /// Removes and returns the first complete line, without its CRLF.
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.line_end()?;
        let line = String::from_utf8_lossy(&self.buf[..end]).into_owned();
        self.buf.drain(..end + CRLF.len());
        Some(line)
    }

    /// The buffer is full and holds no complete line.
    pub fn overflowed(&self) -> bool {
        self.buf.len() >= self.capacity && !self.has_line()
    }

    /// Drops the overflowing line, including bytes still to arrive before
    /// its CRLF.
    pub fn discard_overflow(&mut self) {
        self.last_was_cr = self.buf.last() == Some(&b'\r');
        self.buf.clear();
        self.discarding = true;
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Uppercases the leading token of a command line. Arguments keep their case.
pub fn uppercase_verb(line: &str) -> String {
    let split = line.find(char::is_whitespace).unwrap_or(line.len());
    let (verb, rest) = line.split_at(split);
    let mut out = verb.to_ascii_uppercase();
    out.push_str(rest);
    out
}
