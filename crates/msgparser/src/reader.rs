use crate::types::ParseError;

/// A cursor-based reader over a binary message body.
///
/// Uses "sticky error" semantics: once a read fails, all subsequent reads
/// return zero/default values and the first failure is reported by
/// [`MsgReader::error`] after parsing completes.
pub(crate) struct MsgReader<'a> {
    data: &'a [u8],
    pos: usize,
    err: Option<ReadError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadError {
    Eof,
    Utf8,
}

impl From<ReadError> for ParseError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Eof => ParseError::UnexpectedEof,
            ReadError::Utf8 => ParseError::InvalidUtf8,
        }
    }
}

impl<'a> MsgReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            err: None,
        }
    }

    pub fn error(&self) -> Option<ReadError> {
        self.err
    }

    fn set_err(&mut self, err: ReadError) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    fn ensure(&mut self, n: usize) -> bool {
        if self.err.is_some() || self.pos + n > self.data.len() {
            self.set_err(ReadError::Eof);
            false
        } else {
            true
        }
    }

    fn read_bytes_slice(&mut self, n: usize) -> &'a [u8] {
        if !self.ensure(n) {
            return &[];
        }
        let start = self.pos;
        self.pos += n;
        &self.data[start..self.pos]
    }

    /// Read a little-endian u32.
    pub fn u32(&mut self) -> u32 {
        let b = self.read_bytes_slice(4);
        if b.len() < 4 {
            return 0;
        }
        u32::from_le_bytes(b.try_into().unwrap())
    }

    /// Read a little-endian u64.
    pub fn u64(&mut self) -> u64 {
        let b = self.read_bytes_slice(8);
        if b.len() < 8 {
            return 0;
        }
        u64::from_le_bytes(b.try_into().unwrap())
    }

    /// Read a little-endian two's-complement i64.
    pub fn i64(&mut self) -> i64 {
        self.u64() as i64
    }

    /// Read a single signed byte.
    pub fn i8(&mut self) -> i8 {
        let b = self.read_bytes_slice(1);
        if b.is_empty() {
            return 0;
        }
        b[0] as i8
    }

    /// Read exactly `n` bytes as a UTF-8 string. Malformed UTF-8 is a hard
    /// failure, not replaced.
    pub fn utf8(&mut self, n: usize) -> String {
        let bytes = self.read_bytes_slice(n);
        if self.err.is_some() {
            return String::new();
        }
        match std::str::from_utf8(bytes) {
            Ok(s) => s.to_owned(),
            Err(_) => {
                self.set_err(ReadError::Utf8);
                String::new()
            }
        }
    }

    /// Read everything up to the end of the body as a UTF-8 string.
    pub fn utf8_rest(&mut self) -> String {
        let n = self.data.len().saturating_sub(self.pos);
        self.utf8(n)
    }
}
