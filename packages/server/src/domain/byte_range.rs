//! `Range: bytes=start-end` handling for partial content responses.

use super::error::RangeError;

/// A satisfiable, inclusive byte range within a file of `size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub size: u64,
}

impl ByteRange {
    /// Parse a `Range` header value against the size of the target file.
    ///
    /// The start must be present and inside the file. A missing, unparsable
    /// or oversized end is clamped to the last byte. Suffix ranges
    /// (`bytes=-N`) and multi-range requests are not supported.
    pub fn parse(header: &str, size: u64) -> Result<Self, RangeError> {
        let spec = header
            .trim()
            .strip_prefix("bytes=")
            .ok_or_else(|| RangeError::UnsupportedUnit(header.to_string()))?;

        let (start, end) = match spec.split('-').collect::<Vec<_>>().as_slice() {
            [start, end] => (*start, *end),
            _ => return Err(RangeError::Malformed(header.to_string())),
        };

        let start: u64 = start
            .trim()
            .parse()
            .map_err(|_| RangeError::Malformed(header.to_string()))?;
        if start >= size {
            return Err(RangeError::StartBeyondEnd { start, size });
        }

        let last = size - 1;
        let end = match end.trim().parse::<u64>() {
            Ok(end) if end < size => end,
            _ => last,
        };
        if end < start {
            return Err(RangeError::EndBeforeStart { start, end });
        }

        Ok(Self { start, end, size })
    }

    /// Number of bytes covered by the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.size)
    }
}
