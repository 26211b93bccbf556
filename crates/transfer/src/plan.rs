//! Pure chunk planning for ranged uploads.

/// A half-open byte range `[start, end)` within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// The full range of a `size`-byte file.
    pub fn full(size: u64) -> Self {
        Self {
            start: 0,
            end: size,
        }
    }

    /// Length of the range in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Renders the `Content-Range` value for this range within a file of
    /// `file_size` bytes: `bytes <start>-<end-1>/<file_size>`.
    ///
    /// The range must be non-empty; the wire format has no representation
    /// for an empty range.
    pub fn content_range(&self, file_size: u64) -> String {
        debug_assert!(self.end > self.start);
        format!("bytes {}-{}/{}", self.start, self.end - 1, file_size)
    }
}

/// Number of ranges [`plan_chunks`] produces for the same arguments.
pub fn chunk_count(file_size: u64, chunk_size: u64) -> u64 {
    if file_size == 0 {
        0
    } else if chunk_size == 0 || file_size <= chunk_size {
        1
    } else {
        file_size.div_ceil(chunk_size)
    }
}

/// Plans the ordered byte ranges for transferring `file_size` bytes in
/// chunks of at most `chunk_size` bytes.
///
/// The ranges are contiguous, non-overlapping, and cover exactly
/// `[0, file_size)`; only the last may be shorter than `chunk_size`.
///
/// `chunk_size == 0` (no chunking support) or `file_size <= chunk_size`
/// degenerates to a single full-file range — callers route that case to
/// the single-shot path and skip the range header. An empty file yields an
/// empty plan.
pub fn plan_chunks(file_size: u64, chunk_size: u64) -> Vec<ByteRange> {
    if file_size == 0 {
        return Vec::new();
    }
    if chunk_size == 0 || file_size <= chunk_size {
        return vec![ByteRange::full(file_size)];
    }

    let mut ranges = Vec::with_capacity(file_size.div_ceil(chunk_size) as usize);
    let mut start = 0;
    while start < file_size {
        let end = (start + chunk_size).min(file_size);
        ranges.push(ByteRange { start, end });
        start = end;
    }
    ranges
}
