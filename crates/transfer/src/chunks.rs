/// One contiguous byte-range segment of a chunked upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpec {
    /// Zero-based position within the upload.
    pub index: u32,
    /// First byte of the range.
    pub start: u64,
    /// One past the last byte of the range.
    pub end: u64,
}

impl ChunkSpec {
    /// Length of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Borrows this chunk's bytes out of the full payload.
    pub fn slice<'a>(&self, payload: &'a [u8]) -> &'a [u8] {
        &payload[self.start as usize..self.end as usize]
    }
}

/// Number of chunks a payload of `total_size` bytes splits into.
pub fn total_chunks(total_size: u64, chunk_size: u64) -> u32 {
    total_size.div_ceil(chunk_size) as u32
}

/// Partitions `total_size` bytes into fixed-size chunks.
///
/// Ranges are contiguous, non-overlapping, and their union covers exactly
/// `[0, total_size)`; the final chunk is short when the size is not a
/// multiple of `chunk_size`. A zero-size payload yields no chunks.
///
/// # Panics
///
/// Panics if `chunk_size` is zero.
pub fn plan_chunks(total_size: u64, chunk_size: u64) -> Vec<ChunkSpec> {
    assert!(chunk_size > 0, "chunk_size must be non-zero");

    let count = total_chunks(total_size, chunk_size);
    let mut specs = Vec::with_capacity(count as usize);
    for index in 0..count {
        let start = u64::from(index) * chunk_size;
        let end = (start + chunk_size).min(total_size);
        specs.push(ChunkSpec { index, start, end });
    }
    specs
}
