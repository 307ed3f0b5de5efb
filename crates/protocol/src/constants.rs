use std::time::Duration;

/// Uploads at or below this size use the single-shot `/upload` endpoint (10 MiB).
pub const CHUNK_UPLOAD_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Segment size for chunked uploads (5 MiB).
///
/// Chunks of one upload are dispatched strictly sequentially, so this also
/// bounds the client's in-flight memory per transfer.
pub const CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// How long a finished transfer stays visible before its registry entry
/// is cleared.
pub const REGISTRY_GRACE_PERIOD: Duration = Duration::from_millis(2000);
