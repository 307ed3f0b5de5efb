/// Errors produced while driving a transfer.
///
/// Every network-boundary failure is converted to one of these at the
/// operation that issued the request, alongside a registry status update,
/// so no transfer is ever left `InProgress` forever.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Upload requested with neither a file nor text content.
    #[error("either a file or text content must be provided")]
    NoPayload,

    /// A specific chunk failed; nothing after it was dispatched.
    #[error("chunk {index} dispatch failed: {source}")]
    ChunkDispatch {
        index: u32,
        #[source]
        source: Box<TransferError>,
    },

    /// A download completed with a zero-byte body.
    ///
    /// Deliberate product policy: at the transport layer a 200 with zero
    /// bytes is indistinguishable from a broken stream, so empty downloads
    /// are always rejected, including legitimately empty files.
    #[error("downloaded payload was empty")]
    EmptyPayload,

    /// Network-level failure in the underlying transport.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The caller cancelled the transfer.
    ///
    /// Registry behavior is identical to a transport failure; only the
    /// error kind differs.
    #[error("transfer aborted")]
    Aborted,

    /// The server answered with a non-success status.
    #[error("server returned status {status}")]
    Server { status: u16 },
}

impl TransferError {
    /// Returns the failed chunk index, if this is a chunk dispatch error.
    pub fn chunk_index(&self) -> Option<u32> {
        match self {
            Self::ChunkDispatch { index, .. } => Some(*index),
            _ => None,
        }
    }
}
