//! Transfer engine: chunk planning, transfer identifiers, and the
//! per-transfer state registry consumed by presentation layers.

mod chunks;
mod id;
mod registry;

pub use chunks::{ChunkSpec, plan_chunks, total_chunks};
pub use id::generate_transfer_id;
pub use registry::{TransferRegistry, TransferSnapshot, TransferStatus};
