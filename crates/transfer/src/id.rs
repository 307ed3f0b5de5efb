use uuid::Uuid;

/// Generates a transfer-scoped identifier for a chunked upload.
///
/// Produced client-side before any network call, so every chunk of one
/// upload carries the same identifier. The server treats it as an opaque
/// string; at 122 random bits a collision check against server state is
/// unnecessary.
pub fn generate_transfer_id() -> String {
    Uuid::new_v4().to_string()
}
