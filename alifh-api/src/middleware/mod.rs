/// Middleware for the API server
///
/// - `security`: security response headers
/// - `session`: session resolution and the auth extractors

pub mod security;
pub mod session;
