/// Prefix of every versioned route
pub const API_PREFIX: &str = "/api/v1";

/// Largest request body accepted by JSON endpoints
pub const MAX_JSON_BODY_BYTES: usize = 1024 * 1024;

/// In-flight requests served at once before callers queue
pub const HTTP_CONCURRENCY_LIMIT: usize = 256;
