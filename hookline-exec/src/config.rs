/// Default header carrying the payload signature.
pub const DEFAULT_SIGNATURE_HEADER: &str = "Hookline-Signature";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of conditions on one include path, the root included.
    pub max_include_depth: usize,
    /// How often a graph write is retried after a concurrent modification.
    pub write_retries: usize,
    /// Responses larger than this are dispatch failures.
    pub max_response_bytes: usize,
    pub signature_header: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_include_depth: 5,
            write_retries: 3,
            max_response_bytes: 4 * 1024 * 1024,
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
        }
    }
}
