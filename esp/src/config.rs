//! Transformer configuration.

/// The default writer-initialization prologue, emitted once before the
/// first translated statement.
const DEFAULT_OUT_INIT: &str = "out=response.writer;";

/// Configuration consumed by [`crate::Reader::new`].
///
/// A small builder-style config struct, consumed once by the reader
/// rather than exposing a free-standing setter on it. Because the reader
/// takes ownership of an `EspConfig` at construction, there is no way to
/// override the out-init statement after reading has begun — the shape
/// makes that case unrepresentable instead of merely discouraged.
#[derive(Debug, Clone)]
pub struct EspConfig {
    out_init: String,
}

impl EspConfig {
    /// Overrides the default out-init statement.
    #[must_use]
    pub fn out_init(mut self, statement: impl Into<String>) -> Self {
        self.out_init = statement.into();
        self
    }

    pub(crate) fn out_init_statement(&self) -> &str {
        &self.out_init
    }
}

impl Default for EspConfig {
    fn default() -> Self {
        Self {
            out_init: DEFAULT_OUT_INIT.to_string(),
        }
    }
}
