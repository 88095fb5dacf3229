//! Errors produced while transforming an ESP template.

/// The error type for [`crate::Reader`].
///
/// The transformer is a pure transducer (see the crate-level docs): the
/// only failure mode that actually propagates is an I/O failure from the
/// underlying character source. Malformed templates (an unterminated
/// `<%`, `<%=`, `<%--` or `${`) are not reported as errors — they drain
/// the remaining input as part of their current region, per the
/// transformer's documented best-effort behavior.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The underlying character source failed to produce a character.
    #[error("I/O error reading ESP source: {0}")]
    Io(#[from] std::io::Error),
}
