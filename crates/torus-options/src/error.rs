//! Error types for the options tree.

use thiserror::Error;

/// Result type alias for torus-options operations.
pub type Result<T> = std::result::Result<T, OptionsError>;

/// Errors raised by the options tree.
///
/// All errors are raised synchronously at the point of violation; no
/// operation mutates a node partially on failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptionsError {
    /// The stored value tag cannot be coerced to the requested type.
    #[error("option '{path}': cannot convert {from} value to {to}")]
    Conversion {
        /// Qualified path of the offending node
        path: String,
        /// Tag of the stored value
        from: &'static str,
        /// Requested target type
        to: &'static str,
    },

    /// A second defaulted read of a still-unset key supplied a different
    /// default than the first.
    #[error("option '{path}': inconsistent default values ('{previous}' then '{requested}')")]
    InconsistentDefault {
        /// Qualified path of the offending node
        path: String,
        /// Default recorded by the first read
        previous: String,
        /// Default supplied by the conflicting read
        requested: String,
    },

    /// `set` was invoked on a key already explicitly set to a different
    /// value, without force.
    ///
    /// The provenance field is deliberately not named `source`: thiserror
    /// reserves that name for the error-source chain.
    #[error("option '{path}' already set to '{existing}' (from {previous_source})")]
    AlreadySet {
        /// Qualified path of the offending node
        path: String,
        /// Rendering of the value already stored
        existing: String,
        /// Provenance of the existing value
        previous_source: String,
    },
}
