//! Error types for the source registries

use thiserror::Error;

use crate::source::GenericSource;

/// Contract violations detected by the registries
///
/// These are programming errors on the caller's side. Callers treat them as
/// fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Source id outside the registry
    #[error("source {id} out of range (max {max})")]
    OutOfRange {
        /// Offending source
        id: GenericSource,
        /// Number of ids in the registry
        max: usize,
    },

    /// Too many observers registered for one source
    #[error("observer limit of {limit} reached for {id}")]
    ObserverLimit {
        /// Source the observer was registered for
        id: GenericSource,
        /// Maximum number of observers per source
        limit: usize,
    },
}
