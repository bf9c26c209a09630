use thiserror::Error;

/// Errors surfaced by a `JobStore` implementation.
///
/// `Backend` wraps whatever the concrete engine reports once it has already
/// ruled out the cases the Store contract gives special meaning to — a
/// `BUSY`/`LOCKED` condition during `claim()` is never turned into a
/// `StoreError`; it is swallowed and treated as "no job this tick" before it
/// reaches this type.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job id '{0}' already exists")]
    DuplicateId(String),

    #[error("no job with id '{0}'")]
    NotFound(String),

    #[error("store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}
