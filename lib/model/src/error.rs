use std::fmt::{Debug, Display, Formatter};
use thiserror::Error;

/// A light-weight result, mainly used while joining triples into solution mappings.
pub type ThinResult<T> = Result<T, ThinError>;

/// A thin error type that indicates an *expected* failure without any reason.
///
/// During join evaluation, most attempts to extend a solution mapping with a triple fail. For
/// example, because the triple binds a variable to a different term than the mapping. These
/// failures are part of the evaluation and are treated equally, so we do not need to store a
/// reason.
#[derive(Clone, Copy, Debug, Default, Error, PartialEq, Eq)]
pub struct ThinError {}

impl ThinError {
    /// Creates a result with a [ThinError].
    pub fn expected<T>() -> ThinResult<T> {
        Err(ThinError::default())
    }
}

impl Display for ThinError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("An expected error occurred.")
    }
}
