//! Error types for validation failures.
//!
//! [`FieldError`] is the single failure produced by fail-fast operations
//! (`validate`, record construction, `set`). [`FieldErrors`] collects several
//! of them for [`RecordType::check`](crate::RecordType::check).

mod field_error;

pub use field_error::{Bound, ErrorKind, FieldError, FieldErrors};
