//! Common type definitions.

/// Primary key of a user record.
pub type UserId = i64;
