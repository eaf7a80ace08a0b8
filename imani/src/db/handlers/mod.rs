//! Repository implementations, one per table.

pub mod repository;
pub mod users;

pub use repository::Repository;
pub use users::Users;
