//! Database records and request types passed to repositories.

pub mod users;
