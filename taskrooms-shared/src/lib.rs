//! # Taskrooms Shared Library
//!
//! This crate contains the domain models, persistence layer, and business
//! logic shared by the taskrooms API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, rooms, memberships, tasks)
//! - `auth`: Password hashing, JWT tokens, middleware, authorization rules
//! - `db`: Connection pool and migrations
//! - `stats`: Streak engine and task aggregates

pub mod auth;
pub mod db;
pub mod models;
pub mod stats;

/// Current version of the taskrooms shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
