//! # TaskRooms API Server
//!
//! REST backend for collaborative task management: personal and room-scoped
//! tasks, invite-code rooms with owner/admin/member roles, and per-user
//! completion statistics with a daily streak.

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
