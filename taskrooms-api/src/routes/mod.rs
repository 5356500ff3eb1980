/// Route handlers for the API server

pub mod auth;
pub mod health;
pub mod rooms;
pub mod tasks;
pub mod users;
