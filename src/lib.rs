//! Authenticated file-storage service.
//!
//! Users upload files, organize them into folders, star and trash them, and
//! browse a folder tree scoped to their own account. File payloads live in a
//! media backend (local disk or a remote media API) while metadata lives in
//! SQLite.

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
