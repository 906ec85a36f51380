//! Core data models for the file-storage service.
//!
//! Entries represent the logical structure of each user's file tree. They
//! map cleanly to database tables via `sqlx::FromRow` and serialize
//! naturally as JSON via `serde`.

pub mod entry;
