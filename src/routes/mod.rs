//! Route table for the HTTP API.

pub mod routes;
