//! Library crate for clash-back, exposing modules for binaries and integration tests.

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

/// Realtime sync client used by screens written in Rust.
#[cfg(feature = "client")]
pub mod client;
