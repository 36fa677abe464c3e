//! services/api/src/lib.rs
//!
//! The library surface of the `api` service: configuration, the unified
//! error type, the port adapters, and the web layer.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
