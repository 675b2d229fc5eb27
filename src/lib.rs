//! Rengendoc - render document templates on demand
//!
//! Merges a template (inline or fetched by URL) with a JSON context,
//! stores the result in S3-compatible object storage and returns its URL.
//! This library exposes modules for integration testing.

pub mod api;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
