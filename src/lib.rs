//! Archive verification service.
//!
//! Verifies that an archive retrieved from tape-backed long-term storage
//! still matches the checksums recorded before it was archived. Requests
//! are accepted over HTTP, executed asynchronously by a separate worker
//! process, and polled for completion.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
