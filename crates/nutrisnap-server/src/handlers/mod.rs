//! HTTP request handlers
//!
//! Each submodule contains handlers for a specific API area.

pub mod proxy;

pub use proxy::*;
