//! Common test utilities for WebDAV integration tests.
#![allow(dead_code)]

pub mod counting;
pub mod harness;

pub use counting::*;
pub use harness::*;
