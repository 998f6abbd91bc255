//! Shared fixtures for proxy integration tests

#![allow(dead_code)]

pub mod backend_stub;
pub mod proxy;
