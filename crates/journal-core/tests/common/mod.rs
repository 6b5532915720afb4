//! Shared helpers for journal-core integration tests

#![allow(dead_code)]

pub mod failing_store;
pub mod fixtures;
