//! Fixtures shared by the cross-crate integration tests.

pub mod fixtures;
