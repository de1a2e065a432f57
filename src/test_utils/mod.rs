//! Test doubles and fixtures, compiled for unit tests and the `test-utils` feature.

pub mod fixtures;
pub mod mocks;

pub use mocks::{MockBankingApi, MockConfig, MockOperation};
