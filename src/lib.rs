//! Client-side transfer, contact directory and transaction history components
//! for a peer-to-peer banking backend.
//!
//! Layout:
//! - [`domain`]: types, error taxonomy and the traits for external collaborators
//! - [`app`]: the session, directory, transfer form and history components
//! - [`infra`]: the HTTP backend adapter and session-anchor stores

pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
