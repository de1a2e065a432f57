//! Infrastructure layer implementations.

pub mod http;
pub mod session_store;

pub use http::{DEFAULT_BACKEND_URL, DEFAULT_TIMEOUT_SECS, HttpBankingApi, HttpClientConfig};
pub use session_store::{DEFAULT_SESSION_FILE, FileSessionStore, MemorySessionStore};
