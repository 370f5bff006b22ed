pub mod backend;
pub mod client;
pub mod error;
pub mod response;
pub mod retry;
pub mod secrets;

pub use backend::CompletionBackend;
pub use client::{OpenAiBackend, ensure_backend, test_configured_api_key};
pub use error::{CompletionError, FailureKind};
pub use retry::{CompletionOutcome, RetryPolicy, complete_with_retry};
pub use secrets::{KeySource, KeyStore, clear_api_key, store_api_key};
