use std::future::Future;

use super::error::CompletionError;

/// Something that turns a single text prompt into a text completion.
pub trait CompletionBackend: Send + Sync {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send;
}

impl<B: CompletionBackend + ?Sized> CompletionBackend for &B {
    fn complete(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, CompletionError>> + Send {
        (**self).complete(prompt)
    }
}
