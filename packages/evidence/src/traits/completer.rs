//! Text completion capability.

use async_trait::async_trait;

use crate::error::Result;

/// Turns a prompt into text.
///
/// Prompt construction and output parsing belong to the caller; a completer
/// only moves text to and from a model.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Provider name used in logs and errors.
    fn name(&self) -> &'static str {
        "completion"
    }
}
