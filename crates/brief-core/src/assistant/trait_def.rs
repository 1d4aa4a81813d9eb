//! The `Assistant` trait: the adapter interface for whatever answers chat
//! turns.
//!
//! The trait is object-safe so a session can hold `Box<dyn Assistant>` for
//! both its live and simulated modes.

use async_trait::async_trait;
use thiserror::Error;

use super::backend::BackendError;
use super::types::ChatRequest;
use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Produces one assistant reply for a conversation.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Human-readable name (e.g. "simulated").
    fn name(&self) -> &str;

    /// Answer the conversation in `request.history`, given the current plan.
    async fn reply(&self, request: &ChatRequest) -> Result<String, AssistantError>;
}

// Compile-time assertion: Assistant must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Assistant) {}
};
