//! Assistant adapters for the conversational channel.
//!
//! ```text
//! Session --mode--> Live:      BackendAssistant --POST /chat--> backend
//!              \--> Simulated: SimulatedAssistant (local, deterministic)
//!
//! backend /chat --> LlmAssistant --> provider::LlmClient
//! ```

pub mod backend;
pub mod llm;
pub mod simulated;
pub mod trait_def;
pub mod types;

pub use backend::{BackendAssistant, BackendClient, BackendError};
pub use llm::LlmAssistant;
pub use simulated::SimulatedAssistant;
pub use trait_def::{Assistant, AssistantError};
pub use types::{ChatReply, ChatRequest, Message, Role, UploadKind, UploadResponse};
