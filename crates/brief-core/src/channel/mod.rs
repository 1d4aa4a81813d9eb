//! Conversational update channel.

pub mod session;

pub use session::{
    LIVE_GREETING, Mode, ModeParseError, SIMULATED_GREETING, Session, document_message,
};
