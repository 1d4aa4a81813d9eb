//! Core library for briefsmith: plan document, content matrix and concept
//! store, tabular ingestion, deterministic export, feed generation, and the
//! assistant adapters that drive the conversational channel.

pub mod assistant;
pub mod channel;
pub mod export;
pub mod feed;
pub mod plan;
pub mod provider;
pub mod store;
pub mod tabular;
