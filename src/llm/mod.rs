//! Classifier client abstraction layer
//!
//! The pipeline only sees the `LLMClient` trait, so the HTTP backends and
//! the queued mock used in tests are interchangeable.

mod client;
mod error;
mod genai;
mod mock;
pub mod openai_compatible;
mod selector;
mod transcript;
mod types;

pub use client::LLMClient;
pub use error::BackendError;
pub use genai::GenAIClient;
pub use mock::{MockLLMClient, MockResponse};
pub use openai_compatible::OpenAICompatibleClient;
pub use selector::{select_llm_client, SelectedClient};
pub use transcript::TranscriptLogger;
pub use types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
