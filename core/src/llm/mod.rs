//! LLM providers: one interface over Groq, Gemini and Mistral backends
//!
//! This module provides:
//! - `LlmProvider`, the two-operation interface (`list_models`, `complete`)
//! - `OpenAiCompatProvider` for Groq and Mistral, `GeminiProvider` for Gemini
//! - `ProviderAdapter`, which owns a provider's model list and its explicit refresh
//! - `ProviderHub`, one adapter per `ProviderKind`

mod adapter;
mod error;
mod gemini;
mod openai_compat;
mod provider;

pub use adapter::{ProviderAdapter, ProviderHub};
pub use error::ProviderError;
pub use gemini::{parse_gemini_models, parse_gemini_text, GeminiProvider};
pub use openai_compat::{parse_chat_text, parse_model_ids, OpenAiCompatProvider};
pub use provider::{CompletionRequest, LlmProvider, ProviderKind};
