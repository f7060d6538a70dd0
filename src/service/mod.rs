//! Request orchestration shared by every transport.
//!
//! Transports deserialize into [`SearchParams`] / [`ChatParams`] and call a
//! shared [`GeminiService`].

pub mod config;
pub mod orchestrator;
pub mod output;
pub mod params;

pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use orchestrator::{GeminiService, RunOverrides};
pub use output::{extract_json, format_search_output};
pub use params::{ChatParams, SearchParams};
