pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::Cli;

pub use crate::adapters::memory_store::InMemoryCardStore;
pub use crate::app::generation::GenerationClient;
pub use crate::config::{AppConfig, GenerationConfig, WireFormat};
pub use crate::core::{
    orchestrator::{GenerationOrchestrator, RetryPolicy},
    review_service::ReviewService,
};
pub use crate::utils::error::{CardError, CommunicationFailure, Result};
