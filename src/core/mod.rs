pub mod orchestrator;
pub mod review_service;
pub mod review_state;
pub mod sanitizer;
pub mod scheduler;

pub use crate::domain::model::{Card, GeneratedCandidate, GenerationOutcome, ScheduleState};
pub use crate::domain::ports::{CardGenerator, CardRepository};
pub use crate::utils::error::Result;
