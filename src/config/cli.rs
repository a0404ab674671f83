use crate::domain::model::{ScheduleState, DEFAULT_EASINESS_FACTOR, MIN_EASINESS_FACTOR};
use crate::utils::error::{CardError, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "cardwise")]
#[command(about = "Spaced-repetition scheduling and AI flashcard generation")]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "cardwise.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Generate candidate flashcards from a text file and print them as JSON
    Generate {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short = 'n', long, default_value = "10")]
        count: u32,

        /// API key to use instead of the configured one
        #[arg(long)]
        model_key: Option<String>,
    },
    /// Print the schedule that follows a review with the given grade
    Grade {
        #[command(flatten)]
        state: ScheduleArgs,

        #[arg(short, long)]
        grade: u8,
    },
    /// Print the interval each grade would give
    Preview {
        #[command(flatten)]
        state: ScheduleArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ScheduleArgs {
    #[arg(long, default_value_t = 0)]
    pub repetitions: u32,

    #[arg(long, default_value_t = 0)]
    pub interval: u32,

    #[arg(long, default_value_t = DEFAULT_EASINESS_FACTOR)]
    pub easiness: f64,
}

impl ScheduleArgs {
    pub fn to_state(&self) -> Result<ScheduleState> {
        if !self.easiness.is_finite() || self.easiness < MIN_EASINESS_FACTOR {
            return Err(CardError::validation(format!(
                "easiness must be a number of at least {}, got {}",
                MIN_EASINESS_FACTOR, self.easiness
            )));
        }
        Ok(ScheduleState {
            repetitions: self.repetitions,
            interval_days: self.interval,
            easiness_factor: self.easiness,
            due_at: None,
        })
    }
}
