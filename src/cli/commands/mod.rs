//! CLI command implementations.

mod config;
mod doctor;
mod quiz;
mod serve;
mod transcript;

pub use config::run_config;
pub use doctor::run_doctor;
pub use quiz::run_quiz;
pub use serve::{router, run_serve, status_for, ApiError, AppState};
pub use transcript::run_transcript;
