//! Payment-fraud decisioning service: walks a charge's configured console
//! of list checks and rule sets to an accept/decline/undecided verdict,
//! tracks a parallel shadow decision, and records outcomes off the request
//! path.

mod cli;
mod infra;
mod routes;
mod server;

pub mod config;
pub mod decisioning;
pub mod error;
pub mod telemetry;

use error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
