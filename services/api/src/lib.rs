mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use fraud_recovery::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
