mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use tenure_track::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
