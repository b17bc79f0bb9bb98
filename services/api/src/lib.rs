mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use subsidy_navigator::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
