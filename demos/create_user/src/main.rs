//! Create User Example
//!
//! Sends a single `CreateUserRequest` through the mediator. The handler is
//! found by scanning this crate and gets its `UserRepository` through
//! constructor injection.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package create-user -- --name Venus
//! ```
//!
//! Logging and registry settings can be changed with a `mediator.toml` in the
//! working directory or `MEDIATOR_*` environment variables, e.g.
//! `MEDIATOR_LOGGING__LEVEL=debug`.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use mediator::prelude::*;
use tracing::info;

// ============================================================================
// Domain
// ============================================================================

/// Simulated user storage.
#[derive(FromServices)]
pub struct UserRepository;

impl UserRepository {
    /// Pretends to write the user to a database.
    pub fn save(&self) {
        info!("Saving...");
    }
}

/// Request to create a user, answered with a confirmation message.
#[derive(Request)]
#[request(response = String)]
pub struct CreateUserRequest {
    pub name: String,
}

#[derive(FromServices)]
pub struct CreateUserHandler {
    users: Arc<UserRepository>,
}

#[handler]
#[async_trait]
impl Handler<CreateUserRequest> for CreateUserHandler {
    async fn handle(&self, request: CreateUserRequest, _cancel: CancellationToken) -> String {
        info!("Creating {} user...", request.name);
        self.users.save();
        format!("{} user created.", request.name)
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[derive(Parser)]
#[command(about = "Creates a user through the mediator")]
struct Cli {
    /// Name of the user to create.
    #[arg(long, default_value = "Mars")]
    name: String,

    /// Configuration file (defaults to mediator.toml in the working directory).
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = MediatorHost::builder()
        .configure_services(|services| {
            services.add_transient::<UserRepository>();
        })
        .scan(module_path!());
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    let host = builder.build()?;

    let result = host
        .mediator()
        .send(CreateUserRequest { name: cli.name })
        .await?;

    println!("{result}");
    Ok(())
}
