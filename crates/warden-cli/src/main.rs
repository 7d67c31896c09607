// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Warden policy administration binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_server_auth::{PolicyId, Status};

mod check;
mod commands;
mod version;

/// Warden - attribute-based access control for the user directory.
#[derive(Parser, Debug)]
#[command(name = "warden", about = "Warden policy administration", version)]
struct Args {
	/// Config file to layer under environment variables
	#[arg(long, env = "WARDEN_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Apply database migrations
	Migrate,
	/// Install the built-in policies that are not already present
	Seed,
	/// Inspect and administer stored policies
	Policies {
		#[command(subcommand)]
		command: PolicyCommand,
	},
	/// Evaluate a JSON access request and print the decision
	Check {
		/// Path to the request, or `-` for stdin
		#[arg(default_value = "-")]
		request: PathBuf,
	},
	/// Show version and build information
	Version,
}

#[derive(Subcommand, Debug)]
enum PolicyCommand {
	/// List policies, highest priority first
	List {
		#[arg(long)]
		resource_type: Option<String>,
	},
	/// Print one policy with all of its rules
	Show { id: i64 },
	/// Create a policy from a JSON document
	Create {
		/// Path to the policy, or `-` for stdin
		#[arg(default_value = "-")]
		file: PathBuf,
	},
	/// Mark a policy active
	Activate { id: i64 },
	/// Mark a policy inactive
	Deactivate { id: i64 },
	/// Delete a policy and its rules
	Delete { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Command::Version = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => warden_server_config::load_config_with_file(path)?,
		None => warden_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	tracing::debug!(database = %config.database.url, "starting warden");

	let pool = warden_server_db::create_pool(
		&config.database.url,
		warden_server_db::PoolSettings {
			max_connections: config.database.max_connections,
			busy_timeout: Duration::from_millis(config.database.busy_timeout_ms),
		},
	)
	.await?;
	warden_server_db::run_migrations(&pool).await?;

	let output = match args.command {
		Command::Migrate => "migrations applied".to_string(),
		Command::Seed => commands::seed(&pool).await?,
		Command::Policies { command } => match command {
			PolicyCommand::List { resource_type } => {
				commands::list(&pool, resource_type.as_deref()).await?
			}
			PolicyCommand::Show { id } => commands::show(&pool, PolicyId::new(id)).await?,
			PolicyCommand::Create { file } => {
				commands::create(&pool, &commands::read_input(&file)?).await?
			}
			PolicyCommand::Activate { id } => {
				commands::set_status(&pool, PolicyId::new(id), Status::Active).await?
			}
			PolicyCommand::Deactivate { id } => {
				commands::set_status(&pool, PolicyId::new(id), Status::Inactive).await?
			}
			PolicyCommand::Delete { id } => commands::delete(&pool, PolicyId::new(id)).await?,
		},
		Command::Check { request } => {
			let request = check::CheckRequest::from_json(&commands::read_input(&request)?)?;
			let decision = check::run(&pool, &config.authz, &request).await?;
			serde_json::to_string_pretty(&decision)?
		}
		Command::Version => version::format_version_info(),
	};

	println!("{output}");
	Ok(())
}
