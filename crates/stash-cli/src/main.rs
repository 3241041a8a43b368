// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stash CLI - versioned credential storage
//!
//! Works against a local encrypted vault by default. With `--server-url`
//! the credential commands are sent to a `stash-server` instead.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stash_common_secret::SecretString;
use stash_config::{load_config_with_cli, resolve_paths, write_example_config, CliOverrides};
use stash_core::{AddressingStyle, DbUrlOptions, SetupOutcome, Stash};
use stash_vault::FileVault;

mod backend;
mod client;
mod exit;
mod output;

use backend::{Backend, PutPayload};
use client::{PutRequest, ServerClient};
use exit::NotFound;

/// Stash - versioned credential storage
#[derive(Parser, Debug)]
#[command(name = "stash", version, about, long_about = None)]
struct Args {
	/// Path to the vault file
	#[arg(long, global = true)]
	db: Option<PathBuf>,

	/// Master password for the vault (overrides the sidecar file and environment)
	#[arg(long, global = true)]
	db_password: Option<String>,

	/// Path to a custom configuration file
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// Debug logging on stderr
	#[arg(short, long, global = true)]
	verbose: bool,

	/// Send credential commands to this stash-server instead of the local vault
	#[arg(long, global = true, env = "STASH_SERVER_URL")]
	server_url: Option<String>,

	/// API key for the server
	#[arg(long, global = true, env = "STASH_API_KEY", hide_env_values = true)]
	api_key: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Create the vault and its sidecar password file
	Setup {
		/// Destroy any existing vault and sidecar first
		#[arg(long)]
		force: bool,
	},
	/// List the latest version of every credential
	List {
		/// Only names starting with this prefix
		#[arg(long)]
		prefix: Option<String>,
		#[arg(long)]
		show_password: bool,
		/// Output JSON
		#[arg(long)]
		json: bool,
	},
	/// List credential names only
	Keys {
		#[arg(long)]
		prefix: Option<String>,
		#[arg(long)]
		json: bool,
	},
	/// Show one credential
	Get {
		name: String,
		/// Specific version (latest when omitted)
		#[arg(long)]
		version: Option<u64>,
		#[arg(long)]
		show_password: bool,
		#[arg(long)]
		json: bool,
	},
	/// Store a new version of a credential
	Put(PutArgs),
	/// Delete every version of a credential
	Delete { name: String },
	/// List the stored versions of a credential
	Versions {
		name: String,
		#[arg(long)]
		json: bool,
	},
	/// Print a PostgreSQL connection URL built from a credential
	#[command(name = "db-url")]
	DbUrl {
		name: String,
		/// Driver suffix, as in postgresql+DRIVER://
		#[arg(long)]
		driver: Option<String>,
		/// Database name (defaults to the 'database' or 'dbname' property)
		#[arg(long)]
		database: Option<String>,
		/// sslmode query parameter (defaults to the 'sslmode' property)
		#[arg(long)]
		sslmode: Option<String>,
		/// Leave the password out of the URL
		#[arg(
			long,
			action = ArgAction::Set,
			num_args = 0..=1,
			default_value_t = true,
			default_missing_value = "true"
		)]
		mask_password: bool,
	},
	/// Print S3 client settings built from a credential
	#[command(name = "s3-config")]
	S3Config {
		name: String,
		#[arg(long)]
		region: Option<String>,
		/// path or virtual
		#[arg(long)]
		addressing: Option<AddressingStyle>,
		#[arg(long)]
		signature_version: Option<String>,
		/// Maximum request attempts
		#[arg(long)]
		retries: Option<u32>,
		/// Print the secret access key instead of redacting it
		#[arg(long)]
		show_secret: bool,
		#[arg(long)]
		json: bool,
	},
	/// Replace the vault's master password with a newly generated one
	#[command(name = "rotate-password")]
	RotatePassword,
	/// Write an example configuration file
	Config {
		/// Destination (defaults to the user config file)
		#[arg(long, short)]
		output: Option<PathBuf>,
		/// Overwrite an existing file
		#[arg(long)]
		force: bool,
	},
}

#[derive(clap::Args, Debug)]
struct PutArgs {
	name: String,
	/// Simple secret value
	#[arg(long, conflicts_with_all = ["username", "password", "url"])]
	value: Option<String>,
	#[arg(long)]
	username: Option<String>,
	/// Password of the credential being stored
	#[arg(long)]
	password: Option<String>,
	#[arg(long)]
	url: Option<String>,
	#[arg(long, conflicts_with = "comment")]
	notes: Option<String>,
	/// Alias for --notes
	#[arg(long)]
	comment: Option<String>,
	/// Repeatable
	#[arg(long = "tag", value_name = "TAG")]
	tags: Vec<String>,
	/// Custom property, repeatable
	#[arg(long = "property", value_name = "KEY=VALUE", value_parser = parse_property)]
	properties: Vec<(String, String)>,
	/// Write this version instead of the next one
	#[arg(long)]
	version: Option<u64>,
	#[arg(long)]
	json: bool,
}

impl PutArgs {
	fn payload(&self) -> Result<PutPayload> {
		let fields_mode = self.username.is_some() || self.password.is_some() || self.url.is_some();
		if self.value.is_none() && !fields_mode {
			anyhow::bail!("one of --value or --username/--password/--url is required");
		}
		Ok(PutPayload {
			request: PutRequest {
				value: self.value.clone(),
				username: self.username.clone(),
				password: self.password.clone(),
				url: self.url.clone(),
				notes: self.comment.clone().or_else(|| self.notes.clone()),
				tags: self.tags.iter().cloned().collect(),
				custom_properties: self.properties.iter().cloned().collect(),
				version: self.version,
			},
		})
	}
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
	match raw.split_once('=') {
		Some((key, value)) if !key.trim().is_empty() => {
			Ok((key.trim().to_string(), value.to_string()))
		}
		_ => Err(format!("expected KEY=VALUE, got '{raw}'")),
	}
}

impl From<&Args> for CliOverrides {
	fn from(args: &Args) -> Self {
		Self {
			db_path: args.db.clone(),
			log_level: args.verbose.then(|| "debug".to_string()),
			config_file: args.config.clone(),
		}
	}
}

fn init_tracing(level: &str) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		EnvFilter::new(format!(
			"stash_cli={level},stash_core={level},stash_vault={level},stash_config={level}"
		))
	});

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr))
		.init();
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();
	match run(args).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("error: {err:#}");
			exit::exit_code(&err)
		}
	}
}

async fn run(args: Args) -> Result<()> {
	// Writing the example config must work even when the current config is broken
	if let Command::Config { output, force } = &args.command {
		let path = match output {
			Some(path) => path.clone(),
			None => resolve_paths()?.user_config_file,
		};
		write_example_config(&path, *force)?;
		println!("created example configuration at {}", path.display());
		return Ok(());
	}

	let config = load_config_with_cli(CliOverrides::from(&args))
		.context("failed to load configuration")?;
	init_tracing(&config.logging.level);

	let mut backend = match &args.server_url {
		Some(url) => {
			let mut client = ServerClient::new(url)?;
			if let Some(key) = args.api_key.clone() {
				client = client.with_api_key(SecretString::new(key));
			}
			debug!(server = %url, "using remote server");
			Backend::Remote(client)
		}
		None => {
			let mut options = config.stash_options();
			if let Some(password) = args.db_password.clone() {
				options.password = Some(SecretString::new(password));
			}
			debug!(path = %options.db_path.display(), "using local vault");
			Backend::Local(Box::new(Stash::new(Arc::new(FileVault::new()), options)))
		}
	};

	match args.command {
		Command::Setup { force } => {
			let stash = backend.local("setup")?;
			let db = stash.options().db_path.clone();
			match stash.setup(force)? {
				SetupOutcome::Created => {
					info!(path = %db.display(), "vault created");
					println!("created vault at {}", db.display());
					println!("master password stored in {}", stash.sidecar_path().display());
				}
				SetupOutcome::AlreadyReady => {
					println!("vault already initialized at {}", db.display());
				}
			}
		}
		Command::List {
			prefix,
			show_password,
			json,
		} => {
			let credentials = backend.list(prefix.as_deref(), show_password).await?;
			if json {
				println!("{}", output::to_json(&credentials)?);
			} else {
				for credential in &credentials {
					println!("{}", output::credential_line(credential));
				}
			}
		}
		Command::Keys { prefix, json } => {
			let names = backend.keys(prefix.as_deref()).await?;
			if json {
				println!("{}", output::to_json(&names)?);
			} else {
				for name in &names {
					println!("{name}");
				}
			}
		}
		Command::Get {
			name,
			version,
			show_password,
			json,
		} => {
			let Some(credential) = backend.get(&name, version, show_password).await? else {
				return Err(NotFound(name).into());
			};
			if json {
				println!("{}", output::to_json(&credential)?);
			} else {
				println!("{}", output::credential_detail(&credential));
			}
		}
		Command::Put(put) => {
			let payload = put.payload()?;
			let outcome = backend.put(&put.name, payload).await?;
			if put.json {
				println!(
					"{}",
					output::to_json(&serde_json::json!({
						"name": put.name,
						"version": outcome.version,
						"created": outcome.created,
					}))?
				);
			} else {
				println!("{}: OK (version {})", put.name, outcome.version);
			}
		}
		Command::Delete { name } => {
			if !backend.delete(&name).await? {
				return Err(NotFound(name).into());
			}
			println!("{name}: deleted");
		}
		Command::Versions { name, json } => {
			let versions = backend.versions(&name).await?;
			if versions.is_empty() {
				return Err(NotFound(name).into());
			}
			if json {
				println!("{}", output::to_json(&versions)?);
			} else {
				for line in output::padded_versions(&versions, config.versioning.pad_width) {
					println!("{line}");
				}
			}
		}
		Command::DbUrl {
			name,
			driver,
			database,
			sslmode,
			mask_password,
		} => {
			let mut options = DbUrlOptions {
				database,
				sslmode_override: sslmode,
				..Default::default()
			};
			if driver.is_some() {
				options.driver = driver;
			}
			let url = backend
				.db_url(&name, options, mask_password)
				.await
				.context("failed to build database URL")?;
			println!("{url}");
		}
		Command::S3Config {
			name,
			region,
			addressing,
			signature_version,
			retries,
			show_secret,
			json,
		} => {
			let mut options = config.s3_options();
			if let Some(region) = region {
				options.region = region;
			}
			if let Some(addressing) = addressing {
				options.addressing = addressing;
			}
			if let Some(version) = signature_version {
				options.signature_version = version;
			}
			if let Some(retries) = retries {
				options.max_attempts = retries;
			}
			let s3 = backend
				.local("s3-config")?
				.s3_config(&name, &options)
				.context("failed to build S3 client settings")?;
			if json {
				println!("{}", output::s3_config_json(&s3, show_secret)?);
			} else {
				println!("{}", output::s3_config_detail(&s3, show_secret));
			}
		}
		Command::RotatePassword => {
			let stash = backend.local("rotate-password")?;
			stash.rotate_password()?;
			println!(
				"master password rotated; new password stored in {}",
				stash.sidecar_path().display()
			);
		}
		Command::Config { .. } => {}
	}

	Ok(())
}
