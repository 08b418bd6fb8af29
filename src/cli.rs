//! Command-line front end that plays the browser's role: start the authorize redirect, finish
//! the code exchange against a running server, and run compliance checks in the terminal.

// std
use std::{
	net::SocketAddr,
	path::{Path, PathBuf},
};
// crates.io
use clap::{Args, Parser, Subcommand};
use color_eyre::{Result, eyre::eyre};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
// self
use crate::{
	_prelude::{Arc, OffsetDateTime, Url},
	compliance::{CheckKind, CompliancePoller, render},
	config::{self, AppConfig, Environment},
	flows::{
		self, AuthBootstrap, AuthCallback, BootstrapOutcome, RemoteTokenExchanger, SessionSource,
	},
	server,
	session::{ACCESS_TOKEN_COOKIE, CookieJar, FileStorage, SessionContext},
};

const DEFAULT_LOG_FILTER: &str = "compliance_broker=info,tower_http=info";

/// Compliance broker command line.
#[derive(Debug, Parser)]
#[command(name = "compliance-broker", author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
	/// Shared settings.
	#[command(flatten)]
	pub settings: Settings,
	/// Command to run.
	#[command(subcommand)]
	pub command: Command,
}

/// Settings shared by every command.
#[derive(Debug, Args)]
pub struct Settings {
	/// OAuth client secret used by the token exchange.
	#[arg(long, env = "SUPABASE_CLIENT_SECRET", hide_env_values = true, global = true)]
	pub client_secret: Option<String>,
	/// Deployment environment (`development` or `production`).
	#[arg(
		long = "env",
		env = "COMPLIANCE_BROKER_ENV",
		default_value = "development",
		global = true
	)]
	pub environment: Environment,
	/// Address the token exchange server binds to.
	#[arg(long, env = "COMPLIANCE_BROKER_BIND", default_value = "127.0.0.1:3000", global = true)]
	pub bind: SocketAddr,
	/// Compliance API base URL.
	#[arg(
		long,
		env = "COMPLIANCE_API_URL",
		default_value = config::DEFAULT_COMPLIANCE_API_URL,
		global = true
	)]
	pub api_url: Url,
	/// Per-request timeout in seconds; `0` disables it.
	#[arg(
		long,
		env = "COMPLIANCE_BROKER_TIMEOUT_SECS",
		default_value_t = config::DEFAULT_TIMEOUT_SECS,
		global = true
	)]
	pub timeout_secs: u64,
	/// File holding the stashed client id and the access-token cookie.
	#[arg(
		long,
		env = "COMPLIANCE_BROKER_STATE",
		default_value = ".compliance-broker/state.json",
		global = true
	)]
	pub state_file: PathBuf,
}
impl Settings {
	/// Folds the settings into an [`AppConfig`].
	pub fn to_config(&self) -> Result<AppConfig> {
		let mut config = AppConfig::new()?.with_client_secret(self.client_secret.clone());

		config.environment = self.environment;
		config.bind_addr = self.bind;
		config.compliance_api_base = self.api_url.clone();
		config.request_timeout = config::timeout_from_secs(self.timeout_secs);

		Ok(config)
	}
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
	/// Serve `POST /api/auth/token` and `GET /health`.
	Serve,
	/// Stash the client id and print the provider authorize URL.
	Login {
		/// OAuth client identifier.
		#[arg(long)]
		client_id: String,
	},
	/// Exchange the code from the redirect through a running server.
	Complete {
		/// Authorization code, or the full redirect URL carrying it.
		#[arg(long)]
		code: String,
		/// Broker server base URL.
		#[arg(long, default_value = "http://localhost:3000")]
		server: Url,
	},
	/// Run compliance checks.
	Check {
		/// Run a single check (`mfa`, `rls`, `pitr`).
		#[arg(long)]
		only: Option<CheckKind>,
		/// Print the check list as JSON.
		#[arg(long)]
		json: bool,
	},
	/// Enable RLS on every table, then re-run the RLS check.
	FixRls,
}

/// Installs the global `tracing` subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

	tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();
}

/// Runs the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
	let config = cli.settings.to_config()?;

	match cli.command {
		Command::Serve => {
			server::serve(&config).await?;
		},
		Command::Login { client_id } => {
			let storage = FileStorage::open(&cli.settings.state_file)?;
			let url = flows::begin_authorization(&config.descriptor, &storage, &client_id)?;

			println!("Open this URL, then run `compliance-broker complete --code <code>`:");
			println!("{url}");
		},
		Command::Complete { code, server } => {
			let storage = Arc::new(FileStorage::open(&cli.settings.state_file)?);
			let exchanger = Arc::new(RemoteTokenExchanger::new(&server, config.request_timeout)?);
			let bootstrap =
				AuthBootstrap::new(config.descriptor.clone(), exchanger, storage.clone());
			let callback = parse_callback(&code)?;
			let mut jar = CookieJar::default();

			if let Some(session) = SessionContext::restore(&*storage)? {
				jar.insert(ACCESS_TOKEN_COOKIE, session.access_token().expose());
			}

			match bootstrap.resume(&jar, Some(callback)).await {
				BootstrapOutcome::Authenticated { session, source: SessionSource::Exchange } => {
					session.persist(&*storage)?;

					println!("Authenticated; session stored in {}.", storage.path().display());
				},
				BootstrapOutcome::Authenticated { source: SessionSource::Cookie, .. } => {
					println!("Exchange skipped or failed; keeping the existing session.");
				},
				BootstrapOutcome::PromptClientId =>
					return Err(eyre!("No stashed client id; run `compliance-broker login` first.")),
				BootstrapOutcome::ExchangeFailed { error } =>
					return Err(eyre!(error).wrap_err("Token exchange failed")),
			}
		},
		Command::Check { only, json } => {
			let session = restore_session(&cli.settings.state_file)?;
			let poller = CompliancePoller::new(Arc::new(config.build_compliance_api()?));
			let checks = match only {
				Some(kind) => {
					poller.run_check(&session, kind).await;

					poller.check(kind).into_iter().collect()
				},
				None => poller.run_all(&session).await,
			};

			if json {
				println!("{}", serde_json::to_string_pretty(&checks)?);
			} else {
				print!("{}", render::render_checks(&checks));
			}
		},
		Command::FixRls => {
			let session = restore_session(&cli.settings.state_file)?;
			let poller = CompliancePoller::new(Arc::new(config.build_compliance_api()?));

			poller
				.fix_rls(&session)
				.await
				.map_err(|e| eyre!(e).wrap_err("Failed to apply the RLS fix"))?;

			if let Some(check) = poller.check(CheckKind::Rls) {
				print!("{}", render::render_check(&check));
			}
		},
	}

	Ok(())
}

fn parse_callback(input: &str) -> Result<AuthCallback> {
	match Url::parse(input) {
		Ok(url) => AuthCallback::from_redirect_url(&url)
			.ok_or_else(|| eyre!("Redirect URL does not carry a `code` parameter.")),
		Err(_) if !input.trim().is_empty() => Ok(AuthCallback::new(input.trim())),
		Err(_) => Err(eyre!("Authorization code is required")),
	}
}

fn restore_session(state_file: &Path) -> Result<SessionContext> {
	let storage = FileStorage::open(state_file)?;
	let session = SessionContext::restore(&storage)?
		.ok_or_else(|| eyre!("Not authenticated; run `compliance-broker login` first."))?;

	session.ensure_active(OffsetDateTime::now_utc())?;

	Ok(session)
}

#[cfg(test)]
mod tests {
	// crates.io
	use clap::CommandFactory;
	// self
	use super::*;

	#[test]
	fn command_line_definition_is_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn callback_accepts_bare_codes_and_redirect_urls() {
		assert_eq!(
			parse_callback("abc").expect("Bare code should parse."),
			AuthCallback::new("abc")
		);
		assert_eq!(
			parse_callback("http://localhost:3000/?code=xyz&state=s")
				.expect("Redirect URL should parse."),
			AuthCallback::new("xyz").with_state("s")
		);
		assert!(parse_callback("http://localhost:3000/").is_err());
		assert!(parse_callback("  ").is_err());
	}

	#[test]
	fn settings_fold_into_config() {
		let cli = Cli::try_parse_from([
			"compliance-broker",
			"--env",
			"production",
			"--timeout-secs",
			"0",
			"check",
			"--only",
			"rls",
		])
		.expect("Arguments should parse.");
		let config = cli.settings.to_config().expect("Config should build.");

		assert!(config.secure_cookies());
		assert_eq!(config.request_timeout, None);
		assert!(matches!(cli.command, Command::Check { only: Some(CheckKind::Rls), json: false }));
	}
}
