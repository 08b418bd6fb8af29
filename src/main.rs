//! `compliance-broker` binary.

// crates.io
use clap::Parser;
use color_eyre::Result;
// self
use compliance_broker::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	cli::init_tracing();
	cli::run(Cli::parse()).await
}
