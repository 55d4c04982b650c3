//! `licensor`: issue and inspect licenses encoded as signed certificates.
//!
//! Usage:
//!   licensor authority --common-name "license-signing-key"
//!   licensor generate --ca-cert ca.pem --ca-key ca-key.pem --max-nodes 3 --valid-for-days 365
//!   licensor inspect --license license.pem --ca-cert ca.pem
//!
//! Licenses are printed to stdout; logs go to stderr.

use anyhow::Result;
use clap::Parser;
use licensor_cli::{Args, run};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    run(args)
}
