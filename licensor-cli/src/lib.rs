//! Command handlers for the `licensor` binary.
//!
//! Kept in a library so the handlers can be driven from tests without
//! spawning the binary.

use std::{fs, path::{Path, PathBuf}};

use anyhow::{Context, Result, anyhow, bail};
use chrono::Duration;
use clap::{Args as ClapArgs, Parser, Subcommand};
use licensor_core::{
    AuthorityGenerator, AuthorityKeyPair, AuthorityPaths, License, LicenseParser, LicenseRequest,
    LicenseStatus, LicensorConfig, SelfSignedAuthority, X509Parser, generate_license,
};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "licensor")]
#[command(about = "Issue and inspect licenses encoded as signed certificates")]
pub struct Args {
    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a self-signed license authority
    Authority(AuthorityArgs),
    /// Issue a license signed by an authority
    Generate(GenerateArgs),
    /// Decode a license and print its claims as JSON
    Inspect(InspectArgs),
}

#[derive(ClapArgs, Debug)]
pub struct AuthorityArgs {
    /// Common name of the authority certificate
    #[arg(long, default_value = licensor_core::DEFAULT_TEST_AUTHORITY_NAME)]
    pub common_name: String,

    /// Where to write the authority certificate
    #[arg(long, default_value = "ca.pem")]
    pub cert: PathBuf,

    /// Where to write the authority private key
    #[arg(long, default_value = "ca-key.pem")]
    pub key: PathBuf,
}

#[derive(ClapArgs, Debug, Default)]
pub struct GenerateArgs {
    /// Configuration file with authority paths and defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Authority certificate (overrides the config file)
    #[arg(long)]
    pub ca_cert: Option<PathBuf>,

    /// Authority private key (overrides the config file)
    #[arg(long)]
    pub ca_key: Option<PathBuf>,

    /// Maximum number of nodes
    #[arg(long)]
    pub max_nodes: Option<u32>,

    /// Validity in days
    #[arg(long, conflicts_with = "valid_for_hours", allow_negative_numbers = true)]
    pub valid_for_days: Option<i64>,

    /// Validity in hours
    #[arg(long, allow_negative_numbers = true)]
    pub valid_for_hours: Option<i64>,

    /// Stop the application once the license expires
    #[arg(long, conflicts_with = "no_stop_app")]
    pub stop_app: bool,

    /// Keep the application running after expiry, even if the config says otherwise
    #[arg(long)]
    pub no_stop_app: bool,

    #[arg(long, default_value = "")]
    pub customer_name: String,

    #[arg(long, default_value = "")]
    pub customer_email: String,

    #[arg(long, default_value = "")]
    pub customer_metadata: String,

    #[arg(long)]
    pub product_name: Option<String>,

    #[arg(long)]
    pub product_version: Option<String>,

    #[arg(long, default_value = "")]
    pub account_id: String,

    /// Passphrase for encrypted packages
    #[arg(long)]
    pub encryption_key: Option<String>,

    /// Write the license here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct InspectArgs {
    /// License file
    #[arg(short, long)]
    pub license: PathBuf,

    /// Authority certificate to verify against
    #[arg(long)]
    pub ca_cert: Option<PathBuf>,
}

/// JSON report printed by `inspect`.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub verified: bool,
    pub status: LicenseStatus,
    pub license: License,
}

/// Runs a parsed command line.
pub fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Authority(authority) => {
            write_authority(&authority)?;
            println!(
                "authority written to {} and {}",
                authority.cert.display(),
                authority.key.display()
            );
        }
        Command::Generate(generate) => {
            let artifact = generate_artifact(&generate)?;
            match &generate.out {
                Some(path) => {
                    fs::write(path, &artifact)
                        .with_context(|| format!("failed to write license to {}", path.display()))?;
                    info!("license written to {}", path.display());
                }
                None => print!("{artifact}"),
            }
        }
        Command::Inspect(inspect) => {
            let report = inspect_license(&inspect)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

/// Creates a self-signed authority and writes it to disk.
pub fn write_authority(args: &AuthorityArgs) -> Result<AuthorityKeyPair> {
    let authority = SelfSignedAuthority
        .generate(&args.common_name)
        .context("failed to generate authority")?;
    fs::write(&args.cert, &authority.cert_pem)
        .with_context(|| format!("failed to write {}", args.cert.display()))?;
    fs::write(&args.key, &authority.key_pem)
        .with_context(|| format!("failed to write {}", args.key.display()))?;
    info!(common_name = %args.common_name, "created license authority");
    Ok(authority)
}

/// Builds the license request from flags, falling back to the config file.
pub fn build_request(args: &GenerateArgs) -> Result<LicenseRequest> {
    let config = match &args.config {
        Some(path) => LicensorConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => LicensorConfig::default(),
    };
    let defaults = &config.defaults;

    let authority = load_authority(args, &config)?;

    let max_nodes = args
        .max_nodes
        .or(defaults.max_nodes)
        .ok_or_else(|| anyhow!("--max-nodes is required (or defaults.max_nodes in the config)"))?;

    let valid_for = match (args.valid_for_days, args.valid_for_hours) {
        (Some(days), _) => Duration::try_days(days)
            .ok_or_else(|| anyhow!("--valid-for-days {days} is out of range"))?,
        (None, Some(hours)) => Duration::try_hours(hours)
            .ok_or_else(|| anyhow!("--valid-for-hours {hours} is out of range"))?,
        (None, None) => defaults.valid_for().ok_or_else(|| {
            anyhow!("--valid-for-days is required (or defaults.valid_for_days in the config)")
        })?,
    };

    let stop_app_on_expiry = if args.stop_app {
        true
    } else if args.no_stop_app {
        false
    } else {
        defaults.stop_app_on_expiry
    };

    debug!(max_nodes, valid_for_secs = valid_for.num_seconds(), "building license request");

    Ok(LicenseRequest {
        max_nodes,
        valid_for,
        stop_app_on_expiry,
        customer_name: args.customer_name.clone(),
        customer_email: args.customer_email.clone(),
        customer_metadata: args.customer_metadata.clone(),
        product_name: args
            .product_name
            .clone()
            .or_else(|| defaults.product_name.clone())
            .unwrap_or_default(),
        product_version: args
            .product_version
            .clone()
            .or_else(|| defaults.product_version.clone())
            .unwrap_or_default(),
        account_id: args.account_id.clone(),
        encryption_key: args.encryption_key.as_ref().map(|k| k.as_bytes().to_vec()),
        authority,
    })
}

/// Builds, checks and signs a license.
pub fn generate_artifact(args: &GenerateArgs) -> Result<String> {
    let request = build_request(args)?;
    generate_license(&request).context("failed to generate license")
}

/// Decodes a license file, verifying it when an authority is given.
pub fn inspect_license(args: &InspectArgs) -> Result<InspectReport> {
    let artifact = fs::read_to_string(&args.license)
        .with_context(|| format!("failed to read {}", args.license.display()))?;

    let (license, verified) = match &args.ca_cert {
        Some(path) => {
            let ca = read(path)?;
            (X509Parser::trusting(ca).parse(&artifact), true)
        }
        None => {
            warn!("no authority given, license signature is not verified");
            (X509Parser::unverified().parse(&artifact), false)
        }
    };
    let license = license.context("failed to parse license")?;

    Ok(InspectReport {
        verified,
        status: license.status(),
        license,
    })
}

fn load_authority(args: &GenerateArgs, config: &LicensorConfig) -> Result<AuthorityKeyPair> {
    let from_config = config.authority.as_ref();
    let cert = args
        .ca_cert
        .clone()
        .or_else(|| from_config.map(|a| a.cert.clone()));
    let key = args
        .ca_key
        .clone()
        .or_else(|| from_config.map(|a| a.key.clone()));

    let (Some(cert), Some(key)) = (cert, key) else {
        bail!(
            "authority certificate and key are required \
             (--ca-cert/--ca-key or [authority] in the config)"
        );
    };
    let paths = AuthorityPaths { cert, key };
    paths.load().with_context(|| {
        format!(
            "failed to read authority from {} and {}",
            paths.cert.display(),
            paths.key.display()
        )
    })
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
