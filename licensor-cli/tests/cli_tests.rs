use std::fs;
use std::path::Path;

use clap::Parser;
use licensor_cli::{
    Args, AuthorityArgs, Command, GenerateArgs, InspectArgs, build_request, generate_artifact,
    inspect_license, write_authority,
};
use licensor_core::{LicenseStatus, parse_license};
use pretty_assertions::assert_eq;

fn authority_in(dir: &Path) -> AuthorityArgs {
    let args = AuthorityArgs {
        common_name: "cli test authority".into(),
        cert: dir.join("ca.pem"),
        key: dir.join("ca-key.pem"),
    };
    write_authority(&args).unwrap();
    args
}

fn generate_args(authority: &AuthorityArgs) -> GenerateArgs {
    GenerateArgs {
        ca_cert: Some(authority.cert.clone()),
        ca_key: Some(authority.key.clone()),
        max_nodes: Some(3),
        valid_for_days: Some(30),
        customer_name: "Acme Corp".into(),
        account_id: "acct-1".into(),
        ..GenerateArgs::default()
    }
}

// ── Argument parsing ─────────────────────────────────────────────

#[test]
fn parses_generate_flags() {
    let args = Args::try_parse_from([
        "licensor",
        "-v",
        "generate",
        "--ca-cert",
        "ca.pem",
        "--ca-key",
        "ca-key.pem",
        "--max-nodes",
        "5",
        "--valid-for-days",
        "365",
        "--stop-app",
        "--product-name",
        "gravity",
    ])
    .unwrap();

    assert!(args.verbose);
    let Command::Generate(generate) = args.command else {
        panic!("expected generate command");
    };
    assert_eq!(generate.max_nodes, Some(5));
    assert_eq!(generate.valid_for_days, Some(365));
    assert!(generate.stop_app);
    assert_eq!(generate.product_name.as_deref(), Some("gravity"));
}

#[test]
fn negative_validity_parses_as_number() {
    let args = Args::try_parse_from(["licensor", "generate", "--valid-for-hours", "-1"]).unwrap();
    let Command::Generate(generate) = args.command else {
        panic!("expected generate command");
    };
    assert_eq!(generate.valid_for_hours, Some(-1));
}

#[test]
fn days_and_hours_conflict() {
    let result = Args::try_parse_from([
        "licensor",
        "generate",
        "--valid-for-days",
        "1",
        "--valid-for-hours",
        "1",
    ]);
    assert!(result.is_err());
}

#[test]
fn stop_app_flags_conflict() {
    let result = Args::try_parse_from(["licensor", "generate", "--stop-app", "--no-stop-app"]);
    assert!(result.is_err());
}

#[test]
fn authority_defaults() {
    let args = Args::try_parse_from(["licensor", "authority"]).unwrap();
    let Command::Authority(authority) = args.command else {
        panic!("expected authority command");
    };
    assert_eq!(authority.common_name, "license-signing-key");
    assert_eq!(authority.cert.to_str(), Some("ca.pem"));
}

// ── Handlers ─────────────────────────────────────────────────────

#[test]
fn generate_then_inspect() {
    let dir = tempfile::tempdir().unwrap();
    let authority = authority_in(dir.path());

    let artifact = generate_artifact(&generate_args(&authority)).unwrap();
    let license_path = dir.path().join("license.pem");
    fs::write(&license_path, &artifact).unwrap();

    let report = inspect_license(&InspectArgs {
        license: license_path,
        ca_cert: Some(authority.cert.clone()),
    })
    .unwrap();

    assert!(report.verified);
    assert_eq!(report.status, LicenseStatus::Active);
    assert_eq!(report.license.max_nodes(), 3);
    assert_eq!(report.license.payload().customer_name, "Acme Corp");

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["license"]["payload"]["account_id"], "acct-1");
}

#[test]
fn inspect_without_authority_is_unverified() {
    let dir = tempfile::tempdir().unwrap();
    let authority = authority_in(dir.path());
    let license_path = dir.path().join("license.pem");
    fs::write(&license_path, generate_artifact(&generate_args(&authority)).unwrap()).unwrap();

    let report = inspect_license(&InspectArgs {
        license: license_path,
        ca_cert: None,
    })
    .unwrap();
    assert!(!report.verified);
}

#[test]
fn config_supplies_authority_and_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let authority = authority_in(dir.path());
    let config_path = dir.path().join("licensor.toml");
    fs::write(
        &config_path,
        r#"
[authority]
cert = "ca.pem"
key = "ca-key.pem"

[defaults]
max_nodes = 9
valid_for_days = 10
product_name = "gravity"
stop_app_on_expiry = true
"#,
    )
    .unwrap();

    let request = build_request(&GenerateArgs {
        config: Some(config_path),
        ..GenerateArgs::default()
    })
    .unwrap();

    assert_eq!(request.max_nodes, 9);
    assert_eq!(request.valid_for, chrono::Duration::days(10));
    assert_eq!(request.product_name, "gravity");
    assert!(request.stop_app_on_expiry);
    assert_eq!(request.authority.cert_pem, fs::read_to_string(&authority.cert).unwrap());
}

#[test]
fn flags_override_config() {
    let dir = tempfile::tempdir().unwrap();
    let authority = authority_in(dir.path());
    let config_path = dir.path().join("licensor.toml");
    fs::write(&config_path, "[defaults]\nmax_nodes = 9\nproduct_name = \"gravity\"\n").unwrap();

    let request = build_request(&GenerateArgs {
        config: Some(config_path),
        product_name: Some("teleport".into()),
        ..generate_args(&authority)
    })
    .unwrap();

    assert_eq!(request.max_nodes, 3);
    assert_eq!(request.product_name, "teleport");
}

#[test]
fn no_stop_app_overrides_config() {
    let dir = tempfile::tempdir().unwrap();
    let authority = authority_in(dir.path());
    let config_path = dir.path().join("licensor.toml");
    fs::write(&config_path, "[defaults]\nstop_app_on_expiry = true\n").unwrap();

    let from_config = build_request(&GenerateArgs {
        config: Some(config_path.clone()),
        ..generate_args(&authority)
    })
    .unwrap();
    assert!(from_config.stop_app_on_expiry);

    let overridden = build_request(&GenerateArgs {
        config: Some(config_path),
        no_stop_app: true,
        ..generate_args(&authority)
    })
    .unwrap();
    assert!(!overridden.stop_app_on_expiry);
}

#[test]
fn unreadable_authority_files_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("licensor.toml");
    fs::write(&config_path, "[authority]\ncert = \"ca.pem\"\nkey = \"ca-key.pem\"\n").unwrap();

    let err = build_request(&GenerateArgs {
        config: Some(config_path),
        max_nodes: Some(3),
        valid_for_days: Some(1),
        ..GenerateArgs::default()
    })
    .unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("failed to read authority from"), "{message}");
    assert!(message.contains("ca.pem"), "{message}");
}

#[test]
fn missing_authority_is_reported() {
    let err = build_request(&GenerateArgs {
        max_nodes: Some(3),
        valid_for_days: Some(1),
        ..GenerateArgs::default()
    })
    .unwrap_err();
    assert!(err.to_string().contains("authority certificate and key are required"));
}

#[test]
fn missing_max_nodes_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let authority = authority_in(dir.path());
    let err = build_request(&GenerateArgs {
        max_nodes: None,
        ..generate_args(&authority)
    })
    .unwrap_err();
    assert!(err.to_string().contains("--max-nodes"));
}

#[test]
fn zero_nodes_rejected_by_library() {
    let dir = tempfile::tempdir().unwrap();
    let authority = authority_in(dir.path());
    let err = generate_artifact(&GenerateArgs {
        max_nodes: Some(0),
        ..generate_args(&authority)
    })
    .unwrap_err();
    assert!(format!("{err:#}").contains("1 or more"));
}

#[test]
fn encryption_key_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let authority = authority_in(dir.path());
    let artifact = generate_artifact(&GenerateArgs {
        encryption_key: Some("s3cret".into()),
        ..generate_args(&authority)
    })
    .unwrap();

    let ca = fs::read_to_string(&authority.cert).unwrap();
    let license = parse_license(&artifact, &ca).unwrap();
    assert_eq!(license.payload().encryption_key.as_deref(), Some(b"s3cret".as_slice()));
}
