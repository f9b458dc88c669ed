//! Quorum Coordinator: headless multisig wallet assembly
//!
//! Collects cosigner payloads from files or stdin, validates them against the
//! configured M-of-N script policy and writes the public coordination setup
//! once every cosigner is in.
//!
//! # Usage
//!
//! ```bash
//! quorum-coordinator --config quorum.toml --generate --cosigner coldcard.json --cosigner -
//! quorum-coordinator --config quorum.toml --validate
//! ```

mod config;
mod flow;

use anyhow::{Context, Result};
use std::path::PathBuf;

fn main() -> Result<()> {
    // Parse CLI args (minimal, no clap dependency needed)
    let args: Vec<String> = std::env::args().collect();

    let mut config_path = PathBuf::from("quorum.toml");
    let mut actions = flow::Actions::default();
    let mut validate_only = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = PathBuf::from(&args[i]);
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--cosigner" => {
                i += 1;
                if i < args.len() {
                    actions.cosigners.push(args[i].clone());
                } else {
                    anyhow::bail!("--cosigner requires a file argument (or - for stdin)");
                }
            }
            "--export" => {
                i += 1;
                let index = args
                    .get(i)
                    .and_then(|v| v.parse::<usize>().ok())
                    .filter(|&n| n >= 1)
                    .context("--export requires a cosigner number (1-based)")?;
                actions.export.push(index - 1);
            }
            "--generate" => {
                actions.generate = true;
            }
            "--validate" => {
                validate_only = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("quorum-coordinator {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other => {
                anyhow::bail!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    if actions.cosigners.iter().filter(|c| c.as_str() == "-").count() > 1 {
        anyhow::bail!("stdin (-) can only be given once");
    }

    // Load config
    let mut coordinator_config = config::CoordinatorConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Apply env overrides
    coordinator_config.apply_env_overrides();

    // Validate
    coordinator_config
        .validate()
        .context("Configuration validation failed")?;

    // Init logger
    std::env::set_var("RUST_LOG", &coordinator_config.coordinator.log_level);
    env_logger::init();

    if validate_only {
        println!("✅ Configuration is valid.");
        println!("  Wallet:        {}", coordinator_config.wallet.label);
        println!(
            "  Quorum:        {} of {}",
            coordinator_config.wallet.m, coordinator_config.wallet.n
        );
        println!("  Format:        {}", coordinator_config.policy()?);
        println!(
            "  Passphrases:   {}",
            coordinator_config.coordinator.ask_passphrase
        );
        println!(
            "  Setup file:    {}",
            coordinator_config.setup_file().display()
        );
        return Ok(());
    }

    // Build tokio runtime
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;

    let mut prompter = flow::StdinPrompter;
    if let Err(e) = rt.block_on(flow::run(&coordinator_config, &actions, &mut prompter)) {
        log::error!("Coordinator error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"Quorum Coordinator — multisig cosigner key exchange

USAGE:
    quorum-coordinator [OPTIONS]

OPTIONS:
    -c, --config <PATH>     Config file path [default: quorum.toml]
        --cosigner <FILE>   Add a cosigner payload; - reads stdin (repeatable)
        --generate          Create a new mnemonic cosigner and print its export
        --export <N>        Print the payload of cosigner N (1-based, repeatable)
        --validate          Validate config and exit
    -h, --help              Print help
    -V, --version           Print version

PAYLOADS:
    A payload is a BIP-39 mnemonic, an xpub, a key-origin string
    ([fingerprint/path]xpub), a JSON account {{xfp, xpub, path}}, a JSON
    array of accounts, a Coldcard multisig export, or a ur:bytes QR
    string wrapping any of these. Animated QR parts may be given one
    per line in a single file or spread over several --cosigner files.
    Missing fingerprints and paths are asked for on stdin, so pipe
    payloads through a file when prompting.

ENVIRONMENT:
    QUORUM_LABEL            Override wallet.label
    QUORUM_M                Override wallet.m
    QUORUM_N                Override wallet.n
    QUORUM_FORMAT           Override wallet.format (p2wsh, p2sh-p2wsh, p2sh)
    QUORUM_LOG_LEVEL        Override coordinator.log_level
    QUORUM_ASK_PASSPHRASE   Override coordinator.ask_passphrase
    QUORUM_OUTPUT_DIR       Override coordinator.output_dir

CONFIG FILE:
    See quorum.toml.example for all options.
"#
    );
}
