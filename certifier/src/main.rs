//! `certifier` command line.
//!
//! - `generate`: render one PDF per distinct participant name.
//! - `send`: email every participant the certificate generated for them.
//! - `run`: both, in that order.
//! - `init`: write a configuration file with every default filled in.

use anyhow::{bail, Context, Result};
use certifier::config::{Settings, DEFAULT_CONFIG_FILE};
use certifier::services::mail::{send_certificates, SmtpRelay};
use certifier::services::merge::generate_certificates;
use certifier::BatchError;
use clap::{Parser, Subcommand};
use common::jobs::{GenerationReport, MailReport};
use env_logger::Env;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "certifier", version, about = "Participation certificates, generated and emailed")]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "CERTIFIER_CONFIG", default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Print the batch report as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the certificates into the output directory
    Generate,
    /// Email the certificates already in the output directory
    Send,
    /// Generate, then send
    Run,
    /// Write a configuration file with the default settings
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => init(&cli.config, force),
        Commands::Generate => {
            let settings = load(&cli.config)?;
            let report = generate_certificates(&settings)?;
            print_generation(&report, cli.json)
        }
        Commands::Send => {
            let settings = load(&cli.config)?;
            match send(&settings) {
                Ok(report) => print_mail(&report, cli.json),
                Err(e) => {
                    if let Some(partial) = partial_report(&e) {
                        print_mail(partial, cli.json)?;
                    }
                    Err(e)
                }
            }
        }
        Commands::Run => {
            let settings = load(&cli.config)?;
            let generated = generate_certificates(&settings)?;
            // The generation outcome is shown even when sending fails.
            if !cli.json {
                print_generation(&generated, false)?;
            }
            let sent = send(&settings);
            let mail = match &sent {
                Ok(report) => Some(report),
                Err(e) => partial_report(e),
            };
            if cli.json {
                print_json(&serde_json::json!({ "generate": generated, "send": mail }))?;
            } else if let Some(report) = mail {
                print_mail(report, false)?;
            }
            sent.map(|_| ())
        }
    }
}

fn load(path: &Path) -> Result<Settings> {
    let settings = Settings::load(path)?;
    info!("Loaded configuration from '{}'", path.display());
    Ok(settings)
}

fn send(settings: &Settings) -> Result<MailReport> {
    let relay = SmtpRelay::new(&settings.mail).context("could not set up the mail relay")?;
    Ok(send_certificates(settings, relay)?)
}

/// Rows already handled when the relay refused the login.
fn partial_report(error: &anyhow::Error) -> Option<&MailReport> {
    match error.downcast_ref::<BatchError>() {
        Some(BatchError::Authentication { report, .. }) => Some(report.as_ref()),
        _ => None,
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("'{}' already exists, pass --force to replace it", path.display());
    }
    let text = Settings::default().to_toml()?;
    fs::write(path, text).with_context(|| format!("could not write '{}'", path.display()))?;
    info!("Wrote default configuration to '{}'", path.display());
    Ok(())
}

fn print_json<T: Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn print_generation(report: &GenerationReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    println!(
        "{} certificate(s) generated for {} name(s), {} failed",
        report.generated.len(),
        report.names,
        report.failed.len()
    );
    for failure in &report.failed {
        println!("  failed: {}: {}", failure.name, failure.reason);
    }
    Ok(())
}

fn print_mail(report: &MailReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    println!(
        "{} row(s): {} sent, {} skipped, {} failed",
        report.total_rows,
        report.sent.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for skipped in &report.skipped {
        println!("  skipped: row {} ({})", skipped.row, skipped.name);
    }
    for failure in &report.failed {
        println!(
            "  failed: row {} ({} <{}>): {}",
            failure.row, failure.name, failure.recipient, failure.reason
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refused_login_keeps_the_partial_report() {
        let report = MailReport {
            total_rows: 3,
            ..MailReport::default()
        };
        let error = anyhow::Error::from(BatchError::Authentication {
            reason: "535 5.7.8 bad credentials".to_string(),
            report: Box::new(report),
        });
        assert_eq!(partial_report(&error).map(|r| r.total_rows), Some(3));

        let other = anyhow::anyhow!("relay unreachable");
        assert!(partial_report(&other).is_none());
    }
}
