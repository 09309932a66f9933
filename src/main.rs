//! CloudWatch Alarm Check
//!
//! Nagios-compatible plugin that reports the state of one CloudWatch alarm.
//! AWS credentials come from Vault's AWS secrets engine after an AppRole
//! login (`VAULT_ROLE_ID` / `VAULT_SECRET_ID`). No static AWS keys needed.
//!
//! # Usage
//! ```bash
//! check-cloudwatch \
//!   --rolearn arn:aws:iam::123456789012:role/nagios \
//!   --region eu-west-1 \
//!   --alarm api-latency \
//!   --alarmtype metricalarm
//! ```
//!
//! Prints `<LEVEL> <message>` and exits 0 (OK), 2 (CRITICAL) or 3 (UNKNOWN).

use check_cloudwatch::check::{self, CheckRequest};
use check_cloudwatch::{CloudWatchSource, CredentialExchanger, StatusResult, VaultClient, VaultConfig};
use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

// ============================================================
// CLI Definition
// ============================================================

/// Required flags are optional here so that a missing one is reported as
/// UNKNOWN instead of clap's usage error.
#[derive(Parser, Debug)]
#[command(name = "check-cloudwatch")]
#[command(about = "Report CloudWatch alarm state using Vault-issued AWS credentials", long_about = None)]
#[command(version)]
struct Cli {
    /// Role ARN passed to the Vault AWS secrets engine
    #[arg(long)]
    rolearn: Option<String>,

    /// AWS region to perform the check in
    #[arg(long)]
    region: Option<String>,

    /// Name of the CloudWatch alarm to check
    #[arg(long)]
    alarm: Option<String>,

    /// CloudWatch alarm type: metricalarm or compositealarm
    #[arg(long, default_value = "metricalarm")]
    alarmtype: String,

    /// Vault path that issues AWS credentials
    #[arg(long, env = "VAULT_AWS_STS_PATH", default_value = check_cloudwatch::credentials::DEFAULT_STS_PATH)]
    sts_path: String,

    /// Requested credential lifetime (e.g. 15m)
    #[arg(long, env = "VAULT_AWS_STS_TTL")]
    ttl: Option<String>,

    /// Override the CloudWatch endpoint
    #[arg(long, env = "CLOUDWATCH_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Enable verbose logging (stderr)
    #[arg(short, long)]
    verbose: bool,
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => StatusResult::unknown(usage_error(&err.to_string())).exit(),
        },
    };

    init_logging(cli.verbose);

    let request = match CheckRequest::new(cli.rolearn, cli.region, cli.alarm, &cli.alarmtype) {
        Ok(request) => request,
        Err(err) => StatusResult::from(err).exit(),
    };

    let vault = match VaultConfig::from_env().and_then(VaultClient::new) {
        Ok(vault) => vault,
        Err(err) => StatusResult::from(err).exit(),
    };

    let mut exchanger =
        CredentialExchanger::new(&vault, vault.config().approle.clone()).with_sts_path(cli.sts_path);
    if let Some(ttl) = cli.ttl {
        exchanger = exchanger.with_ttl(ttl);
    }

    let mut source = CloudWatchSource::new();
    if let Some(endpoint) = cli.endpoint_url {
        source = source.with_endpoint_url(endpoint);
    }

    check::run(&exchanger, &source, &request).await.exit()
}

/// Logs go to stderr; stdout carries only the status line
fn init_logging(verbose: bool) {
    let default = if verbose { "check_cloudwatch=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// First line of a clap error, without its `error: ` prefix
fn usage_error(rendered: &str) -> String {
    let line = rendered.lines().next().unwrap_or_default();
    line.trim_start_matches("error: ").trim().to_string()
}
