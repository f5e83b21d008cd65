//! # CLI Interface
//!
//! Command-line argument structure for `xvault-node` using `clap` derive.
//! Three subcommands: `run` (serve one replica round over the configured
//! descriptors), `digest` (print the state digest and exit — handy for
//! replica cross-checks), and `version`.
//!
//! Every configurable value has an environment-variable fallback so a
//! containerized runtime can wire the node without a wall of flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// XVault contract node.
///
/// Runtime adapter for the XVault deterministic contract core: loads the
/// state file, wires the token adapter, and exchanges length-prefixed JSON
/// frames with the consensus runtime over per-user file descriptors.
#[derive(Parser, Debug)]
#[command(
    name = "xvault-node",
    about = "XVault contract runtime adapter",
    version,
    propagate_version = true
)]
pub struct XvaultNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process requests for one replica round.
    Run(RunArgs),
    /// Print the current state digest and exit.
    Digest(DigestArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path of the persisted state file.
    #[arg(long, env = "XVAULT_STATE_FILE", default_value = "./state/xvault-state.json")]
    pub state_file: PathBuf,

    /// Gateway base URL composed into entry `gatewayUrl` fields. May be
    /// empty.
    #[arg(long, env = "XVAULT_GATEWAY_URL", default_value = "")]
    pub gateway_url: String,

    /// Enable the team vault operation family.
    #[arg(long, env = "XVAULT_TEAM_MODE")]
    pub team_mode: bool,

    /// Treat manifest tokens as mutable: rotations keep the token id and
    /// return `mutable_stub` instead of burn/remint.
    #[arg(long, env = "XVAULT_MUTABLE_URI_TOKENS")]
    pub mutable_uri_tokens: bool,

    /// Fall back to deterministic simulated token ids when a ledger
    /// submission fails. Dev deployments only.
    #[arg(long, env = "XVAULT_DEV_FALLBACK")]
    pub dev_fallback: bool,

    /// Ledger account that issues URI tokens.
    #[arg(long, env = "XVAULT_ISSUER", default_value = "rXVaultIssuerAccount")]
    pub issuer: String,

    /// Round key for this invocation, as provided by the runtime.
    #[arg(long, env = "XVAULT_ROUND_KEY", default_value = "0")]
    pub round_key: String,

    /// File descriptor to read requests from.
    #[arg(long, env = "XVAULT_INPUT_FD", default_value_t = 0)]
    pub input_fd: i32,

    /// File descriptor to write length-prefixed response frames to.
    #[arg(long, env = "XVAULT_OUTPUT_FD", default_value_t = 1)]
    pub output_fd: i32,

    /// Wire an in-memory ledger with two local signers instead of running
    /// purely simulated. Exercises the submission path without a network.
    #[arg(long)]
    pub dev_ledger: bool,

    /// Log verbosity: trace, debug, info, warn, error.
    #[arg(long, env = "XVAULT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format: pretty or json.
    #[arg(long, env = "XVAULT_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `digest` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct DigestArgs {
    /// Path of the persisted state file.
    #[arg(long, env = "XVAULT_STATE_FILE", default_value = "./state/xvault-state.json")]
    pub state_file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // The derive macros must produce a coherent CLI definition.
        XvaultNodeCli::command().debug_assert();
    }

    #[test]
    fn run_subcommand_defaults() {
        let args = XvaultNodeCli::parse_from(["xvault-node", "run"]);
        match args.command {
            Commands::Run(run) => {
                assert_eq!(run.state_file, PathBuf::from("./state/xvault-state.json"));
                assert_eq!(run.gateway_url, "");
                assert!(!run.team_mode);
                assert!(!run.mutable_uri_tokens);
                assert!(!run.dev_fallback);
                assert_eq!(run.round_key, "0");
                assert_eq!(run.input_fd, 0);
                assert_eq!(run.output_fd, 1);
                assert_eq!(run.log_level, "info");
            }
            _ => panic!("expected Run subcommand"),
        }
    }

    #[test]
    fn run_subcommand_flags() {
        let args = XvaultNodeCli::parse_from([
            "xvault-node",
            "run",
            "--team-mode",
            "--dev-fallback",
            "--gateway-url",
            "https://gateway.example.com",
            "--round-key",
            "42",
        ]);
        match args.command {
            Commands::Run(run) => {
                assert!(run.team_mode);
                assert!(run.dev_fallback);
                assert_eq!(run.gateway_url, "https://gateway.example.com");
                assert_eq!(run.round_key, "42");
            }
            _ => panic!("expected Run subcommand"),
        }
    }

    #[test]
    fn digest_subcommand_parses() {
        let args = XvaultNodeCli::parse_from([
            "xvault-node",
            "digest",
            "--state-file",
            "/tmp/state.json",
        ]);
        match args.command {
            Commands::Digest(digest) => {
                assert_eq!(digest.state_file, PathBuf::from("/tmp/state.json"));
            }
            _ => panic!("expected Digest subcommand"),
        }
    }

    #[test]
    fn version_subcommand_parses() {
        let args = XvaultNodeCli::parse_from(["xvault-node", "version"]);
        assert!(matches!(args.command, Commands::Version));
    }
}
