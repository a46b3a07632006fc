//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use plist_core::{DEFAULT_TOOL_PATH, ValueType};

/// plist-sync - Converge property-list keys with PlistBuddy
#[derive(Parser, Debug)]
#[command(name = "plist-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// PlistBuddy binary to run
    #[arg(long, global = true, env = "PLIST_SYNC_TOOL", default_value = DEFAULT_TOOL_PATH)]
    pub tool: PathBuf,

    /// Do not refresh the preferences cache after changes
    #[arg(long, global = true)]
    pub no_reload: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Converge keys to their desired values
    ///
    /// Reads entries from a TOML manifest, or a single entry from flags.
    ///
    /// Examples:
    ///   plist-sync apply prefs.toml
    ///   plist-sync apply --file com.example.plist --key Servers --value '["a","b"]'
    Apply {
        /// Manifest file describing the entries
        manifest: Option<PathBuf>,

        #[command(flatten)]
        entry: EntryArgs,

        /// Only report what would change
        #[arg(long)]
        dry_run: bool,
    },

    /// Report entries that do not match, exiting non-zero on drift
    Check {
        /// Manifest file describing the entries
        manifest: Option<PathBuf>,

        #[command(flatten)]
        entry: EntryArgs,
    },

    /// Delete a key if it exists
    Remove {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show PlistBuddy's output for a key
    Print {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Location of a key and the identity to act as
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct TargetArgs {
    /// Property-list file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Colon-separated key path, e.g. Servers:0
    #[arg(short, long)]
    pub key: String,

    /// User to run PlistBuddy as
    #[arg(short, long)]
    pub user: Option<String>,

    /// Group to run PlistBuddy as
    #[arg(short, long)]
    pub group: Option<String>,
}

/// A single entry given on the command line
#[derive(Args, Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryArgs {
    /// Property-list file
    #[arg(short, long, conflicts_with = "manifest")]
    pub file: Option<PathBuf>,

    /// Colon-separated key path, e.g. Servers:0
    #[arg(short, long, conflicts_with = "manifest")]
    pub key: Option<String>,

    /// Desired value; JSON is accepted for arrays, dicts and booleans
    #[arg(long, conflicts_with = "manifest")]
    pub value: Option<String>,

    /// Value type (string, integer, real, bool, date, array, dict)
    #[arg(short = 't', long = "type", value_parser = parse_value_type)]
    pub value_type: Option<ValueType>,

    /// User to run PlistBuddy as
    #[arg(short, long)]
    pub user: Option<String>,

    /// Group to run PlistBuddy as
    #[arg(short, long)]
    pub group: Option<String>,
}

fn parse_value_type(s: &str) -> Result<ValueType, String> {
    s.parse::<ValueType>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply_flags() {
        let cli = Cli::try_parse_from([
            "plist-sync",
            "apply",
            "--file",
            "/tmp/a.plist",
            "--key",
            "Servers",
            "--value",
            "[\"a\"]",
            "--type",
            "array",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Apply { entry, dry_run, .. }) => {
                assert_eq!(entry.key.as_deref(), Some("Servers"));
                assert_eq!(entry.value_type, Some(ValueType::Array));
                assert!(!dry_run);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_manifest_conflicts_with_flags() {
        let result = Cli::try_parse_from([
            "plist-sync",
            "apply",
            "prefs.toml",
            "--file",
            "/tmp/a.plist",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_type_is_rejected() {
        let result = Cli::try_parse_from(["plist-sync", "check", "--type", "float"]);
        assert!(result.is_err());
    }
}
