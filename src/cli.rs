// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use skyhook::output::OutputMode;
use skyhook::pipeline::Selection;

#[derive(Parser)]
#[command(name = "skyhook")]
#[command(about = "Release-based deployments with atomic symlink promotion")]
#[command(version)]
pub struct Cli {
    /// Log every command sent to the targets
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

/// Which targets a command runs on.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Only this stage
    #[arg(short, long)]
    pub stage: Option<String>,

    /// Only the server with this host name
    #[arg(long)]
    pub on: Option<String>,
}

impl From<TargetArgs> for Selection {
    fn from(args: TargetArgs) -> Self {
        Selection {
            stage: args.stage,
            host: args.on,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new skyhook.yml configuration file
    Init {
        /// Application name
        #[arg(long)]
        application: Option<String>,

        /// Repository URL to deploy from
        #[arg(long)]
        repository: Option<String>,

        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,
    },

    /// Deploy a new release to the configured servers
    Deploy {
        #[command(flatten)]
        targets: TargetArgs,

        /// Number of targets to deploy to at once
        #[arg(short, long)]
        parallel: Option<usize>,

        /// Break an existing deploy lock
        #[arg(long)]
        force_lock: bool,
    },

    /// Re-link a previous release as current
    Rollback {
        /// Release to roll back to (defaults to the previous one)
        release: Option<String>,

        #[command(flatten)]
        targets: TargetArgs,

        /// Break an existing deploy lock
        #[arg(long)]
        force_lock: bool,
    },

    /// Remove releases beyond the retention count
    Cleanup {
        #[command(flatten)]
        targets: TargetArgs,
    },

    /// Show the release history of each target
    Current {
        #[command(flatten)]
        targets: TargetArgs,
    },

    /// Print a configuration value by dotted key, e.g. remote.symlink
    #[command(name = "option")]
    GetOption {
        key: String,
    },
}
