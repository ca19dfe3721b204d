use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "feature-gen")]
#[command(about = "Resolve build artifacts and generate server features from compiled application code")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Local artifact repository root (defaults to ~/.m2/repository)
    #[arg(long, value_name = "DIR")]
    pub repo: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Reconcile configured server features with scanned API usage and
    /// update the generated configuration overlay
    Generate {
        /// Module descriptor of the current module
        #[arg(long, value_name = "FILE")]
        module: PathBuf,

        /// Workspace descriptor for multi-module builds
        #[arg(long, value_name = "FILE")]
        workspace: Option<PathBuf>,

        /// Pass all class files and only non-generated features to the
        /// scanner; disable to pass changed class files and all features
        #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
        optimize: bool,

        /// Changed class files to scan instead of the full output directory
        #[arg(long = "class-file", value_name = "FILE")]
        class_files: Vec<PathBuf>,

        /// Binary scanner coordinate override (group:name[:type[:version]])
        #[arg(long, value_name = "COORD")]
        scanner: Option<String>,

        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,

        /// Log and exit without generating anything
        #[arg(long)]
        skip: bool,
    },
    /// Resolve an artifact coordinate against the module's dependencies and
    /// the local repository
    Resolve {
        /// Module descriptor providing the dependency context
        #[arg(long, value_name = "FILE")]
        module: PathBuf,

        /// group:name[:type[:version[:classifier]]]; name and classifier
        /// accept a trailing '*' with --transitive
        coordinate: String,

        /// Expand matches with their recorded transitive dependencies
        #[arg(long)]
        transitive: bool,
    },
}
