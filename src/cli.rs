use clap::{Parser, Subcommand};

/// sparkcache - persistent cache for notebook cell results
///
/// Inspect the Parquet cache directories written by the `%%sparkcache`
/// cell magic.
#[derive(Parser, Debug)]
#[command(name = "sparkcache")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Persistent cache for notebook cell results", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Config file named on the command line, if the command takes one
    pub fn config_path(&self) -> Option<&str> {
        match &self.command {
            Commands::Status(args) => args.common.config.as_deref(),
            Commands::Inspect(args) => args.common.config.as_deref(),
            Commands::Config(ConfigArgs {
                command: ConfigCommands::Show { config },
            }) => config.as_deref(),
            Commands::Config(_) => None,
        }
    }
}

/// Configuration arguments shared across commands
#[derive(Parser, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Config file path
    #[arg(short = 'c', long, env = "SPARKCACHE_CONFIG")]
    pub config: Option<String>,

    /// Cache directory (overrides the configured default)
    #[arg(short = 'd', long, env = "SPARKCACHE_CACHEDIR")]
    pub cachedir: Option<String>,

    /// Session name used to compute the default cache directory
    #[arg(long, env = "SPARKCACHE_SESSION")]
    pub session: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show which variables are present in a cache directory
    Status(StatusArgs),

    /// Load cached variables and describe their tables
    Inspect(InspectArgs),

    /// Configuration management utilities
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Variable names
    #[arg(required = true)]
    pub vars: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Variable names
    #[arg(required = true)]
    pub vars: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Config file path
        path: String,
    },

    /// Print an example configuration file
    Generate,

    /// Show the effective configuration
    Show {
        /// Config file path (discovered when omitted)
        #[arg(short = 'c', long, env = "SPARKCACHE_CONFIG")]
        config: Option<String>,
    },
}

/// Arguments of the `%%sparkcache` cell magic line
///
/// ```text
/// %%sparkcache [-s] [-d DIR] [-f | -r] VAR [VAR ...]
/// ```
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "%%sparkcache", no_binary_name = true)]
pub struct MagicArgs {
    /// Variables to save
    pub vars: Vec<String>,

    /// Do not display information when loading/saving variables
    #[arg(short = 's', long)]
    pub silent: bool,

    /// Cache directory as an absolute or relative path
    #[arg(short = 'd', long)]
    pub cachedir: Option<String>,

    /// Force the cell's execution and save the variables
    #[arg(short = 'f', long)]
    pub force: bool,

    /// Always read from the cache and prevent the cell's execution,
    /// raising an error if a variable is not cached
    #[arg(short = 'r', long)]
    pub read: bool,
}
