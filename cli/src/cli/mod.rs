pub mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use snc_core::config::{load_config, Config};
use snc_core::{SerializeMode, ServiceNowClient};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "snc")]
#[command(author, version, about = "Query and edit ServiceNow tables from the command line")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// Path to config file (checked in order: ./snc.toml, ~/.config/snc/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Instance name or URL (overrides config and SNC_INSTANCE)
    #[arg(short, long, global = true)]
    pub instance: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query a table, printing one JSON object per row
    Query(QueryArgs),

    /// Print a single record
    Get {
        table: String,
        sys_id: String,
    },

    /// Insert a record
    Insert {
        table: String,

        /// Field assignment, repeatable
        #[arg(short, long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// Update fields of a record
    Update {
        table: String,
        sys_id: String,

        /// Field assignment, repeatable
        #[arg(short, long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Delete a record
    Delete {
        table: String,
        sys_id: String,
    },

    /// Work with attachments
    Attachment {
        #[command(subcommand)]
        command: AttachmentCommands,
    },

    /// Show the resolved configuration, secrets masked
    Config {
        /// Print JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct QueryArgs {
    pub table: String,

    /// Encoded query, e.g. `active=true^priority=1`
    #[arg(short, long)]
    pub query: Option<String>,

    /// Comma separated fields
    #[arg(short, long)]
    pub fields: Option<String>,

    /// Maximum number of rows
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Order by this field
    #[arg(short, long)]
    pub order: Option<String>,

    /// Descending order
    #[arg(long, requires = "order")]
    pub desc: bool,

    /// Which side of each field to print
    #[arg(long, value_enum, default_value_t = Output::Value)]
    pub display: Output,
}

#[derive(Subcommand)]
pub enum AttachmentCommands {
    /// List attachments of a table, or of one record
    List {
        table: String,

        /// Only attachments of this record
        #[arg(short, long)]
        record: Option<String>,
    },

    /// Download an attachment to a file or directory
    Download {
        sys_id: String,
        path: PathBuf,
    },

    /// Attach a file to a record
    Upload {
        table: String,
        sys_id: String,
        file: PathBuf,

        /// Defaults to a guess from the file name
        #[arg(long)]
        content_type: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Output {
    Value,
    Display,
    Both,
}

impl From<Output> for SerializeMode {
    fn from(output: Output) -> Self {
        match output {
            Output::Value => SerializeMode::Value,
            Output::Display => SerializeMode::Display,
            Output::Both => SerializeMode::Both,
        }
    }
}

/// Config file, then environment, then `--instance`
pub fn resolve_config(global: &GlobalArgs) -> anyhow::Result<Config> {
    let mut config = load_config(global.config.clone())?;
    config.apply_env();
    if let Some(instance) = &global.instance {
        config.instance.name = instance.clone();
    }
    Ok(config)
}

/// Filter directives: `--verbose`, then `RUST_LOG`, then `[logging] level`
pub fn log_directives(verbose: bool, rust_log: Option<String>, level: &str) -> String {
    if verbose {
        return "snc=debug,snc_core=debug".to_string();
    }
    match rust_log.filter(|v| !v.trim().is_empty()) {
        Some(directives) => directives,
        None => format!("snc={level},snc_core={level}", level = level),
    }
}

pub fn connect(config: &Config) -> anyhow::Result<ServiceNowClient> {
    let client = config.build_client()?;
    tracing::debug!("Connected to {}", client.instance());
    Ok(client)
}

/// Splits `field=value` pairs on the first `=`
pub fn parse_assignments(pairs: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((field, value)) if !field.trim().is_empty() => {
                Ok((field.trim().to_string(), value.to_string()))
            }
            _ => anyhow::bail!("Expected FIELD=VALUE, got {:?}", pair),
        })
        .collect()
}
