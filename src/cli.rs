//! CLI argument parsing with clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::settings::CONFIG_DIR_ENV;

/// Manage and test connections to remote Deluge daemons
#[derive(Parser, Debug)]
#[command(name = "deluge-remote")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Directory holding settings.json
    #[arg(long, global = true, env = CONFIG_DIR_ENV)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List saved clients
    List,

    /// Test a new client and save it if the connection succeeds
    Add(AddArgs),

    /// Change a saved client, re-test it and replace it in place
    Edit(EditArgs),

    /// Remove a saved client
    Remove {
        /// Nickname of the client to remove
        nickname: String,
    },

    /// Re-test a saved client
    Test {
        /// Nickname of the client to test
        nickname: String,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Display name for the client
    #[arg(short, long)]
    pub nickname: String,

    /// Hostname or IP address of the Deluge Web UI
    #[arg(long)]
    pub host: String,

    /// Path the Web UI is served under, e.g. "deluge"
    #[arg(long, default_value = "")]
    pub path: String,

    /// Web UI port
    #[arg(short, long, default_value = "8112")]
    pub port: String,

    /// Web UI password
    #[arg(long, env = "DELUGE_PASSWORD", hide_env_values = true, default_value = "")]
    pub password: String,

    /// Use plain http instead of https
    #[arg(long)]
    pub http: bool,

    /// Extra request header as "Name: Value" (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

#[derive(Args, Debug, Default)]
pub struct EditArgs {
    /// Nickname of the client to edit
    pub nickname: String,

    /// New display name
    #[arg(long)]
    pub rename: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub path: Option<String>,

    #[arg(short, long)]
    pub port: Option<String>,

    #[arg(long, env = "DELUGE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Switch to plain http
    #[arg(long, conflicts_with = "https")]
    pub http: bool,

    /// Switch to https
    #[arg(long)]
    pub https: bool,

    /// Add a header as "Name: Value" (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Replace the header at a position shown by `list`, as "INDEX=Name: Value"
    #[arg(long = "edit-header", value_parser = parse_indexed_header, conflicts_with = "clear_headers")]
    pub edit_headers: Vec<(usize, (String, String))>,

    /// Delete the header at a position shown by `list` (repeatable)
    #[arg(long = "delete-header", conflicts_with = "clear_headers")]
    pub delete_headers: Vec<usize>,

    /// Drop every header with this name (repeatable)
    #[arg(long = "remove-header")]
    pub remove_headers: Vec<String>,

    /// Drop all saved headers before applying --header
    #[arg(long)]
    pub clear_headers: bool,
}

/// Parse `Name: Value` into a header pair.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: Value\", got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name cannot be empty".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Parse `INDEX=Name: Value` into a header position and pair.
pub fn parse_indexed_header(raw: &str) -> Result<(usize, (String, String)), String> {
    let (index, header) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected \"INDEX=Name: Value\", got {:?}", raw))?;
    let index = index
        .trim()
        .parse()
        .map_err(|_| format!("header index must be a number, got {:?}", index))?;
    Ok((index, parse_header(header)?))
}
