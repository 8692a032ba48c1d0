//! Command-line interface for the transfer engine.

mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use runner::{
    run_compare, run_download, run_hosts, run_ls, run_status, run_sync, run_upload,
};

/// SFTP Courier - asynchronous SFTP transfers with sync reconciliation
#[derive(Parser)]
#[command(name = "sftp-courier")]
#[command(about = "Asynchronous SFTP session and file-transfer engine")]
#[command(version)]
#[command(after_help = "EXAMPLES:
    # Show configured profiles and their state
    sftp-courier status

    # List hosts discovered in ~/.ssh/config
    sftp-courier hosts

    # List a remote directory (including hidden entries)
    sftp-courier ls staging /var/www --all

    # Upload a file with progress
    sftp-courier upload staging ./site.tar.gz /tmp/site.tar.gz --progress

    # Download a file
    sftp-courier download staging /var/log/app.log ./app.log

    # Compare a local file against its remote counterpart
    sftp-courier compare staging ./index.html /var/www/index.html

    # Transfer whichever side is newer
    sftp-courier sync staging ./index.html /var/www/index.html")]
pub struct Cli {
    /// Configuration directory (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show configured profiles, settings, and connection state
    Status,

    /// List hosts discovered in ~/.ssh/config
    Hosts,

    /// List a remote directory
    Ls {
        /// Profile name from configuration
        profile: String,

        /// Remote directory (defaults to the profile's remote dir)
        path: Option<String>,

        /// Include hidden (dot-prefixed) entries
        #[arg(long, short)]
        all: bool,
    },

    /// Upload a file to the remote host
    Upload {
        /// Profile name from configuration
        profile: String,

        /// Local file path
        local_path: PathBuf,

        /// Remote destination path
        remote_path: String,

        /// Show transfer progress
        #[arg(long, short)]
        progress: bool,
    },

    /// Download a file from the remote host
    Download {
        /// Profile name from configuration
        profile: String,

        /// Remote file path
        remote_path: String,

        /// Local destination path
        local_path: PathBuf,

        /// Show transfer progress
        #[arg(long, short)]
        progress: bool,
    },

    /// Compare a local file against its remote counterpart by mtime
    Compare {
        /// Profile name from configuration
        profile: String,

        /// Local file path
        local_path: PathBuf,

        /// Remote file path
        remote_path: String,

        /// Report the verdict only, without launching a diff tool
        #[arg(long)]
        no_tool: bool,
    },

    /// Transfer whichever side is newer (no-op on equal timestamps)
    Sync {
        /// Profile name from configuration
        profile: String,

        /// Local file path
        local_path: PathBuf,

        /// Remote file path
        remote_path: String,
    },
}
