// Entrypoint for the CLI application.
// - Parses arguments, sets up logging and hands off to `commands`.
// - Returns `anyhow::Result` so failures print and exit non-zero.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gdvc::api::DriveClient;
use gdvc::commands::upload::UploadOptions;
use gdvc::commands::{change_root, download, init, publish, track, update, upload, Workspace};
use gdvc::config::{ConfigStore, CONFIG_FILE};

const AFTER_HELP: &str = "Examples:
  gdvc init https://drive.google.com/drive/folders/ABC123 src data
  gdvc track add models
  gdvc upload v1.0 --public
  gdvc publish v1.0
  gdvc download latest
  gdvc update

Workflow:
  1. Upload creates a new version (sets current_version)
  2. Publish makes a version public (sets public_version)
  3. Download latest / update use public_version";

#[derive(Parser)]
#[command(name = "gdvc", version)]
#[command(about = "Lightweight Google Drive version control")]
#[command(after_help = AFTER_HELP, arg_required_else_help = true)]
struct Cli {
    /// Path to the project manifest
    #[arg(long, global = true, env = "GDVC_CONFIG", default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    yes: bool,

    /// Log HTTP calls and other diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize GDVC with a Google Drive folder URL
    Init {
        /// Google Drive folder URL
        folder_url: String,
        /// Directories to track
        directories: Vec<String>,
    },

    /// Upload a version to Drive
    Upload {
        /// Version name
        version_name: String,
        /// Upload this folder's contents instead of the tracked directories
        local_folder: Option<PathBuf>,
        /// Make uploaded files public
        #[arg(long)]
        public: bool,
        /// Preview the upload without executing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage tracked directories
    #[command(arg_required_else_help = true)]
    Track {
        #[command(subcommand)]
        action: TrackAction,
    },

    /// Download a version from Drive
    Download {
        /// Version name or "latest"
        version: String,
    },

    /// Make a version public and set it as the downloadable version
    Publish {
        /// Version name to publish
        version_name: String,
        /// Publish the folder only, not its contents
        #[arg(long)]
        no_recursive: bool,
    },

    /// Update to the latest public version
    Update,

    /// Change the Drive folder root, preserving only the current version
    #[command(name = "change_folder_root", alias = "change-folder-root")]
    ChangeFolderRoot {
        /// New Google Drive folder URL
        new_folder_url: String,
    },
}

#[derive(Subcommand)]
enum TrackAction {
    /// Add a directory to tracking
    Add { directory: String },
    /// Remove a directory from tracking
    Remove { directory: String },
    /// List tracked directories
    List,
}

/// Log to stderr so command output on stdout stays clean.
fn init_tracing(verbose: bool) {
    let default = if verbose { "gdvc=debug" } else { "gdvc=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ws = Workspace::new(ConfigStore::new(cli.config), cli.yes);

    match cli.command {
        Commands::Init {
            folder_url,
            directories,
        } => init::run(&ws, &folder_url, &directories)?,
        Commands::Upload {
            version_name,
            local_folder,
            public,
            dry_run,
        } => {
            let opts = UploadOptions {
                version: version_name,
                local_folder,
                public,
                dry_run,
            };
            upload::run(&ws, &opts, DriveClient::connect)?;
        }
        Commands::Track { action } => match action {
            TrackAction::Add { directory } => track::add(&ws, &directory)?,
            TrackAction::Remove { directory } => track::remove(&ws, &directory)?,
            TrackAction::List => track::list(&ws)?,
        },
        Commands::Download { version } => {
            download::run(&ws, &version, DriveClient::connect_read_only)?;
        }
        Commands::Publish {
            version_name,
            no_recursive,
        } => publish::run(&ws, &version_name, !no_recursive, DriveClient::connect)?,
        Commands::Update => {
            update::run(&ws, DriveClient::connect_read_only)?;
        }
        Commands::ChangeFolderRoot { new_folder_url } => change_root::run(&ws, &new_folder_url)?,
    }
    Ok(())
}
