//! `setlist`: a shared, rated track table for groups.
//!
//! # Usage
//!
//! ```
//! setlist --as alice sign-in --name Alice
//! setlist --as alice group create "Friday Mix"
//! setlist --as alice --group <GROUP_ID> track add --permalink https://soundcloud.com/artist/song
//! setlist --as alice --group <GROUP_ID> track list --sort rating --desc
//! setlist --as alice --group <GROUP_ID> watch
//! ```

mod client;
mod commands;
mod render;
mod settings;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use setlist_view::pipeline::SortKey;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "setlist", version, about = "A shared, rated track table for groups")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "setlist.toml")]
  config: PathBuf,

  /// SQLite database path (overrides `store_path`).
  #[arg(long, value_name = "PATH")]
  store: Option<PathBuf>,

  /// Act as this user (overrides `user_id`).
  #[arg(long = "as", value_name = "USER_ID", env = "SETLIST_USER_ID")]
  user: Option<String>,

  /// Active group (overrides `group_id`).
  #[arg(long, value_name = "GROUP_ID", env = "SETLIST_GROUP_ID")]
  group: Option<Uuid>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Record the acting user in the store.
  SignIn {
    #[arg(long)]
    name:  Option<String>,
    #[arg(long)]
    email: Option<String>,
  },

  /// Create, join and list groups.
  #[command(subcommand)]
  Group(GroupCommand),

  /// Add, list, delete, rate and comment on tracks.
  #[command(subcommand)]
  Track(TrackCommand),

  /// Recent activity in the active group.
  Activity {
    #[arg(long, default_value_t = setlist_core::activity::DEFAULT_ACTIVITY_LIMIT)]
    limit: usize,
  },

  /// Show the table and re-render it on every change until Ctrl-C.
  Watch(ViewArgs),
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
  Create { name: String },
  Join { group_id: Uuid },
  List,
}

#[derive(Subcommand, Debug)]
enum TrackCommand {
  /// Add a track, filling blanks from the metadata service when a permalink
  /// is given.
  Add {
    #[arg(long)]
    permalink: Option<String>,
    #[arg(long)]
    title:     Option<String>,
    #[arg(long)]
    artist:    Option<String>,
    #[arg(long)]
    album:     Option<String>,
    #[arg(long)]
    genre:     Option<String>,
    /// Comma-separated.
    #[arg(long, value_delimiter = ',')]
    tags:      Vec<String>,
    /// Skip the metadata lookup.
    #[arg(long)]
    no_fetch:  bool,
  },

  List(ViewArgs),

  /// Delete tracks you added (or any track, as an admin).
  Delete {
    #[arg(required = true)]
    track_ids: Vec<Uuid>,
    /// Do not ask for confirmation.
    #[arg(short, long)]
    yes:       bool,
  },

  Rate { track_id: Uuid, score: i64 },

  Comment { track_id: Uuid, text: String },

  Comments { track_id: Uuid },
}

/// Filter, sort and page options shared by `track list` and `watch`.
#[derive(Args, Debug, Clone)]
struct ViewArgs {
  #[arg(long)]
  genre:      Option<String>,
  #[arg(long)]
  artist:     Option<String>,
  /// Matches titles and tags.
  #[arg(short, long)]
  query:      Option<String>,
  #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=5))]
  min_rating: u8,
  #[arg(long, default_value_t = SortKey::Title)]
  sort:       SortKey,
  #[arg(long)]
  desc:       bool,
  /// One-based.
  #[arg(long, default_value_t = 1)]
  page:       usize,
  #[arg(long)]
  page_size:  Option<usize>,
  /// Also list the distinct genres and artists.
  #[arg(long)]
  facets:     bool,
  /// Print the page as JSON.
  #[arg(long)]
  json:       bool,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  match commands::run(cli).await {
    Ok(()) => Ok(()),
    Err(e) => match e.downcast_ref::<setlist_view::Error>() {
      Some(view_err) => {
        eprintln!("{}", render::notice(&setlist_view::Notice::from(view_err)));
        std::process::exit(1);
      }
      None => Err(e),
    },
  }
}
