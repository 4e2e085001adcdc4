//! Command handlers.

use std::{
  io::{self, BufRead, Write},
  sync::Arc,
  time::Duration,
};

use anyhow::{Context as _, bail};
use setlist_core::{
  rating::Score,
  session::Session,
  store::TrackStore,
  track::TrackDetails,
  user::{Principal, UserId},
};
use setlist_store_sqlite::SqliteStore;
use setlist_view::{
  Dispatcher, TrackTable, Update,
  account::sign_in,
  dispatch::RateOutcome,
  pipeline::{FilterState, SortDirection, SortState},
};
use tracing::{debug, info};

use crate::{
  Cli, Command, GroupCommand, TrackCommand, ViewArgs, client::MetadataClient, render,
  settings::Settings,
};

/// How long a one-shot command waits for the live queries to report.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

struct Context {
  settings: Settings,
  store:    Arc<SqliteStore>,
}

impl Context {
  fn user_id(&self) -> anyhow::Result<UserId> {
    match &self.settings.user_id {
      Some(id) => Ok(UserId::new(id)),
      None => bail!("no user given; pass --as USER_ID or set user_id"),
    }
  }

  /// The session for the configured user and group. Without a configured
  /// user the session is anonymous; an unknown user is an error.
  async fn session(&self) -> anyhow::Result<Session> {
    let Some(id) = &self.settings.user_id else {
      return Ok(Session::anonymous());
    };
    let user = self
      .store
      .get_user(&UserId::new(id))
      .await
      .context("failed to load user")?;
    match user {
      Some(user) => Ok(Session::signed_in(user).with_group(self.settings.group_id)),
      None => bail!("unknown user {id}; run `setlist --as {id} sign-in` first"),
    }
  }

  async fn dispatcher(&self) -> anyhow::Result<Dispatcher<SqliteStore>> {
    Ok(Dispatcher::new(self.store.clone(), self.session().await?))
  }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
  let mut settings = Settings::load(&cli.config)?;
  if let Some(path) = cli.store {
    settings.store_path = crate::settings::expand_tilde(&path);
  }
  if cli.user.is_some() {
    settings.user_id = cli.user;
  }
  if cli.group.is_some() {
    settings.group_id = cli.group;
  }

  debug!(store = ?settings.store_path, "opening store");
  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;
  let cx = Context { settings, store: Arc::new(store) };

  match cli.command {
    Command::SignIn { name, email } => {
      let principal = Principal { user_id: cx.user_id()?, display_name: name, email };
      let user = sign_in(cx.store.as_ref(), &principal).await?;
      println!("signed in as {} ({}, {})", user.display_name, user.user_id, user.role);
    }
    Command::Group(cmd) => group(&cx, cmd).await?,
    Command::Track(cmd) => track(&cx, cmd).await?,
    Command::Activity { limit } => {
      let entries = cx.dispatcher().await?.recent_activity(limit).await?;
      print!("{}", render::activity(&entries));
    }
    Command::Watch(args) => watch(&cx, &args).await?,
  }
  Ok(())
}

// ─── Groups ──────────────────────────────────────────────────────────────────

async fn group(cx: &Context, cmd: GroupCommand) -> anyhow::Result<()> {
  let dispatch = cx.dispatcher().await?;
  match cmd {
    GroupCommand::Create { name } => {
      let group = dispatch.create_group(&name).await?;
      println!("created {} ({})", group.name, group.group_id);
    }
    GroupCommand::Join { group_id } => {
      let group = dispatch.join_group(group_id).await?;
      println!("member of {} ({})", group.name, group.group_id);
    }
    GroupCommand::List => {
      let groups = dispatch.my_groups().await?;
      print!("{}", render::groups(&groups, cx.settings.group_id));
    }
  }
  Ok(())
}

// ─── Tracks ──────────────────────────────────────────────────────────────────

async fn track(cx: &Context, cmd: TrackCommand) -> anyhow::Result<()> {
  match cmd {
    TrackCommand::Add { permalink, title, artist, album, genre, tags, no_fetch } => {
      let dispatch = cx.dispatcher().await?;
      let mut draft = TrackDetails {
        title,
        artist,
        album,
        genre,
        permalink,
        tags,
        ..Default::default()
      };
      if draft.permalink.is_some() && !no_fetch {
        let client = MetadataClient::new(&cx.settings.metadata_url)?;
        dispatch.autofill(&client, &mut draft).await?;
      }
      let track = dispatch.create_track(&mut draft).await?;
      println!("added {} ({})", track.display_title(), track.track_id);
    }
    TrackCommand::List(args) => {
      let mut table = open_table(cx, &args).await?;
      settle(&mut table).await?;
      print_view(&table, &args)?;
    }
    TrackCommand::Delete { track_ids, yes } => {
      let dispatch = cx.dispatcher().await?;
      if !yes {
        let mut titles = Vec::with_capacity(track_ids.len());
        for id in &track_ids {
          let track = cx.store.get_track(*id).await.context("failed to load track")?;
          titles.push(track.map_or_else(|| id.to_string(), |t| t.display_title().to_owned()));
        }
        if !confirm(&format!("Delete {} track(s): {}?", titles.len(), titles.join(", ")))? {
          println!("cancelled");
          return Ok(());
        }
      }
      let removed = dispatch.delete_tracks(&track_ids).await?;
      println!("deleted {removed} track(s)");
    }
    TrackCommand::Rate { track_id, score } => {
      let mut dispatch = cx.dispatcher().await?;
      let score = Score::new(score).map_err(setlist_view::Error::from)?;
      match dispatch.rate(track_id, score).await? {
        RateOutcome::Stored => println!("rated {score}"),
        RateOutcome::Local => println!("rated {score} (demo table: kept locally, not saved)"),
      }
    }
    TrackCommand::Comment { track_id, text } => {
      let dispatch = cx.dispatcher().await?;
      let mut thread = dispatch.load_comments(track_id).await?;
      dispatch.comment(&mut thread, &text).await?;
      print!("{}", render::comments(&thread));
    }
    TrackCommand::Comments { track_id } => {
      let dispatch = cx.dispatcher().await?;
      let thread = dispatch.load_comments(track_id).await?;
      print!("{}", render::comments(&thread));
    }
  }
  Ok(())
}

// ─── Table ───────────────────────────────────────────────────────────────────

async fn open_table(cx: &Context, args: &ViewArgs) -> anyhow::Result<TrackTable<SqliteStore>> {
  let session = cx.session().await?;
  if session.scope().is_demo() {
    info!("no active group; showing the demo table");
  }
  let mut table = TrackTable::open(cx.store.clone(), session);
  table.set_filter(FilterState {
    genre:      args.genre.clone(),
    artist:     args.artist.clone(),
    query:      args.query.clone(),
    min_rating: args.min_rating,
  });
  let direction = if args.desc { SortDirection::Desc } else { SortDirection::Asc };
  table.set_sort(SortState::new(args.sort, direction));
  table.set_page_size(args.page_size.unwrap_or(cx.settings.page_size));
  table.set_page(args.page.saturating_sub(1));
  Ok(table)
}

/// Pump updates until the feed and every rating query have reported.
async fn settle(table: &mut TrackTable<SqliteStore>) -> anyhow::Result<()> {
  tokio::time::timeout(SETTLE_TIMEOUT, async {
    while !table.is_settled() {
      if table.next_update().await.is_none() {
        break;
      }
    }
  })
  .await
  .context("timed out waiting for the track list")?;
  if let Some(e) = table.feed_error() {
    bail!("track feed failed: {e}");
  }
  Ok(())
}

fn print_view(table: &TrackTable<SqliteStore>, args: &ViewArgs) -> anyhow::Result<()> {
  let view = table.view();
  if args.json {
    println!("{}", serde_json::to_string_pretty(&view)?);
    return Ok(());
  }
  print!("{}", render::page(&view, table.sort(), Some(table.selection())));
  if args.facets {
    print!("{}", render::facets(&table.facets()));
  }
  Ok(())
}

async fn watch(cx: &Context, args: &ViewArgs) -> anyhow::Result<()> {
  let mut table = open_table(cx, args).await?;
  loop {
    tokio::select! {
      _ = tokio::signal::ctrl_c() => break,
      update = table.next_update() => {
        let Some(update) = update else { break };
        match update {
          Update::Stale => continue,
          Update::FeedFailed(e) => bail!("track feed failed: {e}"),
          Update::AggregateFailed { track_id, message } => {
            eprintln!("rating feed for {track_id} failed: {message}");
          }
          Update::Tracks { .. } | Update::Aggregate { .. } => {}
        }
        if table.is_settled() {
          print!("\x1b[2J\x1b[H");
          print_view(&table, args)?;
          io::stdout().flush().ok();
        }
      }
    }
  }
  Ok(())
}

// ─── Prompt ──────────────────────────────────────────────────────────────────

/// Ask a yes/no question on stdin. Anything but `y`/`yes` declines.
fn confirm(question: &str) -> anyhow::Result<bool> {
  print!("{question} [y/N] ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
