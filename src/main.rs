use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::{Path, PathBuf};

use anilog::api::{self, ApiError, FollowStatus, SearchQuery};
use anilog::auth::{ApiRequest, AuthGateway, LoginError, Outcome, Session};
use anilog::config::Config;
use anilog::discover::{Category, DiscoverFeed, DiscoveryCache, Freshness};
use anilog::media::MediaKind;
use anilog::ranking::{fetch_tracked, RankingBook, TrackedError, TrackedItem};
use anilog::storage::{SqliteStore, StorageError};

/// Get the config directory path (~/.config/anilog/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("anilog"))
}

/// Create the config directory if needed and restrict it to the current user.
fn prepare_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }

    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "anilog", about = "Command-line client for the AniLog anime/manga tracker")]
struct Args {
    /// Config file (default: ~/.config/anilog/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Local state database (default: ~/.config/anilog/store.db)
    #[arg(long, value_name = "FILE", global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in; the password is read from ANILOG_PASSWORD or stdin
    Login {
        /// Email address or username
        user: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in user id
    Whoami,
    /// Show the trending, popular, new and coming-soon lists
    Discover {
        /// Only show one media kind
        #[arg(long)]
        kind: Option<MediaKind>,
        /// Ignore the local cache
        #[arg(long)]
        refresh: bool,
    },
    /// Authenticated GET of an API path, printing the response body
    Get {
        /// Absolute API path, e.g. /api/profile/7
        path: String,
    },
    /// Personal ranking of tracked items
    Rank {
        #[command(subcommand)]
        action: RankAction,
    },
    /// Show the signed-in user's profile
    Profile,
    /// Show the watchlist for one media kind
    List { kind: MediaKind },
    /// Search the catalog
    Search {
        query: String,
        #[arg(long, default_value = "anime")]
        kind: MediaKind,
    },
    /// Follow relations
    Follow {
        #[command(subcommand)]
        action: FollowAction,
    },
}

#[derive(Subcommand, Debug)]
enum FollowAction {
    /// List follow relations and pending requests
    Show,
    /// Follow a user
    Add { user_id: i64 },
    /// Ask to follow a private account
    Request { user_id: i64 },
    /// Stop following a user, or withdraw a request
    Remove { user_id: i64 },
    /// Accept a pending follow request
    Accept { user_id: i64 },
    /// Decline a pending follow request
    Decline { user_id: i64 },
}

#[derive(Subcommand, Debug)]
enum RankAction {
    /// Print the ranking, merged with the currently tracked items
    Show { kind: MediaKind },
    /// Reconcile the saved ranking with the currently tracked items
    Sync { kind: MediaKind },
    /// Move the item at position FROM to position TO (1-based)
    Move {
        kind: MediaKind,
        from: usize,
        to: usize,
        /// Keep the new order on this machine only
        #[arg(long)]
        local: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if args.config.is_none() || args.store.is_none() {
        prepare_config_dir(&config_dir)?;
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let store_path = args
        .store
        .clone()
        .unwrap_or_else(|| config_dir.join("store.db"));
    let store_path_str = store_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in store path"))?;
    let store = match SqliteStore::open(store_path_str).await {
        Ok(store) => store,
        Err(StorageError::Locked) => {
            eprintln!(
                "Error: Another instance of anilog appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open local store: {}", e));
        }
    };

    let client = config
        .http_client()
        .context("Failed to build HTTP client")?;
    let gateway = AuthGateway::new(client.clone(), config.api_base_url.clone(), store.clone());

    match args.command {
        Command::Login { user } => login(&gateway, &user).await,
        Command::Logout => {
            gateway.logout().await.context("Failed to clear session")?;
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami => {
            match gateway.session().await.context("Failed to read session")? {
                Some(session) => println!("Logged in as user {}", session.user_id()),
                None => println!("Not logged in."),
            }
            Ok(())
        }
        Command::Discover { kind, refresh } => {
            let cache = DiscoveryCache::with_ttl(store, config.discover_cache_ttl_ms());
            let feed = DiscoverFeed::new(client, config.api_base_url.clone(), cache)
                .with_list_limit(config.discover_list_limit)
                .with_concurrency(config.discover_concurrency);
            discover(&feed, kind, refresh).await;
            Ok(())
        }
        Command::Get { path } => get(&gateway, &path).await,
        Command::Rank { action } => rank(&gateway, RankingBook::new(store), action).await,
        Command::Profile => profile(&gateway).await,
        Command::List { kind } => watchlist(&gateway, kind).await,
        Command::Search { query, kind } => {
            search(&client, &config.api_base_url, &SearchQuery::new(query, kind)).await
        }
        Command::Follow { action } => follow(&gateway, action).await,
    }
}

async fn login(gateway: &AuthGateway<SqliteStore>, user: &str) -> Result<()> {
    let password = match std::env::var("ANILOG_PASSWORD") {
        Ok(password) => password,
        Err(_) => {
            eprint!("Password: ");
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    match gateway.login(user, &password).await {
        Ok(session) => {
            println!("Logged in as user {}", session.user_id());
            Ok(())
        }
        Err(LoginError::Rejected(message)) => {
            eprintln!("Error: {message}");
            std::process::exit(1);
        }
        Err(e) => Err(e).context("Login failed"),
    }
}

async fn discover(feed: &DiscoverFeed<SqliteStore>, kind: Option<MediaKind>, refresh: bool) {
    let (data, freshness) = feed.load(refresh).await;
    if data.is_empty() {
        eprintln!("No discovery data available. Is the API reachable?");
        return;
    }
    if freshness == Freshness::Cached {
        println!("(cached; use --refresh to reload)");
    }

    let kinds: Vec<MediaKind> = match kind {
        Some(kind) => vec![kind],
        None => MediaKind::ALL.to_vec(),
    };
    for kind in kinds {
        let buckets = data.buckets(kind);
        for category in Category::ALL {
            let items = buckets.get(category);
            if items.is_empty() {
                continue;
            }
            println!("\n{} {}", category.label(), kind);
            for item in items {
                match item.score_out_of_ten() {
                    Some(score) => println!("  {:>5.1}  {}", score, item.display_title()),
                    None => println!("      -  {}", item.display_title()),
                }
            }
        }
    }
}

async fn get(gateway: &AuthGateway<SqliteStore>, path: &str) -> Result<()> {
    let outcome = gateway
        .send(&ApiRequest::get(path))
        .await
        .with_context(|| format!("Request to {path} failed"))?;

    match outcome {
        Outcome::Completed(response) => {
            if !response.is_success() {
                eprintln!("HTTP {}", response.status());
            }
            println!("{}", response.text());
            Ok(())
        }
        Outcome::Unauthorized(_) | Outcome::SessionMissing => {
            eprintln!("Session expired. Run `anilog login <user>` again.");
            std::process::exit(1);
        }
    }
}

async fn rank(
    gateway: &AuthGateway<SqliteStore>,
    book: RankingBook<SqliteStore>,
    action: RankAction,
) -> Result<()> {
    match action {
        RankAction::Show { kind } => {
            let items = tracked_items(gateway, kind).await?;
            let ids: Vec<i64> = items.iter().map(|item| item.id).collect();
            let order = book
                .sync(kind, &ids)
                .await
                .context("Failed to save ranking order")?;
            print_ranking(&order, &items);
        }
        RankAction::Sync { kind } => {
            let items = tracked_items(gateway, kind).await?;
            let ids: Vec<i64> = items.iter().map(|item| item.id).collect();
            let order = book
                .sync(kind, &ids)
                .await
                .context("Failed to save ranking order")?;
            println!("Ranking for {kind} has {} items.", order.len());
        }
        RankAction::Move {
            kind,
            from,
            to,
            local,
        } => {
            let (Some(from), Some(to)) = (from.checked_sub(1), to.checked_sub(1)) else {
                anyhow::bail!("Positions start at 1");
            };
            let before = book.load(kind).await.context("Failed to read ranking order")?;
            let after = book
                .move_item(kind, from, to)
                .await
                .context("Failed to save ranking order")?;
            if after == before {
                println!("Ranking unchanged.");
            } else {
                for (position, id) in after.iter().enumerate() {
                    println!("{:>3}. #{}", position + 1, id);
                }
                if !local {
                    push_ranking(gateway, kind, &after).await?;
                }
            }
        }
    }
    Ok(())
}

/// Share the new order through the profile. The local copy is already saved,
/// so a failed push only warns.
async fn push_ranking(
    gateway: &AuthGateway<SqliteStore>,
    kind: MediaKind,
    order: &[i64],
) -> Result<()> {
    let Some(session) = gateway.session().await.context("Failed to read session")? else {
        println!("(saved locally; log in to share it with your profile)");
        return Ok(());
    };
    if let Err(e) = api::push_ranking(gateway, &session, kind, order).await {
        tracing::warn!(kind = %kind, error = %e, "Failed to push ranking order");
        eprintln!("Warning: ranking saved locally but not pushed to your profile: {e}");
    }
    Ok(())
}

async fn require_session(gateway: &AuthGateway<SqliteStore>) -> Result<Session> {
    match gateway.session().await.context("Failed to read session")? {
        Some(session) => Ok(session),
        None => {
            eprintln!("Not logged in. Run `anilog login <user>` first.");
            std::process::exit(1);
        }
    }
}

/// Exit with a re-login hint when the session is gone, otherwise attach
/// `what` to the error.
fn api_result<T>(result: Result<T, ApiError>, what: &'static str) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(ApiError::LoginRequired) => {
            eprintln!("Session expired. Run `anilog login <user>` again.");
            std::process::exit(1);
        }
        Err(e) => Err(e).context(what),
    }
}

async fn profile(gateway: &AuthGateway<SqliteStore>) -> Result<()> {
    let session = require_session(gateway).await?;
    let profile = api_result(
        api::fetch_profile(gateway, &session).await,
        "Failed to fetch profile",
    )?;

    println!(
        "{} (user {})",
        profile.username.as_deref().unwrap_or("(no username)"),
        profile.id
    );
    if let Some(bio) = profile.bio.as_deref().filter(|bio| !bio.trim().is_empty()) {
        println!("  {bio}");
    }
    if let Some(age) = profile.age {
        println!("  Age: {age}");
    }
    if !profile.favorite_genres.is_empty() {
        println!("  Favorite genres: {}", profile.favorite_genres.join(", "));
    }
    for (label, value) in [
        ("Favorite anime", &profile.favorite_anime),
        ("Favorite manga", &profile.favorite_manga),
    ] {
        if let Some(value) = value {
            println!("  {label}: {value}");
        }
    }
    Ok(())
}

async fn watchlist(gateway: &AuthGateway<SqliteStore>, kind: MediaKind) -> Result<()> {
    let session = require_session(gateway).await?;
    let items = api_result(
        api::fetch_watchlist(gateway, &session, kind).await,
        "Failed to fetch watchlist",
    )?;

    if items.is_empty() {
        println!("Your {kind} watchlist is empty.");
    }
    for item in items {
        let id = item.anilist_id.unwrap_or(item.id);
        println!("  {:>7}  {}", id, item.title.as_deref().unwrap_or("Untitled"));
    }
    Ok(())
}

async fn search(client: &reqwest::Client, base_url: &str, query: &SearchQuery) -> Result<()> {
    let items = api::search(client, base_url, query)
        .await
        .with_context(|| format!("Search for '{}' failed", query.query))?;

    if items.is_empty() {
        println!("No results.");
    }
    for item in items {
        match item.score_out_of_ten() {
            Some(score) => println!("  {:>7}  {:>5.1}  {}", item.id, score, item.display_title()),
            None => println!("  {:>7}      -  {}", item.id, item.display_title()),
        }
    }
    Ok(())
}

async fn follow(gateway: &AuthGateway<SqliteStore>, action: FollowAction) -> Result<()> {
    let session = require_session(gateway).await?;
    let me = session.user_id();

    let done = match action {
        FollowAction::Show => {
            let relations = api_result(
                api::follow_statuses(gateway, &session).await,
                "Failed to fetch follow statuses",
            )?;
            if relations.is_empty() {
                println!("No follow relations.");
            }
            for relation in relations {
                let line = match (relation.status, relation.follower_id == me) {
                    (FollowStatus::Following, true) => format!("following {}", relation.followee_id),
                    (FollowStatus::Following, false) => format!("followed by {}", relation.follower_id),
                    (FollowStatus::Requested, true) => format!("requested {}", relation.followee_id),
                    (FollowStatus::Requested, false) => {
                        format!("request from {}", relation.follower_id)
                    }
                    (FollowStatus::Unknown, _) => continue,
                };
                println!("  {line}");
            }
            return Ok(());
        }
        FollowAction::Add { user_id } => api::follow(gateway, &session, user_id)
            .await
            .map(|()| format!("Following user {user_id}.")),
        FollowAction::Request { user_id } => api::request_follow(gateway, &session, user_id)
            .await
            .map(|()| format!("Follow request sent to user {user_id}.")),
        FollowAction::Remove { user_id } => api::unfollow(gateway, &session, user_id)
            .await
            .map(|()| format!("No longer following user {user_id}.")),
        FollowAction::Accept { user_id } => api::accept_request(gateway, &session, user_id)
            .await
            .map(|()| format!("Accepted request from user {user_id}.")),
        FollowAction::Decline { user_id } => api::decline_request(gateway, &session, user_id)
            .await
            .map(|()| format!("Declined request from user {user_id}.")),
    };

    println!("{}", api_result(done, "Follow update failed")?);
    Ok(())
}

async fn tracked_items(
    gateway: &AuthGateway<SqliteStore>,
    kind: MediaKind,
) -> Result<Vec<TrackedItem>> {
    let session = require_session(gateway).await?;
    match fetch_tracked(gateway, &session, kind).await {
        Ok(items) => Ok(items),
        Err(TrackedError::LoginRequired) => {
            eprintln!("Session expired. Run `anilog login <user>` again.");
            std::process::exit(1);
        }
        Err(e) => Err(e).context("Failed to fetch tracked items"),
    }
}

fn print_ranking(order: &[i64], items: &[TrackedItem]) {
    if order.is_empty() {
        println!("Nothing tracked yet.");
        return;
    }
    for (position, id) in order.iter().enumerate() {
        let item = items.iter().find(|item| item.id == *id);
        let title = item.map_or_else(|| format!("#{id}"), TrackedItem::display_title);
        let progress = item.and_then(TrackedItem::progress).unwrap_or_default();
        let status = item
            .and_then(|item| item.status.as_deref())
            .unwrap_or_default();
        println!("{:>3}. {}  {} {}", position + 1, title, status, progress);
    }
}
