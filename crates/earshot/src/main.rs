mod logging;

use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Input, Password, theme::ColorfulTheme};
use earshot_api::{EarshotClient, FeedPost, FeedType, PostSummary, Profile, Session};
use earshot_config::{
    CONFIG_KEYS, EarshotConfig, clear_session, config_path, get_config_value, load_config,
    load_config_from, open_in_editor, persist_device_id, resolve_base_url, resolve_retries,
    resolve_simple_output, resolve_timeout_secs, resolve_token, save_config_to, set_config_value,
};
use earshot_core::{EarshotError, EarshotResult, ParsedMusicUrl};
use earshot_music::{TrackResolver, classify, extract_url_from_text};
use tracing::debug;

const INVALID_LINK: &str = "enter a valid Spotify, Apple Music or YouTube link";

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    #[command(flatten)]
    Action(Action),
}

/// Everything that runs against a loaded config.
#[derive(Subcommand, Debug)]
enum Action {
    /// Classify a link (or shared text containing one) and print its canonical URL
    Parse { text: Vec<String> },
    /// Look up title, artist and artwork for a track link
    Preview { url: String },
    /// Log in with this device, or with a username and password
    Login {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: bool,
    },
    /// Forget the stored session token
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Show the latest shared tracks
    Feed {
        #[arg(long)]
        following: bool,
    },
    /// Share a track link
    Post { text: Vec<String> },
    /// Delete one of your posts
    Delete { id: i64 },
    /// Save a post to your crate
    Save { id: i64 },
    /// Remove a post from your crate
    Unsave { id: i64 },
    /// Show a user's profile (defaults to you)
    Profile { username: Option<String> },
    /// Follow or unfollow a user by id
    Follow { user_id: i64 },
    /// Change your username
    Rename { username: String },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Open config file in editor
    Edit,
}

#[derive(Debug, Parser)]
#[command(name = "earshot")]
#[command(version, about = "Share music links with your friends", long_about = None)]
struct Cli {
    /// Print bare URLs only
    #[arg(long, global = true)]
    simple: bool,
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    logging::init_logging();
    let cli = Cli::parse();

    let action = match cli.command {
        Commands::Config { action } => {
            if let Err(err) = handle_config_command(action) {
                eprintln!("{} {err}", style("Error:").red());
                std::process::exit(1);
            }
            return;
        }
        Commands::Action(action) => action,
    };

    let path = match config_path() {
        Ok(path) => path,
        Err(err) => {
            eprintln!("{} {err}", style("Error:").red());
            std::process::exit(1);
        }
    };
    let mut config = match load_config_from(&path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{} {err}", style("Error:").red());
            std::process::exit(1);
        }
    };
    let simple = cli.simple || resolve_simple_output(&config).unwrap_or(false);

    if let Err(err) = run(action, &mut config, &path, simple).await {
        if handle_unauthorized(&err, &mut config, &path) {
            eprintln!("{} stored session cleared", style("Note:").yellow());
        }
        eprintln!("{} {err}", style("Error:").red());
        std::process::exit(1);
    }
}

async fn run(
    action: Action,
    config: &mut EarshotConfig,
    path: &Path,
    simple: bool,
) -> EarshotResult<()> {
    match action {
        Action::Parse { text } => {
            let text = gather_text(text)?;
            let parsed = classify(&extract_url_from_text(Some(&text)));
            print_parsed(&parsed, simple);
            if parsed.is_valid() {
                Ok(())
            } else {
                Err(EarshotError::UnsupportedInput(INVALID_LINK.to_string()))
            }
        }
        Action::Preview { url } => {
            let info = TrackResolver::new()?.resolve(&url).await?;
            if simple {
                println!("{}", info.embed_url);
                return Ok(());
            }
            println!("{} {}", style(info.platform.label()).cyan(), info.title);
            println!("  {} {}", style("Artist:").dim(), info.artist);
            println!("  {} {}", style("Embed:").dim(), info.embed_url);
            if !info.thumbnail.is_empty() {
                println!("  {} {}", style("Artwork:").dim(), info.thumbnail);
            }
            Ok(())
        }
        Action::Login { username, password } => login(config, path, username, password).await,
        Action::Logout => {
            forget_session(config, path);
            println!("{} Logged out", style("✓").green());
            Ok(())
        }
        Action::Whoami => {
            let user = authed_client(config)?.me().await?;
            if config.session.username.as_deref() != Some(user.username.as_str()) {
                config.session.username = Some(user.username.clone());
                save_config_to(path, config)?;
            }
            println!("{}", user.username);
            Ok(())
        }
        Action::Feed { following } => {
            let feed_type = if following {
                FeedType::Following
            } else {
                FeedType::Global
            };
            let posts = authed_client(config)?.feed(feed_type).await?;
            if posts.is_empty() {
                println!("{}", style("No posts yet.").dim());
            }
            for post in &posts {
                print_post(post, simple);
            }
            Ok(())
        }
        Action::Post { text } => {
            let text = gather_text(text)?;
            let post = post_shared_text(&authed_client(config)?, &text).await?;
            if simple {
                println!("{}", post.id);
            } else {
                let artist = post.artist.as_deref().unwrap_or("Unknown artist");
                println!(
                    "{} {} / {} (#{})",
                    style("Posted!").green(),
                    post.title,
                    artist,
                    post.id
                );
            }
            Ok(())
        }
        Action::Delete { id } => {
            authed_client(config)?.delete_post(id).await?;
            println!("{} Deleted post #{id}", style("✓").green());
            Ok(())
        }
        Action::Save { id } => {
            let saved = authed_client(config)?.save_to_crate(id).await?;
            print_crate_result("Saved to crate", id, saved.save_count);
            Ok(())
        }
        Action::Unsave { id } => {
            let removed = authed_client(config)?.remove_from_crate(id).await?;
            print_crate_result("Removed from crate", id, removed.save_count);
            Ok(())
        }
        Action::Profile { username } => {
            let client = authed_client(config)?;
            let username = match username.or_else(|| config.session.username.clone()) {
                Some(username) => username,
                None => client.me().await?.username,
            };
            let profile = client.profile(&username).await?;
            print_profile(&profile, simple);
            Ok(())
        }
        Action::Follow { user_id } => {
            let response = authed_client(config)?.follow(user_id).await?;
            let status = match (response.status.as_deref(), response.following) {
                (Some(status), _) => status.to_string(),
                (None, Some(true)) => "followed".to_string(),
                (None, Some(false)) => "unfollowed".to_string(),
                (None, None) => "done".to_string(),
            };
            println!("{} {status}", style("✓").green());
            Ok(())
        }
        Action::Rename { username } => {
            let user = authed_client(config)?.update_username(&username).await?;
            config.session.username = Some(user.username.clone());
            save_config_to(path, config)?;
            println!("{} You are now @{}", style("✓").green(), user.username);
            Ok(())
        }
    }
}

/// Pulls the link out of shared text and posts its canonical form.
async fn post_shared_text(client: &EarshotClient, text: &str) -> EarshotResult<PostSummary> {
    let parsed = classify(&extract_url_from_text(Some(text)));
    if !parsed.is_valid() {
        return Err(EarshotError::InvalidInput(INVALID_LINK.to_string()));
    }
    debug!(platform = %parsed.platform(), url = parsed.url(), "posting track");
    client.post_track(parsed.url()).await
}

fn gather_text(args: Vec<String>) -> EarshotResult<String> {
    if !args.is_empty() {
        return Ok(args.join(" "));
    }

    if io::stdin().is_terminal() {
        return Err(EarshotError::InvalidInput(
            "no link provided, pass it as an argument or pipe it in".to_string(),
        ));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|err| EarshotError::InvalidInput(format!("failed to read stdin: {err}")))?;
    Ok(buffer)
}

fn base_client(config: &EarshotConfig) -> EarshotResult<EarshotClient> {
    let client = EarshotClient::new(
        resolve_base_url(config),
        Duration::from_secs(resolve_timeout_secs(config)),
    )?;
    Ok(client.with_retries(resolve_retries(config), Duration::from_secs(1)))
}

fn authed_client(config: &EarshotConfig) -> EarshotResult<EarshotClient> {
    let token = resolve_token(config).ok_or_else(|| {
        EarshotError::Config("not logged in, run `earshot login` first".to_string())
    })?;
    Ok(base_client(config)?.with_token(Some(token)))
}

async fn login(
    config: &mut EarshotConfig,
    path: &Path,
    username: Option<String>,
    ask_password: bool,
) -> EarshotResult<()> {
    let mut client = base_client(config)?;
    let theme = ColorfulTheme::default();

    if ask_password {
        let username = match username {
            Some(username) => username,
            None => Input::with_theme(&theme)
                .with_prompt("Username")
                .interact_text()
                .map_err(|err| EarshotError::InvalidInput(format!("prompt failed: {err}")))?,
        };
        let password = Password::with_theme(&theme)
            .with_prompt("Password")
            .interact()
            .map_err(|err| EarshotError::InvalidInput(format!("prompt failed: {err}")))?;
        let session = client.login_credentials(&username, &password).await?;
        store_session(config, path, session)?;
    } else {
        let username = username.or_else(|| prompt_optional_username(&theme));
        login_with_device(&mut client, config, path, username.as_deref()).await?;
    }

    match &config.session.username {
        Some(username) => println!("{} Logged in as @{username}", style("✓").green()),
        None => println!("{} Logged in", style("✓").green()),
    }
    Ok(())
}

/// The device id is written before the request goes out, so a login that
/// times out is retried with the same id.
async fn login_with_device(
    client: &mut EarshotClient,
    config: &mut EarshotConfig,
    path: &Path,
    username: Option<&str>,
) -> EarshotResult<()> {
    let device_id = persist_device_id(path, config)?;
    let session = client.login_device(&device_id, username).await?;
    store_session(config, path, session)
}

fn store_session(config: &mut EarshotConfig, path: &Path, session: Session) -> EarshotResult<()> {
    config.session.token = Some(session.token);
    if let Some(user) = session.user {
        config.session.username = Some(user.username);
    }
    save_config_to(path, config)
}

fn prompt_optional_username(theme: &ColorfulTheme) -> Option<String> {
    if !io::stdin().is_terminal() {
        return None;
    }
    let input: String = Input::with_theme(theme)
        .with_prompt("Username (optional, press Enter to skip)")
        .allow_empty(true)
        .interact_text()
        .unwrap_or_default();
    let trimmed = input.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn forget_session(config: &mut EarshotConfig, path: &Path) {
    clear_session(config);
    if let Err(err) = save_config_to(path, config) {
        eprintln!("{} {err}", style("Warning:").yellow());
    }
}

/// An expired token is dropped from the config. Returns whether that happened.
fn handle_unauthorized(err: &EarshotError, config: &mut EarshotConfig, path: &Path) -> bool {
    if !matches!(err, EarshotError::Unauthorized) {
        return false;
    }
    forget_session(config, path);
    true
}

fn handle_config_command(action: ConfigAction) -> EarshotResult<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = load_config()?;
            match get_config_value(&config, &key) {
                Some(v) => println!("{key} = {v}"),
                None => println!("{key} = <null>"),
            }
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            set_config_value(&key, &value)?;
            println!("{} Set {key} = {value}", style("✓").green());
            Ok(())
        }
        ConfigAction::List => {
            let config = load_config()?;
            println!("Current configuration:");
            let mut section = "";
            for &key in CONFIG_KEYS {
                let (table, _) = key.split_once('.').unwrap_or(("", key));
                if table != section {
                    println!("\n[{table}]");
                    section = table;
                }
                let value = match get_config_value(&config, key) {
                    Some(_) if key == "session.token" => "<hidden>".to_string(),
                    Some(value) => value,
                    None => "<null>".to_string(),
                };
                let name = key.rsplit('.').next().unwrap_or(key);
                println!("{name} = {value}");
            }
            Ok(())
        }
        ConfigAction::Edit => {
            open_in_editor()?;
            Ok(())
        }
    }
}

fn print_parsed(parsed: &ParsedMusicUrl, simple: bool) {
    if simple {
        if parsed.is_valid() {
            println!("{}", parsed.url());
        }
        return;
    }

    if parsed.is_valid() {
        println!("{} {}", style("Platform:").cyan(), parsed.platform().label());
        println!("{} {}", style("URL:").green(), parsed.url());
    } else {
        println!("{} {}", style("Platform:").red(), parsed.platform().label());
        if !parsed.url().is_empty() {
            println!("  {} {}", style("Input:").dim(), parsed.url());
        }
    }
}

fn print_post(post: &FeedPost, simple: bool) {
    if simple {
        println!("{}", post.url);
        return;
    }

    let artist = post.artist.as_deref().unwrap_or("Unknown artist");
    println!(
        "{} {} / {}",
        style(format!("#{}", post.id)).dim(),
        style(&post.title).bold(),
        artist
    );
    println!("  {} @{}", style("By:").dim(), post.username);
    println!("  {} {}", style("URL:").dim(), post.url);
    if let Some(count) = post.save_count {
        println!("  {} {count}", style("Saves:").dim());
    }
    println!();
}

fn print_profile(profile: &Profile, simple: bool) {
    if simple {
        for post in &profile.posts {
            println!("{}", post.url);
        }
        return;
    }

    println!("{}", style(format!("@{}", profile.username)).bold().green());
    println!("{}", profile.bio.as_deref().unwrap_or("No bio yet."));
    if let (Some(followers), Some(following)) = (profile.followers, profile.following) {
        println!(
            "{} followers | {} following",
            style(followers).bold(),
            style(following).bold()
        );
    }
    if profile.is_following == Some(true) {
        println!("{}", style("You follow this user").dim());
    }
    println!();
    for post in &profile.posts {
        print_post(post, false);
    }
}

fn print_crate_result(action: &str, id: i64, save_count: Option<u64>) {
    match save_count {
        Some(count) => println!("{} {action}: #{id} ({count} saves)", style("✓").green()),
        None => println!("{} {action}: #{id}", style("✓").green()),
    }
}
