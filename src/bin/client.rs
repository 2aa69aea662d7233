//! parlor-client binary
//!
//! Headless room client: connects, optionally logs in, joins a room, loads
//! a template, and prints the semantic event stream. Rendering belongs to
//! the embedding application; this binary stands in for it on a terminal.
//!
//! ## Configuration (flags / env, plus optional `parlor.toml`)
//!
//! | Key / flag            | Default               | Description              |
//! |-----------------------|-----------------------|--------------------------|
//! | `PARLOR_SERVER_URL`   | `ws://localhost:9001` | Room server websocket    |
//! | `PARLOR_USERNAME`     | `You`                 | Self player name         |
//! | `PARLOR_ROOM`         | `Lobby`               | Room joined on connect   |
//! | `PARLOR_PASSWORD`     | *(none)*              | Send `/login` when set   |
//! | `--template <id>`     | first advertised      | Room template to load    |

use anyhow::Result;
use clap::Parser;

use parlor::{ClientConfig, ClientEvent, RoomClient, TilePoint};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "parlor-client", about = "Parlor room client", version)]
struct Args {
    /// Room server websocket URL
    #[arg(long, env = "PARLOR_SERVER_URL")]
    server_url: Option<String>,

    /// Self player username
    #[arg(long, env = "PARLOR_USERNAME")]
    username: Option<String>,

    /// Room to join on connect
    #[arg(long, env = "PARLOR_ROOM")]
    room: Option<String>,

    /// Password for /login (legacy auth)
    #[arg(long, env = "PARLOR_PASSWORD")]
    password: Option<String>,

    /// Room template id to load (defaults to the first advertised one)
    #[arg(long)]
    template: Option<i64>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("parlor=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut config = load_config()?;
    if let Some(url) = args.server_url {
        config.server_url = url;
    }
    if let Some(username) = args.username {
        config.username = username;
    }
    if let Some(room) = args.room {
        config.room = room;
    }

    log::info!(
        "Starting parlor-client (server='{}', user='{}', room='{}')",
        config.server_url,
        config.username,
        config.room,
    );

    let room = config.room.clone();
    let username = config.username.clone();
    let (client, mut events) = RoomClient::connect(config).await?;

    if let Some(password) = &args.password {
        client.login(&username, password);
    }

    // Same bootstrap the game UI performs: spawn the avatar, join the
    // configured room, then load a template.
    client.spawn_self(TilePoint::new(3, 7));
    client.join_room(&room);

    let template_id = match args.template {
        Some(id) => Some(id),
        None => match client.fetch_room_templates().await {
            Ok(templates) if !templates.is_empty() => {
                log::info!("server advertises {} templates", templates.len());
                Some(templates[0].id)
            }
            Ok(_) => {
                log::warn!("server advertised no room templates");
                None
            }
            Err(e) => {
                log::warn!("failed to fetch room templates: {e}");
                None
            }
        },
    };
    if let Some(id) = template_id {
        if let Err(e) = client.load_room_template(id).await {
            log::warn!("failed to load room template {id}: {e}");
        }
    }

    // -----------------------------------------------------------------------
    // Event loop — print the stream the renderer would consume
    // -----------------------------------------------------------------------

    loop {
        tokio::select! {
            maybe = events.recv() => match maybe {
                Some(ClientEvent::Disconnected { reason }) => {
                    log::warn!("disconnected: {reason}");
                    break;
                }
                Some(ClientEvent::Chat { from, text }) => {
                    println!("[chat] {from}: {text}");
                }
                Some(ClientEvent::Status { line }) => {
                    println!("[server] {line}");
                }
                Some(event) => {
                    log::info!("{event:?}");
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down (SIGINT)");
                break;
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Config layering
// ---------------------------------------------------------------------------

/// Optional `parlor.toml` + `PARLOR_*` environment over built-in defaults.
/// CLI flags override the result afterwards.
fn load_config() -> Result<ClientConfig> {
    let raw = config::Config::builder()
        .add_source(config::File::with_name("parlor").required(false))
        .add_source(config::Environment::with_prefix("PARLOR").try_parsing(true))
        .build()?;
    Ok(match raw.try_deserialize() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("unreadable config – using defaults: {e}");
            ClientConfig::default()
        }
    })
}
