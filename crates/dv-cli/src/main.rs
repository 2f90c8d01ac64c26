//! delve: generate, explore and list procedural dungeons
//!
//! `play` drives a single local session from stdin. Each line is an intent
//! (`move up`, `attack`, `confirm`, ...); prefix it with `@<id>` to act as
//! another player.

mod report;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dv_core::config::DelveConfig;
use dv_core::dungeon::{
    ComplexityTier, DifficultyTier, DungeonGenerator, DungeonParams, FloorCountTier, SizeTier,
};
use dv_core::{PlayerId, SessionId};
use dv_render::RenderOptions;
use dv_save::{FileStore, SaveError, SnapshotStore};
use dv_session::{ConfigError, Intent, Reply, SessionError, SessionManager};

#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(author, version, about = "Procedural multi-floor dungeons", long_about = None)]
struct Args {
    /// Config file (default: ./delve.toml, then the user config directory)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Snapshot directory, overriding the config
    #[arg(long = "save-dir")]
    save_dir: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct Tiers {
    #[arg(long, default_value = "MEDIUM")]
    size: SizeTier,
    #[arg(long, default_value = "NORMAL")]
    complexity: ComplexityTier,
    #[arg(long, default_value = "SMALL")]
    floors: FloorCountTier,
    #[arg(long, default_value = "NORMAL")]
    difficulty: DifficultyTier,
}

impl From<Tiers> for DungeonParams {
    fn from(t: Tiers) -> Self {
        DungeonParams::new(t.size, t.complexity, t.floors, t.difficulty)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a dungeon and print every floor
    Generate {
        #[command(flatten)]
        tiers: Tiers,

        /// Seed for a reproducible dungeon
        #[arg(short = 's', long)]
        seed: Option<u64>,

        /// Custom dungeon name
        #[arg(short = 'n', long)]
        name: Option<String>,

        /// Write `floor_<n>.png` images (unfogged) into this directory
        #[arg(long)]
        png: Option<PathBuf>,

        /// Also store the dungeon as a snapshot
        #[arg(long)]
        save: bool,
    },
    /// Explore a dungeon interactively from stdin
    Play {
        /// Session key
        #[arg(long, default_value = "local")]
        session: String,

        /// Player id used for lines without an `@id` prefix
        #[arg(short = 'p', long, default_value = "1")]
        player: String,

        /// Seed for dungeons and encounter rolls
        #[arg(short = 's', long)]
        seed: Option<u64>,

        /// Show the whole map instead of fogging unseen cells
        #[arg(long)]
        no_fog: bool,

        /// Rewrite this PNG with the current view after every command
        #[arg(long)]
        png: Option<PathBuf>,
    },
    /// List saved dungeons
    Saves {
        /// Delete this dungeon's snapshot instead
        #[arg(long)]
        delete: Option<String>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Render(#[from] dv_render::RenderError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<DelveConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => dv_session::load_config(path)?,
        None => dv_session::discover_config()?,
    };
    if let Some(dir) = &args.save_dir {
        config.save.dir = Some(dir.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let config = load_config(&args)?;

    match args.command {
        Command::Generate {
            tiers,
            seed,
            name,
            png,
            save,
        } => generate(&config, tiers.into(), seed, name.as_deref(), png, save),
        Command::Play {
            session,
            player,
            seed,
            no_fog,
            png,
        } => play(config, SessionId::new(session), PlayerId::new(player), seed, !no_fog, png).await,
        Command::Saves { delete } => saves(&config, delete),
    }
}

fn generate(
    config: &DelveConfig,
    params: DungeonParams,
    seed: Option<u64>,
    name: Option<&str>,
    png: Option<PathBuf>,
    save: bool,
) -> Result<(), CliError> {
    let mut generator = match seed {
        Some(seed) => DungeonGenerator::with_seed(seed),
        None => DungeonGenerator::new(),
    };
    let dungeon = generator.generate_at(params, name, Utc::now());
    println!("{} ({}), seed {}", dungeon.name, dungeon.id, generator.seed());
    for floor in &dungeon.floors {
        println!("\nFloor {}/{}", floor.number + 1, dungeon.floor_count());
        print!("{}", floor.ascii());
    }

    if let Some(dir) = png {
        std::fs::create_dir_all(&dir)?;
        let options = RenderOptions {
            cell_size: config.render.cell_size,
            fog: false,
            radius: 0,
        };
        for index in 0..dungeon.floor_count() {
            let bytes = dv_render::encode_png(&dv_render::render(&dungeon, index, &options))?;
            let path = dir.join(format!("floor_{}.png", index + 1));
            std::fs::write(&path, bytes)?;
            info!(path = %path.display(), "wrote floor image");
        }
    }

    if save {
        let header = FileStore::from_config(&config.save).save(&dungeon)?;
        println!("\nSaved {}", report::save(&header));
    }
    Ok(())
}

fn saves(config: &DelveConfig, delete: Option<String>) -> Result<(), CliError> {
    let store = FileStore::from_config(&config.save);
    if let Some(id) = delete {
        store.delete(&dv_core::DungeonId::new(id))?;
        println!("Deleted.");
        return Ok(());
    }
    let list = store.list()?;
    if list.is_empty() {
        println!("No saved dungeons in {}.", store.dir().display());
    }
    for header in &list {
        println!("{}", report::save(header));
    }
    Ok(())
}

/// Split an optional `@player` prefix off a line
fn split_player<'a>(line: &'a str, default: &PlayerId) -> (PlayerId, &'a str) {
    let line = line.trim();
    match line.strip_prefix('@') {
        Some(rest) => {
            let (id, rest) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            (PlayerId::new(id), rest.trim())
        }
        None => (default.clone(), line),
    }
}

async fn play(
    config: DelveConfig,
    key: SessionId,
    me: PlayerId,
    seed: Option<u64>,
    fog: bool,
    png: Option<PathBuf>,
) -> Result<(), CliError> {
    let store = Arc::new(FileStore::from_config(&config.save));
    let manager = Arc::new(match seed {
        Some(seed) => SessionManager::with_seed(config, store, seed),
        None => SessionManager::new(config, store),
    });
    let auto_save = manager.spawn_auto_save();

    let mut events = manager.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Some(text) = report::event(&event) {
                println!("! {text}");
            }
        }
    });

    println!("Commands: create [size complexity floors difficulty [name]], join, leave,");
    println!("  move <dir> (or up/down/left/right), roll, attack, defend, flee, confirm,");
    println!("  cancel, end, save, load <id>, saves, status, map, exit. Prefix @id to switch player.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let (player, text) = split_player(&line, &me);
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("q") {
            break;
        }
        if text.eq_ignore_ascii_case("map") {
            show_map(&manager, &key, fog).await;
            continue;
        }
        let intent: Intent = match text.parse() {
            Ok(intent) => intent,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        debug!(player = %player, ?intent, "dispatch");
        let refresh = matches!(
            intent,
            Intent::Move(_) | Intent::Create { .. } | Intent::Join | Intent::Load(_) | Intent::Confirm
        );
        match manager.dispatch(&key, &player, intent).await {
            Ok(reply) => {
                println!("{}", report::reply(&reply));
                if refresh && !matches!(reply, Reply::Ended) {
                    show_map(&manager, &key, fog).await;
                }
            }
            Err(e) => println!("{e}"),
        }
        if let Some(path) = &png {
            if let Ok(bytes) = manager.render_png(&key).await {
                std::fs::write(path, bytes)?;
            }
        }
    }

    manager.shutdown().await;
    if let Some(task) = auto_save {
        task.abort();
    }
    printer.abort();
    Ok(())
}

async fn show_map(manager: &SessionManager, key: &SessionId, fog: bool) {
    let radius = manager.config().fog.radius;
    match manager.dungeon(key).await {
        Ok(dungeon) => print!("{}", report::map(&dungeon, radius, fog && manager.config().fog.enabled)),
        Err(e) => println!("{e}"),
    }
}
