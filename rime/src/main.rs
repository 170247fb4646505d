use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use rimebridge::NativeEngine;
use rimebridge_core::{Bridge, BridgeOptions, EngineApi, Traits};

#[derive(Parser)]
#[command(name = "rimebridge", about = "Interactive console for the engine session bridge")]
struct Args {
    /// Path to the engine shared library (defaults to the platform name).
    #[arg(long)]
    library: Option<PathBuf>,

    /// TOML file holding the traits descriptor.
    #[arg(long)]
    traits: Option<PathBuf>,

    /// User config probed for the inline-ASCII switch key.
    #[arg(long, default_value = "default")]
    ascii_config: String,
}

fn load_traits(path: Option<&Path>) -> Result<Traits> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read traits file {path:?}"))?;
            toml::from_str(&text).with_context(|| format!("cannot parse traits file {path:?}"))
        }
        None => Ok(Traits::new()),
    }
}

fn show_context<E: EngineApi>(bridge: &Bridge<E>, session: rimebridge_core::SessionId) {
    match bridge.context(session) {
        Some(context) => {
            println!("  preedit: {}", context.composition.preedit);
            for (i, candidate) in context.menu.candidates.iter().enumerate() {
                match &candidate.comment {
                    Some(comment) => println!("  {}. {} ({comment})", i + 1, candidate.text),
                    None => println!("  {}. {}", i + 1, candidate.text),
                }
            }
        }
        None => println!("  (no composition)"),
    }
}

fn drain_notifications<E: EngineApi>(bridge: &Bridge<E>) {
    for note in bridge.notifications().drain() {
        println!("  [{}] {}", note.message_type, note.message_value);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let traits = load_traits(args.traits.as_deref())?;

    let engine = NativeEngine::load(args.library.as_deref())?;
    println!("Initializing engine (maintenance may take a while)...");
    let bridge = Bridge::init(
        engine,
        BridgeOptions {
            ascii_switch_config: args.ascii_config,
        },
        &traits,
    )?;

    let session = bridge.create_session();
    anyhow::ensure!(session.is_valid(), "engine refused to create a session");
    if let Some(schema) = bridge.current_schema(session) {
        println!("Session {session} ready, schema: {schema}");
    }
    println!(
        "Type to compose. Commands: !schemas, !schema <id>, !commit, !clear, !ascii, !context, !quit"
    );
    println!();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input.split_once(' ').map_or((input, ""), |(a, b)| (a, b)) {
            ("!quit", _) => break,
            ("!schemas", _) => {
                if let Some(list) = bridge.schema_list() {
                    for entry in list {
                        println!("  {} - {}", entry.schema_id, entry.name);
                    }
                }
            }
            ("!schema", id) => {
                println!("  select {}: {}", id, bridge.select_schema(session, id));
            }
            ("!commit", _) => {
                if bridge.commit_composition(session) {
                    if let Some(commit) = bridge.commit(session) {
                        println!("  committed: {}", commit.text);
                    }
                }
            }
            ("!clear", _) => {
                bridge.clear_composition(session);
                println!("  cleared");
            }
            ("!ascii", _) => match bridge.inline_ascii(session) {
                Some(binding) => println!("  toggled via {binding}"),
                None => println!("  no inline-ASCII switch key bound"),
            },
            ("!context", _) => {
                if let Some(context) = bridge.context(session) {
                    println!("{}", serde_json::to_string_pretty(&context.to_value())?);
                }
            }
            _ => {
                for byte in input.bytes() {
                    bridge.process_key(session, i32::from(byte), 0);
                }
                show_context(&bridge, session);
            }
        }
        drain_notifications(&bridge);
    }

    bridge.destroy_session(session);
    bridge.finalize();
    Ok(())
}
