use anyhow::Result;
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use triptych::events::next_event;
use triptych::prelude::*;
use triptych::{ENGINE_NAME, VERSION as LIB_VERSION};

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct ShellHighlighter;

impl Highlighter for ShellHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.yellow().bold(), rest.yellow()))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    let rule = "-".repeat(72);
    println!("{}", "  T R I P T Y C H".cyan().bold());
    println!("{}", rule.dimmed());
    println!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!(
        "{}",
        "    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.".dimmed()
    );
    println!("{}", rule.dimmed());
}

/// Prints rotation events while `is_watching` is set. Other events always show.
fn spawn_event_listener(rotator: &Rotator, is_watching: Arc<AtomicBool>) {
    let mut event_rx = rotator.subscribe();
    tokio::spawn(async move {
        while let Some(event) = next_event(&mut event_rx).await {
            match event {
                RotationEvent::SlotRotated { rotation, .. } => {
                    if is_watching.load(Ordering::Relaxed) {
                        println!(
                            "<-- [ROTATION] Slot #{} -> {} (layer {:?})",
                            rotation.slot, rotation.image, rotation.layer
                        );
                    }
                }
                RotationEvent::ConfigApplied { .. } => {}
                other => println!("\n<-- [SYSTEM EVENT] {:?}", other),
            }
        }
    });
}

fn print_snapshot(snapshot: &Snapshot) {
    println!("Slots (fade {} ms):", snapshot.fade_ms);
    for (index, slot) in snapshot.slots.iter().enumerate() {
        let render = |layer: Layer| {
            let image = slot.layer(layer).unwrap_or("-");
            if slot.active() == layer {
                format!("[{:?}] {}", layer, image).green().bold().to_string()
            } else {
                format!(" {:?}  {}", layer, image).dimmed().to_string()
            }
        };
        println!("  Slot #{}: {}  |  {}", index, render(Layer::A), render(Layer::B));
    }
}

fn print_outcome(outcome: ApplyOutcome) {
    match outcome {
        ApplyOutcome::Applied(change) => println!(
            "--> Configuration applied (slots redrawn: {}, interval changed: {}).",
            change.reinitialized, change.interval_changed
        ),
        ApplyOutcome::Unchanged => println!("--> Configuration unchanged."),
        ApplyOutcome::Ignored => println!("--> Rotator is shut down."),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let settings = HostSettings::load(None).unwrap_or_else(|e| {
        warn!("{e}. Using default settings.");
        HostSettings::default()
    });
    let mut rotator = Rotator::new(&settings);

    let is_watching = Arc::new(AtomicBool::new(false));
    spawn_event_listener(&rotator, is_watching.clone());

    info!(
        "Loading {} into {}...",
        settings.config_source.display(),
        ENGINE_NAME.cyan()
    );
    print_outcome(rotator.reload(&settings.config_source).await);

    let mut rl = Editor::new()?;
    rl.set_helper(Some(ShellHighlighter));

    println!(
        "{} is running. Type 'help' for commands or 'exit' to quit.",
        ENGINE_NAME.cyan()
    );

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let args = line.split_whitespace().collect::<Vec<_>>();

                match args.first().copied().unwrap_or("") {
                    "show" => print_snapshot(&rotator.snapshot().await),
                    "config" => {
                        let config = rotator.display_config().await;
                        println!(
                            "Pool ({} images): {:?}",
                            config.pool.len(),
                            config.pool
                        );
                        println!(
                            "Interval: {} ms, fade: {} ms, rotating: {}",
                            config.rotation.interval_ms(),
                            config.rotation.fade_ms(),
                            rotator.is_rotating()
                        );
                    }
                    "tick" => match rotator.tick_now().await {
                        Some(rotation) => println!(
                            "--> Slot #{} now shows {} on layer {:?}.",
                            rotation.slot, rotation.image, rotation.layer
                        ),
                        None => println!("--> Nothing to rotate, the pool is empty."),
                    },
                    "load" => match args.get(1) {
                        Some(path) => print_outcome(rotator.reload(path).await),
                        None => println!("Usage: load <PATH>"),
                    },
                    "start" => {
                        if rotator.start_rotation().await {
                            println!("--> Rotation started.");
                        } else {
                            println!("--> Cannot start, the pool is empty.");
                        }
                    }
                    "stop" => {
                        if rotator.stop_rotation().await {
                            println!("--> Rotation stopped.");
                        } else {
                            println!("--> Rotation was not running.");
                        }
                    }
                    "watch" => match args.get(1).copied() {
                        Some("on") => {
                            is_watching.store(true, Ordering::Relaxed);
                            println!("--> Printing rotations as they happen.");
                        }
                        Some("off") => {
                            is_watching.store(false, Ordering::Relaxed);
                            println!("--> Stopped printing rotations.");
                        }
                        _ => println!("Usage: watch <on|off>"),
                    },
                    "help" => {
                        println!("Available commands:");
                        println!("  show              - Shows both layers of every slot.");
                        println!("  config            - Shows the applied pool and timing.");
                        println!("  tick              - Rotates one slot right now.");
                        println!("  load <PATH>       - Loads and applies a configuration file.");
                        println!("  start | stop      - Resumes or pauses scheduled rotation.");
                        println!("  watch <on|off>    - Toggles printing of rotation events.");
                        println!("  exit              - Quits the shell.");
                    }
                    "exit" => break,
                    "" => {}
                    _ => println!("Unknown command: '{}'. Type 'help'.", line.trim()),
                }
            }
            Err(_) => break,
        }
    }

    println!("Exiting tripshell...");
    rotator.shutdown().await;
    Ok(())
}
