// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Rostrum - AI debate arena for your terminal
//!
//! Entry point for the Rostrum CLI application.

use std::io::{self, Write};
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rostrum::cli::{Cli, Commands, DebateArgs, HistoryArgs, HistoryCommands, KeyArgs};
use rostrum::config::Settings;
use rostrum::debate::{DebateEngine, GameMode, Phase};
use rostrum::error::Result;
use rostrum::history::export::render_judge_markdown;
use rostrum::history::{render_markdown, HistoryStore};
use rostrum::llm::{GeminiClient, ModelClient, RetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let settings = Settings::load()?;

    match cli.command {
        None => run_debate(DebateArgs::default(), settings).await,
        Some(Commands::Debate(args)) => run_debate(args, settings).await,
        Some(Commands::History(args)) => run_history(args),
        Some(Commands::Models) => run_models(settings).await,
        Some(Commands::Key(args)) => run_key(args, settings),
    }
}

async fn run_debate(args: DebateArgs, mut settings: Settings) -> Result<()> {
    if let Some(model) = args.model {
        settings.model = model;
    }
    if args.no_stream {
        settings.streaming = false;
    }

    let client = Arc::new(GeminiClient::new(RetryConfig::from(&settings.resilience)));
    let history = HistoryStore::open()?;
    let mut engine = DebateEngine::new(client, settings, history);

    if let Some(id) = args.resume {
        engine.resume(&id)?;
        if let Some(note) = engine.last_error() {
            println!("note: {note}");
        }
        if let Some(session) = engine.session() {
            println!("Resuming \"{}\"\n", session.topic);
        }
    } else {
        let topic = match args.topic {
            Some(topic) => topic,
            None => prompt_line("Motion to debate: ")?,
        };
        let mode = if args.human {
            GameMode::HumanVsAi
        } else {
            GameMode::AiVsAi
        };
        engine.initialize(&topic, mode, None)?;
    }

    let mut printed = 0;
    printed = print_new_entries(&engine, printed);

    loop {
        if let Err(e) = engine.poll_auto().await {
            report_call_error(&engine, &e.to_string());
        }
        printed = print_new_entries(&engine, printed);

        match engine.phase() {
            Phase::HumanTurnPending => {
                let line = prompt_line("you (Pro) /judge, /quit, or your argument > ")?;
                match line.trim() {
                    "/quit" => {
                        engine.pause()?;
                        break;
                    }
                    "/judge" => run_judge_pass(&mut engine).await,
                    text => {
                        if let Err(e) = engine.submit_human_argument(text) {
                            eprintln!("{e}");
                        }
                    }
                }
            }
            Phase::AiTurnPending(side) => {
                let line = prompt_line(&format!(
                    "[enter] let {} speak, j judge, q quit > ",
                    side.label()
                ))?;
                match line.trim() {
                    "q" => {
                        engine.pause()?;
                        break;
                    }
                    "j" => run_judge_pass(&mut engine).await,
                    _ => {
                        if let Err(e) = engine.next_turn().await {
                            report_call_error(&engine, &e.to_string());
                        }
                    }
                }
            }
            _ => break,
        }
        printed = print_new_entries(&engine, printed);
    }

    if let Some(session) = engine.session() {
        let usage = session.usage.cumulative();
        println!(
            "\nSaved. Tokens used: {} prompt / {} completion / {} total.",
            usage.prompt, usage.completion, usage.total
        );
        println!("Resume with: rostrum debate --resume {}", session.id);
    }
    Ok(())
}

async fn run_judge_pass(engine: &mut DebateEngine) {
    println!("\nAsking the judge for a verdict...\n");
    match engine.evaluate_judge().await {
        Ok(report) => println!("{}", render_judge_markdown(&report)),
        Err(e) => eprintln!("{e}"),
    }
}

fn report_call_error(engine: &DebateEngine, fallback: &str) {
    match engine.last_error() {
        Some(message) => eprintln!("{message}"),
        None => eprintln!("{fallback}"),
    }
}

fn print_new_entries(engine: &DebateEngine, printed: usize) -> usize {
    let Some(session) = engine.session() else {
        return printed;
    };
    let entries = session.transcript.entries();
    for entry in &entries[printed.min(entries.len())..] {
        if entry.judge_data.is_some() {
            continue;
        }
        println!("--- {} ---", entry.speaker.label());
        println!("{}\n", entry.content);
    }
    entries.len()
}

fn run_history(args: HistoryArgs) -> Result<()> {
    let mut store = HistoryStore::open()?;
    match args.command {
        HistoryCommands::List => {
            if store.is_empty() {
                println!("No saved debates.");
                return Ok(());
            }
            for entry in store.list() {
                println!(
                    "{}  {}  [{:?}] {} turns, saved {}",
                    entry.id,
                    entry.topic,
                    entry.game_mode,
                    entry.turn_count,
                    entry.last_saved_at.format("%Y-%m-%d %H:%M"),
                );
            }
            Ok(())
        }
        HistoryCommands::Delete { id } => {
            if store.delete(&id)? {
                println!("Deleted {id}.");
            } else {
                println!("No debate with id {id}.");
            }
            Ok(())
        }
        HistoryCommands::Export { id } => {
            let snapshot = store.load(&id)?;
            println!("{}", render_markdown(&snapshot));
            Ok(())
        }
    }
}

async fn run_models(settings: Settings) -> Result<()> {
    let credential = settings
        .effective_credential()
        .ok_or(rostrum::RostrumError::MissingCredential)?;
    let client = GeminiClient::new(RetryConfig::from(&settings.resilience));

    for model in client.list_models(&credential).await? {
        println!("{}  {}", model.name, model.display_name);
        if !model.description.is_empty() {
            println!("    {}", model.description);
        }
    }
    Ok(())
}

fn run_key(args: KeyArgs, mut settings: Settings) -> Result<()> {
    if args.clear {
        settings.set_credential("");
        settings.save()?;
        println!("Stored credential cleared.");
    } else if let Some(key) = args.set {
        settings.set_credential(&key);
        settings.save()?;
        println!("Credential saved.");
    } else {
        match settings.effective_credential() {
            Some(_) if settings.api_key.is_some() => println!("Using the stored credential."),
            Some(_) => println!("Using the credential from the environment."),
            None => println!("No credential configured."),
        }
    }
    Ok(())
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}
