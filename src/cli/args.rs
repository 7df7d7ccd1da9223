// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Defines all command-line arguments and subcommands for Rostrum.

use clap::{Parser, Subcommand};

/// Rostrum - AI debate arena for your terminal
#[derive(Parser, Debug)]
#[command(name = "rostrum")]
#[command(version, about = "AI debate arena for your terminal")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a debate (default when no command given)
    Debate(DebateArgs),

    /// History management
    History(HistoryArgs),

    /// List models available to the configured credential
    Models,

    /// Manage the stored API credential
    Key(KeyArgs),
}

/// Arguments for the debate subcommand
#[derive(clap::Args, Debug, Default)]
pub struct DebateArgs {
    /// The motion to debate (prompted for when omitted)
    pub topic: Option<String>,

    /// Take the Pro side yourself instead of watching two AIs
    #[arg(long)]
    pub human: bool,

    /// Resume a saved debate by id
    #[arg(long)]
    pub resume: Option<String>,

    /// Model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Disable streaming output
    #[arg(long)]
    pub no_stream: bool,
}

/// Arguments for the history subcommand
#[derive(clap::Args, Debug)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommands,
}

/// History operations
#[derive(Subcommand, Debug)]
pub enum HistoryCommands {
    /// List saved debates, most recent first
    List,

    /// Delete a saved debate by id
    Delete {
        /// Session id
        id: String,
    },

    /// Export a saved debate to Markdown on stdout
    Export {
        /// Session id
        id: String,
    },
}

/// Arguments for the key subcommand
#[derive(clap::Args, Debug)]
pub struct KeyArgs {
    /// Store this credential in settings
    #[arg(long)]
    pub set: Option<String>,

    /// Clear the stored credential
    #[arg(long)]
    pub clear: bool,
}
