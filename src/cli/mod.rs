//! CLI module - Command-line interface for Xyno
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Args, Parser, Subcommand};

/// Xyno - transactional email platform
#[derive(Parser)]
#[command(name = "xyno")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API with the reconciliation scheduler (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create default config file with a fresh credential key
    #[command(alias = "--init")]
    Init,

    /// Fail send logs stuck in pending, once
    Reconcile,

    /// Manage the platform mailer used for account emails
    PlatformMailer {
        #[command(subcommand)]
        command: PlatformMailerCommands,
    },
}

#[derive(Subcommand)]
pub enum PlatformMailerCommands {
    /// Configure the platform mailer for the first time
    Initialize(MailerArgs),
    /// Overwrite the existing platform mailer settings
    Replace(MailerArgs),
    /// Show the current settings (credentials are never printed)
    Show,
}

#[derive(Args, Debug, Clone)]
pub struct MailerArgs {
    #[arg(long)]
    pub access_key: String,
    #[arg(long)]
    pub secret_key: String,
    #[arg(long)]
    pub region: String,
    #[arg(long)]
    pub sender_email: String,
}

pub use commands::*;
