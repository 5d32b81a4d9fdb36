//! CLI interface and argument parsing
//!
//! Flags read their environment variable when absent from the command line.

pub mod commands;

use clap::{Parser, Subcommand};

/// LMS Toolkit - extract LMS data to CSV and load it into a relational store
#[derive(Parser, Debug)]
#[command(name = "lms-toolkit")]
#[command(version, about, long_about = None)]
#[command(author = "LMS Toolkit Contributors")]
pub struct Cli {
    /// Optional TOML configuration file
    #[arg(short, long, env = "LMS_CONFIG", global = true)]
    pub config: Option<String>,

    /// Log level (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(short, long, env = "LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract from Canvas into the CSV tree
    Canvas(commands::canvas::CanvasArgs),

    /// Extract from Schoology into the CSV tree
    Schoology(commands::schoology::SchoologyArgs),

    /// Extract from Google Classroom into the CSV tree
    Google(commands::google::GoogleArgs),

    /// Load the newest CSV files into the destination database
    Load(commands::load::LoadArgs),

    /// Apply destination schema migrations
    Migrate(commands::migrate::MigrateArgs),
}
