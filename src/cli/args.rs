//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and the Commands enum.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::config::CrashPolicy;
use crate::loader::LoadMode;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Watch-mode execution supervisor
#[derive(Parser)]
#[command(
    name = "watchrun",
    version = env!("CARGO_PKG_VERSION"),
    about = "Rerun a program whenever a file it depends on changes",
    long_about = "Run a program, track the files it reports as dependencies, and restart it once \
                  a burst of changes to any of them has settled.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Supervise a program in watch mode
    #[command(
        about = "Run a program and restart it when its dependencies change",
        after_help = "Examples:\n  watchrun watch -- node server.js\n  watchrun watch --debounce-ms 300 --include .env -- ./run.sh\n  watchrun watch --on-crash restart -- python app.py\n\nThe child finds the dependency channel in $WATCHRUN_IPC and sends\n  {\"kind\":\"dependency\",\"path\":\"...\"}\none JSON object per line."
    )]
    Watch {
        /// Quiet period before a restart fires (overrides config)
        #[arg(long, value_name = "MS")]
        debounce_ms: Option<u64>,

        /// Reset the terminal before each restart (overrides config)
        #[arg(long, value_name = "BOOL")]
        clear_screen: Option<bool>,

        /// Extra file that always triggers a restart (repeatable)
        #[arg(long, value_name = "PATH")]
        include: Vec<PathBuf>,

        /// Glob whose matches never trigger a restart (repeatable)
        #[arg(long, value_name = "GLOB")]
        exclude: Vec<String>,

        /// What to do when the program exits unsuccessfully (overrides config)
        #[arg(long, value_enum, value_name = "POLICY")]
        on_crash: Option<CrashPolicy>,

        /// Program to run
        program: String,

        /// Arguments passed to the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Resolve a module specifier and show its execution context
    #[command(
        about = "Resolve a specifier as load, import or require",
        after_help = "Examples:\n  watchrun resolve ./lib/esm-ext-js\n  watchrun resolve ./lib/esm-ext-mjs/index.mjs --mode require\n  watchrun resolve ./src/main --from packages/app --json"
    )]
    Resolve {
        /// Relative or absolute path, or file:// URL
        specifier: String,

        /// How the module is loaded: load, import or require
        #[arg(short, long, default_value = "load")]
        mode: LoadMode,

        /// Directory to resolve from (defaults to the current directory)
        #[arg(long, value_name = "DIR")]
        from: Option<PathBuf>,

        /// Output the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .watchrun/settings.toml")]
    Config,
}
