// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: CLI entry point for the hintsh interactive shell.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! CLI entry point for the hintsh interactive shell.

use std::env;
use std::io;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{debug, warn, LevelFilter};

use hintsh::config::{load_config, load_config_or_default, DEFAULT_CONFIG_FILE};
use hintsh::{ConfigOverrides, HistoryStore, NoSuggestions, Shell, SuggestionSource};

/// hintsh command-line arguments.
#[derive(Debug, Parser)]
#[command(author = "Lukas Bower", version, about = "Shell with an out-of-process suggestion oracle", long_about = None)]
struct Cli {
    /// Path to a hintsh TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Unix-domain socket served by the suggestion service.
    #[arg(long, value_name = "PATH")]
    socket_path: Option<PathBuf>,

    /// Skip the Unix-domain socket and go straight to TCP.
    #[arg(long, default_value_t = false)]
    no_unix_socket: bool,

    /// Hostname or IP address of the TCP suggestion endpoint.
    #[arg(long)]
    tcp_host: Option<String>,

    /// Port of the TCP suggestion endpoint.
    #[arg(long)]
    tcp_port: Option<u16>,

    /// Model identifier sent with suggestion requests.
    #[arg(long)]
    model: Option<String>,

    /// Suggestion timeout in milliseconds, per transport attempt.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// SQLite database used for command history.
    #[arg(long, value_name = "FILE")]
    history_db: Option<PathBuf>,

    /// Do not contact the suggestion service.
    #[arg(long, default_value_t = false)]
    no_suggest: bool,

    /// Prompt printed before each line.
    #[arg(long)]
    prompt: Option<String>,

    /// Enable verbose logging.
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

fn env_string(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_owned()))
            }
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(anyhow!("failed to read {key}: {err}")),
    }
}

fn parse_env_number<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key)? {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow!("invalid {key} value '{value}': {err}")),
        None => Ok(None),
    }
}

fn env_override<T>(cli_value: Option<T>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if cli_value.is_some() {
        return Ok(cli_value);
    }
    parse_env_number(key)
}

fn env_path_override(cli_value: Option<PathBuf>, key: &str) -> Result<Option<PathBuf>> {
    if cli_value.is_some() {
        return Ok(cli_value);
    }
    Ok(env_string(key)?.map(PathBuf::from))
}

fn env_string_override(cli_value: Option<String>, key: &str) -> Result<Option<String>> {
    if cli_value.is_some() {
        return Ok(cli_value);
    }
    env_string(key)
}

fn flag_override(disabled: bool) -> Option<bool> {
    disabled.then_some(false)
}

/// Keep SIGINT and SIGQUIT from killing the shell. SIGINT moves the cursor to
/// a fresh line; the interrupted read resumes.
#[cfg(unix)]
fn install_signal_handlers() {
    use std::io::Write;
    use std::thread;

    use signal_hook::consts::{SIGINT, SIGQUIT};
    use signal_hook::iterator::Signals;

    let mut signals = match Signals::new([SIGINT, SIGQUIT]) {
        Ok(signals) => signals,
        Err(err) => {
            warn!("failed to install signal handlers: {err}");
            return;
        }
    };
    let spawned = thread::Builder::new()
        .name("hintsh-signals".to_owned())
        .spawn(move || {
            for signal in signals.forever() {
                debug!("received signal {signal}");
                if signal == SIGINT {
                    let mut stdout = io::stdout();
                    let _ = stdout.write_all(b"\n").and_then(|()| stdout.flush());
                }
            }
        });
    if let Err(err) = spawned {
        warn!("failed to start signal thread: {err}");
    }
}

#[cfg(not(unix))]
fn install_signal_handlers() {}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let base = match env_path_override(cli.config.clone(), "HINTSH_CONFIG")? {
        Some(path) => load_config(&path)?,
        None => load_config_or_default(&PathBuf::from(DEFAULT_CONFIG_FILE))?,
    };
    let overrides = ConfigOverrides {
        prompt: cli.prompt.clone(),
        suggest_enabled: flag_override(cli.no_suggest),
        unix_socket: flag_override(cli.no_unix_socket),
        socket_path: env_path_override(cli.socket_path.clone(), "HINTSH_SOCKET_PATH")?,
        tcp_host: env_string_override(cli.tcp_host.clone(), "HINTSH_TCP_HOST")?,
        tcp_port: env_override(cli.tcp_port, "HINTSH_TCP_PORT")?,
        model: env_string_override(cli.model.clone(), "HINTSH_MODEL")?,
        timeout_ms: env_override(cli.timeout_ms, "HINTSH_TIMEOUT_MS")?,
        history_path: env_path_override(cli.history_db.clone(), "HINTSH_HISTORY_DB")?,
    };
    let config = base
        .with_overrides(&overrides)
        .context("invalid hintsh configuration overrides")?;
    debug!("effective configuration: {config:?}");

    let suggestions: Box<dyn SuggestionSource> = match config.suggestion_client() {
        Some(client) => Box::new(client),
        None => Box::new(NoSuggestions),
    };
    let history = HistoryStore::initialize(&config.history.path);

    install_signal_handlers();
    // Unlocked so the signal thread can write between prompts.
    let mut shell = Shell::new(suggestions, history, io::stdout())
        .with_prompt(config.prompt.clone())
        .with_history_limit(config.history.default_limit);

    let run_result = shell.repl();
    shell.shutdown();
    run_result
}
