//! `hookline` sends messages to a webhook without tripping its rate limit.
//!
//! The hookline binary is a wrapper around hookline-lib, which queues the
//! messages and delivers them one at a time, in order.
//!
//! Send two messages:
//! ```sh
//! hookline --webhook-url https://discord.com/api/webhooks/<id>/<token> "Hello" "World"
//! ```
//!
//! Send every line of a file, or of standard input:
//! ```sh
//! hookline --file messages.txt
//! tail -n 5 build.log | hookline -
//! ```
//!
//! The webhook can also be given as id and token, e.g. through the
//! `HOOKLINE_TOKEN` environment variable:
//! ```sh
//! HOOKLINE_TOKEN=<token> hookline --id <id> "Deployed"
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![deny(missing_docs)]

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use futures::future::join_all;
use log::{error, info};

#[cfg(feature = "native-tls")]
use openssl_sys as _; // required for vendored-openssl feature

mod client;
mod input;
mod logging;
mod options;
mod stats;
mod verbosity;

use crate::logging::init_logging;
use crate::options::{Config, HOOKLINE_CONFIG_FILE, HookOptions};
use crate::stats::DeliveryStats;

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator.
    #[allow(unused)]
    UnexpectedFailure = 1,
    DeliveryFailure = 2,
    ConfigFile = 3,
}

fn main() -> Result<()> {
    // std::process::exit doesn't guarantee that all destructors will be run,
    // therefore we wrap the main code in another function to ensure that.
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

/// Merge all provided config options into one.
/// This includes a potential config file, command-line- and environment variables
fn load_config() -> Result<HookOptions> {
    let mut opts = HookOptions::parse();

    // The config file may set the verbosity, so logging starts after merging
    let merged = merge_config_file(&mut opts);
    init_logging(&opts.config.verbose);
    merged?;

    // Fail early and with the config exit code if no webhook is given
    opts.config.webhook_url()?;

    Ok(opts)
}

/// Load a potentially existing config file and merge it into the config from
/// the CLI. Without `--config`, the default file is only loaded if it exists.
fn merge_config_file(opts: &mut HookOptions) -> Result<()> {
    let (config_file, explicit) = match &opts.config_file {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(HOOKLINE_CONFIG_FILE), false),
    };
    if explicit || config_file.is_file() {
        match Config::load_from_file(&config_file) {
            Ok(c) => opts.config.merge(c),
            Err(e) => {
                bail!(
                    "Cannot load configuration file `{}`: {e:?}",
                    config_file.display()
                );
            }
        }
    }
    Ok(())
}

/// Set up runtime and call hookline entrypoint
fn run_main() -> Result<i32> {
    let opts = match load_config() {
        Ok(opts) => opts,
        Err(e) => {
            error!("Error while loading config: {e}");
            return Ok(ExitCode::ConfigFile as i32);
        }
    };

    let messages = opts.messages()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(&opts.config, &messages))
}

/// Send all messages and report the outcome
async fn run(cfg: &Config, messages: &[String]) -> Result<i32> {
    let client = client::create(cfg)?;
    info!("Sending {} message(s)", messages.len());

    // Every message is queued before the first outcome is awaited
    let outcomes = join_all(messages.iter().map(|message| {
        let submitted = client.send(message);
        async move { submitted?.await }
    }))
    .await;
    client.close();

    let mut stats = DeliveryStats::new();
    for (index, (message, outcome)) in messages.iter().zip(outcomes).enumerate() {
        if let Err(e) = &outcome {
            error!("Failed to deliver message {}: {e}", index + 1);
        }
        stats.add(index + 1, message, outcome);
    }

    println!("{}", stats.render(&cfg.format)?);

    let exit_code = if stats.is_success() {
        ExitCode::Success
    } else {
        ExitCode::DeliveryFailure
    };
    Ok(exit_code as i32)
}
