// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Receptive field query tool.
//!
//! Projects a region of one layer back to an earlier layer of the same chain
//! and prints the result as JSON. Chains come from `deepvis_configuration.toml`
//! when one is found, otherwise the built-in AlexNet chain is used.

use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use deepvis::config::{find_config_file, load_config, validate_config, DeepvisConfig};
use deepvis::observability::{debug_flags_help, init_logging, parse_debug_flags};
use deepvis::receptive_field::Region;
use serde_json::json;

struct Query {
    config_path: Option<PathBuf>,
    normalize_last: Option<bool>,
    from: String,
    to: String,
    region: Region,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: region_query [--config <path>] [--raw | --normalize] <from> <to> <r0> <r1> <c0> <c1>\n\n\
         Projects rows [r0, r1) and cols [c0, c1) of layer <from> back to layer <to>.\n\n\
         Options:\n\
         - --config: configuration file (default: search for deepvis_configuration.toml)\n\
         - --raw / --normalize: override [region].normalize_last\n\n\
         {}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_coordinate(value: &str) -> i64 {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Not an integer coordinate: {value}");
        usage_and_exit();
    })
}

fn parse_args() -> Query {
    let mut config_path = None;
    let mut normalize_last = None;
    let mut positional = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                config_path = Some(PathBuf::from(v));
            }
            "--raw" => normalize_last = Some(false),
            "--normalize" => normalize_last = Some(true),
            "-h" | "--help" => usage_and_exit(),
            debug if debug.starts_with("--debug-") => {}
            other if other.starts_with("--") => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
            _ => positional.push(arg),
        }
    }

    let [from, to, r0, r1, c0, c1]: [String; 6] = positional
        .try_into()
        .unwrap_or_else(|_| usage_and_exit());

    Query {
        config_path,
        normalize_last,
        region: Region::new(
            parse_coordinate(&r0),
            parse_coordinate(&r1),
            parse_coordinate(&c0),
            parse_coordinate(&c1),
        ),
        from,
        to,
    }
}

fn load(query: &Query) -> anyhow::Result<DeepvisConfig> {
    let path = match &query.config_path {
        Some(path) => Some(path.clone()),
        None => find_config_file().ok(),
    };
    let config = match path {
        Some(path) => load_config(Some(&path), None)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => DeepvisConfig::default(),
    };
    validate_config(&config).context("Invalid configuration")?;
    Ok(config)
}

fn main() {
    let query = parse_args();

    let config = load(&query).unwrap_or_else(|e| {
        eprintln!("{e:#}");
        process::exit(2);
    });

    // console only
    let mut options = deepvis::logging_options(&config.logging);
    options.file_logging = false;
    let _guard = init_logging(&parse_debug_flags(), &options).unwrap_or_else(|e| {
        eprintln!("{e:#}");
        process::exit(2);
    });

    let computer = deepvis::region_computer(&config).unwrap_or_else(|e| {
        eprintln!("Failed to build region computer: {e}");
        process::exit(2);
    });

    let normalize_last = query.normalize_last.unwrap_or(config.region.normalize_last);
    match computer.convert_region(&query.from, &query.to, query.region, normalize_last) {
        Ok(region) => {
            let out = json!({
                "from": query.from,
                "to": query.to,
                "requested": query.region,
                "normalize_last": normalize_last,
                "region": region,
            });
            match serde_json::to_string_pretty(&out) {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    eprintln!("Failed to encode result: {e}");
                    process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}
