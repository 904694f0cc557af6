//! # elfmeta - Main Entry Point
//!
//! Thin front end over the library: parse arguments, run one command, print
//! its report as text or JSON.

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use elfmeta::cli::{execute, Args};

// Exit codes (usage errors exit with 2 from clap)
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;

fn main() {
    env_logger::init();
    let args = Args::parse();
    std::process::exit(match run(&args) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

fn run(args: &Args) -> Result<()> {
    let report = execute(&args.command)?;
    debug!("Report: {report:?}");

    if args.json {
        println!("{}", report.to_json().context("Failed to serialize report")?);
    } else if !(args.quiet && report.is_empty()) {
        println!("{report}");
    }
    Ok(())
}
