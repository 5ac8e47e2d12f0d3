//! Attribute list - headless runner for the attribute list engine
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;

use attribute_list::{run_headless, HeadlessOptions};
use attrlist_core::prelude::*;

/// Attribute list - drive the attribute list engine over a JSON fixture
#[derive(Parser, Debug)]
#[command(name = "attrlist")]
#[command(about = "Attribute list engine with NDJSON output", long_about = None)]
struct Args {
    /// Fixture document with layers and features
    #[arg(long, value_name = "FILE")]
    fixture: PathBuf,

    /// Application id (defaults to the fixture's)
    #[arg(long)]
    application: Option<String>,

    /// Settings file (defaults to `.attrlist/config.toml`)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install().map_err(|e| Error::config(e.to_string()))?;
    attrlist_core::logging::init()?;

    let options = HeadlessOptions {
        fixture: args.fixture,
        application_id: args.application,
        config: args.config,
    };

    let result = run_headless(&options).await;
    if let Err(ref e) = result {
        error!("Application error: {:?}", e);
        eprintln!("❌ {}", e);
    }
    result
}
