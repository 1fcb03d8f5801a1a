//! rowfeed CLI: list database rows as documents, watch for changes, fetch single documents.

use anyhow::Result;
use clap::Parser;
use rowfeed::engine::arg_parser::Cli;
use rowfeed::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
