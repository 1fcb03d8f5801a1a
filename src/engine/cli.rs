//! CLI command handler: load settings, open the source, run the requested command.

use anyhow::{Context, Result, bail};
use crossbeam_channel::{Receiver, bounded, select, tick};
use log::{error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::adaptor::DatabaseAdaptor;
use crate::engine::arg_parser::{Cli, Commands};
use crate::engine::db_ops::SourceDb;
use crate::pipeline::{BatchSink, FeedDirSink, LogSink, Retrieval};
use crate::utils::config::PackagePaths;
use crate::utils::settings::Settings;
use crate::utils::{get_passphrase, setup_logging};
use crate::{DocId, Error};

/// Open the source database, asking for a passphrase when it is encrypted.
fn open_source(settings: &Settings, config_dir: &Path) -> Result<SourceDb> {
    let path = &settings.database.path;
    if !path.is_file() {
        bail!("source database not found: {}", path.display());
    }
    let plain = SourceDb::new(path, None);
    if !settings.database.encrypted && plain.is_readable() {
        return Ok(plain);
    }
    let pass = get_passphrase(config_dir)?;
    let db = SourceDb::new(path, Some(pass));
    if !db.is_readable() {
        bail!("cannot read {} with the given passphrase", path.display());
    }
    Ok(db)
}

fn make_sink(settings: &Settings, config_dir: &Path, dry_run: bool) -> Result<Box<dyn BatchSink>> {
    if dry_run {
        warn!("RUNNING IN DRY-RUN MODE. NO FEED FILES WILL BE WRITTEN.");
        return Ok(Box::new(LogSink::default()));
    }
    let dir = settings
        .feed
        .output_dir
        .clone()
        .unwrap_or_else(|| config_dir.join(PackagePaths::get().feed_dir_name()));
    let sink = FeedDirSink::new(&dir).with_context(|| format!("open feed dir {}", dir.display()))?;
    info!("Writing feeds to {}", dir.display());
    Ok(Box::new(sink))
}

/// Ctrl+C sets the cancel flag and wakes the watch loop.
fn install_cancel_handler() -> Result<(Arc<AtomicBool>, Receiver<()>)> {
    let cancel = Arc::new(AtomicBool::new(false));
    let (stop_tx, stop_rx) = bounded::<()>(1);
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        if !flag.swap(true, Ordering::SeqCst) {
            warn!("Interrupted; finishing current batch");
        }
        let _ = stop_tx.try_send(());
    })
    .context("install Ctrl+C handler")?;
    Ok((cancel, stop_rx))
}

/// Report decode failures as a bad request, everything else with context.
fn retrieval_error(id: &str, e: Error) -> anyhow::Error {
    if e.is_bad_request() {
        anyhow::anyhow!("bad request: {e}")
    } else {
        anyhow::Error::new(e).context(format!("retrieve {id}"))
    }
}

fn run_watch(
    adaptor: &DatabaseAdaptor,
    sink: &mut Box<dyn BatchSink>,
    interval_secs: u64,
    cancel: &AtomicBool,
    stop_rx: &Receiver<()>,
) -> Result<()> {
    if !adaptor.supports_incremental() {
        bail!("watch needs sql.update");
    }
    adaptor.full_pass(&mut *sink).context("full pass")?;
    let ticker = tick(Duration::from_secs(interval_secs.max(1)));
    info!("Watching for changes every {interval_secs}s (Ctrl+C to stop)");
    while !cancel.load(Ordering::SeqCst) {
        select! {
            recv(ticker) -> _ => {
                // A failed pass keeps the watermark; the next tick retries the same window.
                if let Err(e) = adaptor.incremental_pass(&mut *sink) {
                    error!("Incremental pass failed: {e}");
                }
            }
            recv(stop_rx) -> _ => break,
        }
    }
    Ok(())
}

fn run_fetch(adaptor: &DatabaseAdaptor, id: &str, output: Option<&PathBuf>) -> Result<()> {
    let response = match adaptor.fetch(&DocId::new(id)) {
        Ok(Retrieval::Found(r)) => r,
        Ok(Retrieval::NotFound) => bail!("document not found: {id}"),
        Err(e) => return Err(retrieval_error(id, e)),
    };
    info!("Content-Type: {}", response.content_type);
    for (key, value) in &response.metadata {
        info!("  {key} = {value}");
    }
    if let Some(acl) = &response.acl {
        info!("ACL: {}", serde_json::to_string(acl).context("serialize ACL")?);
    }
    match output {
        Some(path) => std::fs::write(path, response.body.as_bytes())
            .with_context(|| format!("write {}", path.display()))?,
        None => std::io::stdout()
            .write_all(response.body.as_bytes())
            .context("write body to stdout")?,
    }
    Ok(())
}

fn run_acl(adaptor: &DatabaseAdaptor, id: &str) -> Result<()> {
    match adaptor.acl(&DocId::new(id)) {
        Ok(Some(acl)) => {
            println!("{}", serde_json::to_string_pretty(&acl).context("serialize ACL")?);
            Ok(())
        }
        Ok(None) => bail!("no ACL query configured (sql.acl)"),
        Err(e) => Err(retrieval_error(id, e)),
    }
}

/// Run the selected command.
pub fn handle_run(cli: &Cli) -> Result<()> {
    setup_logging(cli.verbose, cli.quiet);
    let config_path = cli.config_path();
    let mut settings = Settings::load(&config_path)
        .with_context(|| format!("load settings {}", config_path.display()))?;
    settings.apply_overrides(&cli.overrides());
    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let db = open_source(&settings, &config_dir)?;
    let (cancel, stop_rx) = install_cancel_handler()?;
    let mut adaptor = DatabaseAdaptor::init(&settings, db)
        .context("initialize")?
        .with_cancel(Arc::clone(&cancel))
        .with_progress(cli.verbose);

    match &cli.command {
        Commands::Full => {
            let mut sink = make_sink(&settings, &config_dir, cli.dry_run)?;
            adaptor.full_pass(&mut sink).context("full pass")?;
        }
        Commands::Incremental { since } => {
            if let Some(since) = since {
                adaptor = adaptor.with_watermark(*since);
            }
            let mut sink = make_sink(&settings, &config_dir, cli.dry_run)?;
            adaptor.incremental_pass(&mut sink).context("incremental pass")?;
        }
        Commands::Watch { since, .. } => {
            if let Some(since) = since {
                adaptor = adaptor.with_watermark(*since);
            }
            let mut sink = make_sink(&settings, &config_dir, cli.dry_run)?;
            run_watch(
                &adaptor,
                &mut sink,
                settings.feed.watch_interval_secs,
                &cancel,
                &stop_rx,
            )?;
        }
        Commands::Fetch { id, output } => run_fetch(&adaptor, id, output.as_ref())?,
        Commands::Acl { id } => run_acl(&adaptor, id)?,
    }
    Ok(())
}
