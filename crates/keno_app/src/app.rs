use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, Context};
use keno_core::{Notification, Phase, RunSnapshot};
use keno_engine::{
    write_export, ExportFormat, ExportSummary, ReqwestJobClient, RunAccumulator, RunObserver,
};
use keno_logging::{keno_error, keno_info, keno_warn};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::render;

pub async fn run_app(cli: Cli) -> anyhow::Result<()> {
    let client = ReqwestJobClient::new(cli.trigger_settings()).context("building HTTP client")?;
    let accumulator =
        RunAccumulator::new(Arc::new(client)).with_observer(Arc::new(TerminalObserver::default()));

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let outcome = accumulator.start(cancel).await;
    let snapshot = accumulator.current_state();

    for line in render::preview_lines(&snapshot) {
        println!("{line}");
    }
    let exported = export_results(&snapshot, &cli.out_dir, &cli.export_formats());

    let run = match outcome {
        Ok(final_state) if final_state.phase == Phase::Completed => Ok(()),
        Ok(final_state) => Err(anyhow!(
            "run ended without completion: {}",
            final_state
                .failure
                .map(|reason| reason.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        )),
        Err(err) => Err(err).context("keno archive run failed"),
    };
    settle(run, exported)
}

/// Prints written exports and picks the error to return.
///
/// A failed run outranks a failed export; the export error is only logged then.
fn settle(
    run: anyhow::Result<()>,
    exported: anyhow::Result<Vec<ExportSummary>>,
) -> anyhow::Result<()> {
    match (run, exported) {
        (run, Ok(summaries)) => {
            for summary in summaries {
                println!(
                    "Сохранено {} тиражей в {}",
                    summary.row_count,
                    summary.path.display()
                );
            }
            run
        }
        (Ok(()), Err(export_err)) => Err(export_err),
        (Err(run_err), Err(export_err)) => {
            keno_error!("Saving partial results failed: {:#}", export_err);
            Err(run_err)
        }
    }
}

/// Writes every requested format. Partial results from a failed run are kept.
pub(crate) fn export_results(
    snapshot: &RunSnapshot,
    out_dir: &Path,
    formats: &[ExportFormat],
) -> anyhow::Result<Vec<ExportSummary>> {
    if !snapshot.exportable() {
        keno_info!("No results to export");
        return Ok(Vec::new());
    }
    formats
        .iter()
        .map(|&format| {
            write_export(out_dir, &snapshot.results, format)
                .with_context(|| format!("writing {format} export to {}", out_dir.display()))
        })
        .collect()
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                keno_info!("Interrupt received, cancelling run");
                cancel.cancel();
            }
            Err(err) => keno_warn!("Could not listen for Ctrl-C: {}", err),
        }
    });
}

/// Prints progress to stderr whenever the percentage or the result count moves.
#[derive(Default)]
struct TerminalObserver {
    last: Mutex<Option<(u32, usize)>>,
}

impl RunObserver for TerminalObserver {
    fn on_snapshot(&self, snapshot: &RunSnapshot) {
        if !snapshot.is_loading() {
            return;
        }
        let key = (snapshot.progress, snapshot.results.len());
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if *last == Some(key) {
            return;
        }
        *last = Some(key);
        eprintln!("{}", render::status_line(snapshot));
    }

    fn on_notification(&self, notification: &Notification) {
        eprintln!("{}", render::notification_line(notification));
    }
}
