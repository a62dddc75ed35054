//! `tmreplay batch` - replay many logs in parallel and aggregate results.

use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use tmreplay::{Interpreter, StepOutcome};

use crate::cli::CliError;

struct BatchResult {
    path: PathBuf,
    outcome: Result<String, String>,
}

pub(crate) fn execute(
    logs: Vec<PathBuf>,
    threads: Option<usize>,
    progress: bool,
) -> Result<(), CliError> {
    if let Some(threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| CliError::new(e.to_string()))?;
    }

    let bar = if progress {
        let bar = ProgressBar::new(logs.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .map_err(|e| CliError::new(e.to_string()))?,
        );
        Some(bar)
    } else {
        None
    };

    // Each log is an independent game; the engine itself stays
    // single-threaded per replay.
    let results: Vec<BatchResult> = logs
        .par_iter()
        .map(|path| {
            let outcome = replay_one(path);
            if let Some(bar) = &bar {
                bar.inc(1);
            }
            BatchResult {
                path: path.clone(),
                outcome,
            }
        })
        .collect();
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }

    let mut failures = 0usize;
    for result in &results {
        match &result.outcome {
            Ok(summary) => println!("{}: {summary}", result.path.display()),
            Err(error) => {
                failures += 1;
                println!("{}: FAILED: {error}", result.path.display());
            }
        }
    }
    println!("{} replayed, {failures} failed", results.len());
    if failures > 0 {
        return Err(CliError::new(format!("{failures} logs failed to replay")));
    }
    Ok(())
}

fn replay_one(path: &PathBuf) -> Result<String, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let items = tmreplay::parse_log(&text).map_err(|e| e.to_string())?;
    let mut interpreter = Interpreter::new(items);
    match interpreter.run_to_end().map_err(|e| e.to_string())? {
        StepOutcome::Missing(missing) => Err(format!(
            "suspended on missing {:?} in round {}",
            missing.kind, missing.round
        )),
        StepOutcome::Advanced | StepOutcome::EndOfLog => {
            let state = interpreter.state();
            let Some(scores) = &state.final_scores else {
                return Err("log ended before the game finished".to_owned());
            };
            let mut rows: Vec<String> = scores
                .iter()
                .map(|(f, s)| format!("{}={}", f.name(), s.total_vp))
                .collect();
            rows.sort();
            Ok(rows.join(" "))
        }
    }
}
