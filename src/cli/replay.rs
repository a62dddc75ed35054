//! `tmreplay replay` - replay one log to completion and report scores.

use std::path::PathBuf;

use tmreplay::{Interpreter, StepOutcome};

use crate::cli::{output, CliError, OutputFormat};

pub(crate) fn execute(
    log_path: PathBuf,
    format: OutputFormat,
    quiet: bool,
) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&log_path)?;
    let items = tmreplay::parse_log(&text)?;
    let mut interpreter = Interpreter::new(items);

    let outcome = interpreter.run_to_end()?;
    match outcome {
        StepOutcome::Missing(missing) => match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&missing)?);
            }
            OutputFormat::Text => {
                return Err(CliError::new(format!(
                    "replay suspended at item {}: missing {:?} for {:?} in round {}",
                    interpreter.index(),
                    missing.kind,
                    missing.players,
                    missing.round
                )));
            }
        },
        StepOutcome::Advanced | StepOutcome::EndOfLog => {
            let state = interpreter.state();
            let Some(scores) = &state.final_scores else {
                return Err(CliError::new(
                    "log ended before the game finished (no final scores)",
                ));
            };
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(scores)?);
                }
                OutputFormat::Text => {
                    if !quiet {
                        println!("{}", output::render_state(state));
                    }
                    println!("{}", output::render_scores(scores));
                }
            }
        }
    }
    Ok(())
}
