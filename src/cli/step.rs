//! `tmreplay step` - replay up to an item index and dump the state.

use std::path::PathBuf;

use tmreplay::{Interpreter, StepOutcome};

use crate::cli::{output, CliError};

pub(crate) fn execute(log_path: PathBuf, to: usize) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&log_path)?;
    let items = tmreplay::parse_log(&text)?;
    let mut interpreter = Interpreter::new(items);

    match interpreter.run_to(to)? {
        StepOutcome::Missing(missing) => {
            println!(
                "suspended at item {} of {}: missing {:?} for {:?}",
                interpreter.index(),
                interpreter.len(),
                missing.kind,
                missing.players
            );
        }
        StepOutcome::Advanced | StepOutcome::EndOfLog => {
            println!(
                "stopped at item {} of {}",
                interpreter.index(),
                interpreter.len()
            );
        }
    }
    println!("{}", output::render_state(interpreter.state()));
    Ok(())
}
