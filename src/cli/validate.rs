//! `tmreplay validate` - parse a log and report the compiled item stream
//! without executing it.

use std::path::PathBuf;

use tmreplay::notation::{LogItem, TurnKind};

use crate::cli::CliError;

pub(crate) fn execute(log_path: PathBuf) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&log_path)?;
    let items = tmreplay::parse_log(&text)?;

    let mut rounds = 0usize;
    let mut turns = 0usize;
    let mut leeches = 0usize;
    for item in &items {
        match item {
            LogItem::Settings(settings) => {
                println!(
                    "settings: {} players, {} scoring tiles, {} bonus cards",
                    settings.players.len(),
                    settings.scoring_tiles.len(),
                    settings.bonus_cards.len()
                );
            }
            LogItem::RoundStart { round, turn_order } => {
                rounds += 1;
                let order: Vec<&str> = turn_order.iter().map(|f| f.name()).collect();
                println!("round {round}: {}", order.join(", "));
            }
            LogItem::Turn { kind, .. } => {
                turns += 1;
                if matches!(kind, TurnKind::Leech { .. }) {
                    leeches += 1;
                }
            }
        }
    }
    println!("{} items: {rounds} rounds, {turns} turns ({leeches} offer resolutions)", items.len());
    Ok(())
}
