use std::io::{BufRead, Write};

use colored::Colorize;
use tq_ledger::{LedgerService, NewActivity};
use tq_store::ChainStore;
use tq_types::Receipt;

/// Prompt for activities until the user declines to add another or input
/// ends. Bad input is reported and the session carries on.
pub fn run_session<S, R, W>(
    ledger: &LedgerService<S>,
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<Vec<Receipt>>
where
    S: ChainStore,
    R: BufRead,
    W: Write,
{
    let mut receipts = Vec::new();
    loop {
        writeln!(out, "\nEnter new activity information:")?;
        match prompt_activity(input, out)? {
            None => break,
            Some(Ok(new)) => match ledger.add_activity(new) {
                Ok(receipt) => {
                    writeln!(out, "\n{} Activity stored in ledger.", "✓".green().bold())?;
                    writeln!(out, "Block Height: {}", receipt.height)?;
                    writeln!(out, "Block Hash: {}", receipt.hash)?;
                    receipts.push(receipt);
                }
                Err(e) => writeln!(out, "\n{} {e}", "Error:".red())?,
            },
            Some(Err(reason)) => writeln!(out, "\n{} {reason}", "Error:".red())?,
        }

        match ask(input, out, "\nAdd another activity? (y/n): ")? {
            Some(answer) if answer.eq_ignore_ascii_case("y") => {}
            _ => break,
        }
    }
    Ok(receipts)
}

/// `None` on end of input; `Some(Err(_))` when a number does not parse.
fn prompt_activity<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
) -> anyhow::Result<Option<Result<NewActivity, String>>> {
    let Some(name) = ask(input, out, "Activity Name: ")? else {
        return Ok(None);
    };
    let Some(description) = ask(input, out, "Description: ")? else {
        return Ok(None);
    };
    let Some(user) = ask(input, out, "User Who Posted: ")? else {
        return Ok(None);
    };
    let Some(difficulty) = ask(input, out, "Difficulty Rating (0-10): ")? else {
        return Ok(None);
    };
    let Some(points) = ask(input, out, "Points: ")? else {
        return Ok(None);
    };

    let Ok(difficulty) = difficulty.parse::<f64>() else {
        return Ok(Some(Err(format!("difficulty rating {difficulty:?} is not a number"))));
    };
    let Ok(points) = points.parse::<i64>() else {
        return Ok(Some(Err(format!("points {points:?} is not a whole number"))));
    };
    Ok(Some(Ok(NewActivity::new(name, description, user, difficulty, points))))
}

/// Print `prompt` and read one trimmed line; `None` at end of input.
fn ask<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    prompt: &str,
) -> anyhow::Result<Option<String>> {
    write!(out, "{prompt}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tq_store::InMemoryChainStore;

    use super::*;

    fn ledger() -> LedgerService<InMemoryChainStore> {
        let ledger = LedgerService::new(InMemoryChainStore::new());
        ledger.initialize_and_ensure_genesis().unwrap();
        ledger
    }

    fn run(ledger: &LedgerService<InMemoryChainStore>, script: &str) -> (Vec<Receipt>, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut out = Vec::new();
        let receipts = run_session(ledger, &mut input, &mut out).unwrap();
        (receipts, String::from_utf8(out).unwrap())
    }

    #[test]
    fn two_activities_then_stop() {
        let ledger = ledger();
        let script = "Old Rag\n9 mile hike\nalex\n8.7\n250\ny\n\
                      Sunset Walk\nBeach stroll\nliam\n1.5\n20\nn\n";
        let (receipts, transcript) = run(&ledger, script);

        assert_eq!(receipts.len(), 2);
        assert_eq!(receipts[1].height, 2);
        assert!(transcript.contains("Activity stored in ledger."));
        assert!(transcript.contains("Block Height: 1"));
        assert_eq!(ledger.get_activity_events().unwrap().len(), 2);
    }

    #[test]
    fn bad_number_is_reported_and_session_continues() {
        let ledger = ledger();
        let script = "Old Rag\n9 mile hike\nalex\nhard\n250\ny\n\
                      Old Rag\n9 mile hike\nalex\n8.7\n250\nn\n";
        let (receipts, transcript) = run(&ledger, script);

        assert_eq!(receipts.len(), 1);
        assert!(transcript.contains("is not a number"));
    }

    #[test]
    fn validation_failure_is_reported() {
        let ledger = ledger();
        let (receipts, transcript) = run(&ledger, "\n9 mile hike\nalex\n8.7\n250\nn\n");
        assert!(receipts.is_empty());
        assert!(transcript.contains("name is required"));
        assert_eq!(ledger.block_count().unwrap(), 1);
    }

    #[test]
    fn end_of_input_ends_session() {
        let ledger = ledger();
        let (receipts, _) = run(&ledger, "Old Rag\n9 mile");
        assert!(receipts.is_empty());
    }
}
