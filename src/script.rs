//! Command-line parsing and script-file execution.
//!
//! The console grammar is one command per line, whitespace-delimited, with
//! `#` starting a comment that runs to end of line. Blank lines (and lines
//! that are only comment) produce no job.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use crate::engine::{Engine, Event};
use crate::error::MbconError;

/// Split one input line into `(command, args)`, or `None` for a blank or
/// comment-only line.
#[must_use]
pub fn parse_line(line: &str) -> Option<(String, Vec<String>)> {
    let line = line.split('#').next().unwrap_or("").trim();
    if line.is_empty() {
        return None;
    }
    let mut tokens = line.split_whitespace().map(str::to_string);
    let command = tokens.next()?;
    Some((command, tokens.collect()))
}

/// Enqueue every command of a script file and wait for the engine to drain.
///
/// Completed jobs are counted against the number queued, so the wait ends
/// only once the last script command has run. Returns immediately after `end`
/// when the script (or an earlier fault) terminates the session. A file with
/// no commands, or a script run against a stopped engine, returns without
/// waiting.
pub async fn run_script(engine: &Engine, path: impl AsRef<Path>) -> Result<(), MbconError> {
    // subscribe before enqueueing so no completion can slip past unseen
    let mut events = engine.subscribe();

    let file = tokio::fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut pushed = 0usize;
    while let Some(line) = lines.next_line().await? {
        if let Some((command, args)) = parse_line(&line) {
            engine.enqueue(command, args);
            pushed += 1;
        }
    }
    log::info!("script: queued {pushed} command(s)");
    // a stopped engine dropped the enqueues and will emit nothing further
    if pushed == 0 || engine.is_stopped() {
        return Ok(());
    }

    let mut done = 0usize;
    loop {
        match events.recv().await {
            Ok(Event::AfterJob) => {
                done += 1;
                if done >= pushed {
                    return Ok(());
                }
            }
            Ok(Event::End(_)) | Err(RecvError::Closed) => return Ok(()),
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => log::warn!("script: event stream lagged by {n}"),
        }
    }
}
