//! Where the messages to send come from.
//!
//! Messages given as arguments are sent as they are. Files, and standard
//! input given as `-`, contain one message per line; blank lines are
//! skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const STDIN: &str = "-";

/// Collect all messages in the order they are to be sent.
///
/// `stdin` is read at most once, even if `-` is given more than once.
pub(crate) fn collect_messages<R: Read>(
    raw_messages: &[String],
    files: &[PathBuf],
    stdin: R,
) -> Result<Vec<String>> {
    let mut stdin = Some(stdin);
    let mut messages = Vec::new();

    for raw in raw_messages {
        if raw == STDIN {
            if let Some(stdin) = stdin.take() {
                messages.extend(read_lines(stdin).context("Cannot read messages from stdin")?);
            }
        } else {
            messages.push(raw.clone());
        }
    }

    for path in files {
        if path == Path::new(STDIN) {
            if let Some(stdin) = stdin.take() {
                messages.extend(read_lines(stdin).context("Cannot read messages from stdin")?);
            }
            continue;
        }
        let file = File::open(path)
            .with_context(|| format!("Cannot open message file `{}`", path.display()))?;
        messages.extend(
            read_lines(file)
                .with_context(|| format!("Cannot read message file `{}`", path.display()))?,
        );
    }

    Ok(messages)
}

/// Read lines; ignore blank lines
fn read_lines<R: Read>(reader: R) -> Result<Vec<String>> {
    let lines: Vec<String> = BufReader::new(reader).lines().collect::<Result<_, _>>()?;
    Ok(lines
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect())
}
