use crate::utils::error::{RedbiomError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Opens an identifier source; `-` reads standard input.
pub fn open_source(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path)?;
    Ok(Box::new(BufReader::new(file)))
}

/// Merges positional identifiers with those read from `from`, one per line.
///
/// Positional ids come first, then the lines of `from` in order. Ids are
/// trimmed, blank lines are skipped and repeats keep their first position.
pub fn merge_inputs<R: BufRead>(from: Option<R>, positional: Vec<String>) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(positional.len());

    let mut push = |id: &str| {
        let id = id.trim();
        if !id.is_empty() && seen.insert(id.to_string()) {
            merged.push(id.to_string());
        }
    };

    for id in &positional {
        push(id);
    }

    if let Some(reader) = from {
        for line in reader.lines() {
            push(&line?);
        }
    }

    if merged.is_empty() {
        return Err(RedbiomError::EmptyInput);
    }

    tracing::debug!("Merged {} observation ids", merged.len());
    Ok(merged)
}
