use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// One comparison request: two entities named by raw identifier strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryEntry {
    pub first: String,
    pub second: String,
}

impl QueryEntry {
    #[must_use]
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }
}

/// Where the query records come from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySource {
    pub path: PathBuf,
    /// Skip the first line.
    #[serde(default)]
    pub header: bool,
    /// Field separator regular expression. Defaults to a tab.
    #[serde(default)]
    pub separator: Option<String>,
}

impl QuerySource {
    /// Reads every entry of the configured file.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Configuration`] when the file cannot be opened or
    /// the separator is invalid, and with [`Error::Parse`] on a short record.
    pub fn read(&self) -> Result<Vec<QueryEntry>> {
        let file = File::open(&self.path).map_err(|err| {
            Error::Configuration(format!(
                "cannot open query file `{}`: {err}",
                self.path.display()
            ))
        })?;
        let separator = separator(self.separator.as_deref())?;
        read_queries(BufReader::new(file), &separator, self.header)
    }
}

/// Compiles a separator expression, defaulting to a tab.
///
/// # Errors
///
/// Fails with [`Error::Configuration`] on an invalid expression.
pub fn separator(pattern: Option<&str>) -> Result<Regex> {
    Regex::new(pattern.unwrap_or("\t"))
        .map_err(|err| Error::Configuration(format!("invalid separator: {err}")))
}

/// Turns delimited records into [`QueryEntry`] values.
///
/// Blank lines are skipped; fields beyond the second are ignored.
///
/// # Errors
///
/// Fails with [`Error::Parse`] naming the line when a record holds fewer
/// than two fields.
pub fn read_queries<R: BufRead>(reader: R, separator: &Regex, header: bool) -> Result<Vec<QueryEntry>> {
    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if header && index == 0 {
            continue;
        }
        let record = line.trim();
        if record.is_empty() {
            continue;
        }
        let mut fields = separator.split(record).map(str::trim);
        let (Some(first), Some(second)) = (fields.next(), fields.next()) else {
            return Err(Error::Parse {
                input: record.to_string(),
                reason: format!("line {}: expected two entities", index + 1),
            });
        };
        entries.push(QueryEntry::new(first, second));
    }
    debug!(entries = entries.len(), "queries_read");
    Ok(entries)
}
