//! Parallel batch scoring of query entries.
//!
//! The query list is split into fixed size chunks up front. Each chunk runs
//! on the blocking pool, at most `workers` at a time, with its own buffer and
//! counters. The coordinator joins every task in submission order, so the
//! output does not depend on completion order, then either concatenates the
//! buffers or re-raises the first fatal error once all tasks are done.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{error, info};
use validator::Validate;

use crate::measures::SimilarityEngine;
use crate::ontology::IdentifierRegistry;
use crate::{Error, Result};

mod query;
mod task;

pub use query::{read_queries, separator, QueryEntry, QuerySource};

/// What to do with a row whose entity is missing or unannotated.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum QueryPolicy {
    /// Emit the row with `score` in every measure column.
    Set { score: f64 },
    /// Drop the row.
    Exclude,
    /// Abort the task.
    #[default]
    Stop,
}

/// What the two compared entities are.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Entities compared through their direct classes with the groupwise
    /// measures.
    #[default]
    EntityToEntity,
    /// Vertices compared directly with the pairwise measures.
    ConceptToConcept,
}

/// How the two leading columns of a row are rendered.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// `prefix:local` when a namespace matches, the full IRI otherwise.
    #[default]
    Short,
    /// The query strings as given.
    Raw,
    /// Fragment after the last `#` or `/`.
    LocalName,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct BatchSettings {
    #[serde(default)]
    pub mode: BatchMode,
    #[serde(default = "default_workers")]
    #[validate(range(min = 1))]
    pub workers: usize,
    #[serde(default = "default_chunk_size")]
    #[validate(range(min = 1))]
    pub chunk_size: usize,
    #[serde(default)]
    pub display: DisplayMode,
    #[serde(default = "default_expand_prefixes")]
    pub expand_prefixes: bool,
    /// Silences the per row policy events.
    #[serde(default)]
    pub quiet: bool,
    #[serde(default)]
    pub not_found: QueryPolicy,
    #[serde(default)]
    pub no_annotation: QueryPolicy,
}

fn default_workers() -> usize {
    1
}

fn default_chunk_size() -> usize {
    1000
}

fn default_expand_prefixes() -> bool {
    true
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            mode: BatchMode::default(),
            workers: default_workers(),
            chunk_size: default_chunk_size(),
            display: DisplayMode::default(),
            expand_prefixes: default_expand_prefixes(),
            quiet: false,
            not_found: QueryPolicy::default(),
            no_annotation: QueryPolicy::default(),
        }
    }
}

/// Aggregated output of a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// Tab separated rows, newline terminated, in query order.
    pub output: String,
    pub substituted: u64,
    pub skipped: u64,
    pub rows: u64,
}

/// Shared read-only state handed to every task.
pub(crate) struct TaskContext {
    engine: Arc<SimilarityEngine>,
    registry: Arc<IdentifierRegistry>,
    settings: BatchSettings,
}

impl TaskContext {
    /// Number of score columns in a row.
    fn columns(&self) -> usize {
        match self.settings.mode {
            BatchMode::EntityToEntity => self.engine.plan().groupwise().len(),
            BatchMode::ConceptToConcept => self.engine.plan().pairwise().len(),
        }
    }
}

pub struct BatchQueryProcessor {
    context: Arc<TaskContext>,
}

impl BatchQueryProcessor {
    /// # Errors
    ///
    /// Fails with [`Error::Configuration`] when the pool or chunk size is 0.
    pub fn new(
        engine: Arc<SimilarityEngine>,
        registry: Arc<IdentifierRegistry>,
        settings: BatchSettings,
    ) -> Result<Self> {
        settings
            .validate()
            .map_err(|err| Error::Configuration(format!("invalid batch settings: {err}")))?;
        Ok(Self {
            context: Arc::new(TaskContext {
                engine,
                registry,
                settings,
            }),
        })
    }

    #[must_use]
    pub fn settings(&self) -> &BatchSettings {
        &self.context.settings
    }

    /// Header row naming the score columns, newline terminated.
    #[must_use]
    pub fn header(&self) -> String {
        let plan = self.context.engine.plan();
        let ids: Vec<&str> = match self.context.settings.mode {
            BatchMode::EntityToEntity => plan
                .groupwise()
                .iter()
                .map(|measure| measure.config().id.as_str())
                .collect(),
            BatchMode::ConceptToConcept => plan
                .pairwise()
                .iter()
                .map(|measure| measure.config.id.as_str())
                .collect(),
        };
        let mut header = String::from("first\tsecond");
        for id in ids {
            header.push('\t');
            header.push_str(id);
        }
        header.push('\n');
        header
    }

    /// Scores every entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Task`] wrapping the first fatal error, by task order,
    /// once every task has finished.
    pub async fn run(&self, entries: Vec<QueryEntry>) -> Result<BatchResult> {
        let settings = &self.context.settings;
        let chunks: Vec<Vec<QueryEntry>> = entries
            .chunks(settings.chunk_size.max(1))
            .map(<[QueryEntry]>::to_vec)
            .collect();
        let total = chunks.len();
        info!(
            entries = entries.len(),
            tasks = total,
            workers = settings.workers,
            "batch_started"
        );

        let permits = Arc::new(Semaphore::new(settings.workers.max(1)));
        let mut handles = Vec::with_capacity(total);
        for chunk in chunks {
            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .map_err(Error::wrap)?;
            let context = Arc::clone(&self.context);
            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                task::run(&context, &chunk)
            }));
        }

        let mut result = BatchResult::default();
        let mut failures = Vec::new();
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(outcome)) => {
                    result.output.push_str(&outcome.buffer);
                    result.substituted += outcome.substituted;
                    result.skipped += outcome.skipped;
                    result.rows += outcome.rows;
                }
                Ok(Err(failure)) => {
                    error!(task = index, row = failure.row, error = %failure.error, "query_task_failed");
                    failures.push((index, failure.row, failure.error));
                }
                Err(err) => {
                    error!(task = index, error = %err, "query_task_panicked");
                    failures.push((index, 0, Error::Join(err)));
                }
            }
        }

        let failed = failures.len();
        if let Some((task, row, source)) = failures.into_iter().next() {
            return Err(Error::Task {
                task,
                row,
                failed,
                total,
                source: Box::new(source),
            });
        }

        info!(
            rows = result.rows,
            substituted = result.substituted,
            skipped = result.skipped,
            "batch_completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policies_deserialize_from_tagged_maps() {
        let set: QueryPolicy = serde_yaml::from_str("{ action: set, score: -1 }").expect("set");
        assert_eq!(set, QueryPolicy::Set { score: -1.0 });
        let exclude: QueryPolicy = serde_yaml::from_str("action: exclude").expect("exclude");
        assert_eq!(exclude, QueryPolicy::Exclude);
    }

    #[test]
    fn settings_default_to_a_single_worker() {
        let settings: BatchSettings = serde_yaml::from_str("{}").expect("settings");
        assert_eq!(settings, BatchSettings::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn zero_workers_fail_validation() {
        let settings = BatchSettings {
            workers: 0,
            ..BatchSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
