//! Per chunk query processing.
//!
//! Every row goes through resolve, presence check, annotation check, scoring
//! and emission. The first fatal condition aborts the chunk; rows emitted
//! before it are dropped with the rest of the chunk buffer.

use std::fmt::Write as _;

use tracing::info;

use super::{BatchMode, DisplayMode, QueryEntry, QueryPolicy, TaskContext};
use crate::measures::ensure_finite;
use crate::ontology::Identifier;
use crate::{Error, Result};

/// What a chunk produced when every row went through.
#[derive(Debug, Default)]
pub(super) struct TaskOutcome {
    pub buffer: String,
    pub substituted: u64,
    pub skipped: u64,
    pub rows: u64,
}

/// Fatal condition raised while processing row `row` of a chunk.
#[derive(Debug)]
pub(super) struct TaskFailure {
    pub row: usize,
    pub error: Error,
}

/// Which check triggered a policy.
#[derive(Copy, Clone, Debug)]
enum Check {
    NotFound,
    NoAnnotation,
}

pub(super) fn run(context: &TaskContext, entries: &[QueryEntry]) -> std::result::Result<TaskOutcome, TaskFailure> {
    let mut outcome = TaskOutcome::default();
    for (row, entry) in entries.iter().enumerate() {
        process(context, entry, &mut outcome).map_err(|error| TaskFailure { row, error })?;
    }
    Ok(outcome)
}

fn process(context: &TaskContext, entry: &QueryEntry, outcome: &mut TaskOutcome) -> Result<()> {
    let settings = &context.settings;
    let first = context.registry.resolve(&entry.first, settings.expand_prefixes)?;
    let second = context.registry.resolve(&entry.second, settings.expand_prefixes)?;

    let graph = context.engine.ancestry().graph();
    let has_first = graph.contains_vertex(&first);
    let has_second = graph.contains_vertex(&second);
    if !has_first || !has_second {
        if !settings.quiet {
            info!(
                first = %first,
                first_found = has_first,
                second = %second,
                second_found = has_second,
                "query_entity_not_found"
            );
        }
        return apply_policy(context, Check::NotFound, entry, &first, &second, outcome, || {
            Error::NotFound {
                entity: if has_first { second.clone() } else { first.clone() },
                graph: graph.name().clone(),
            }
        });
    }

    let mut line = context.label(entry, &first, &second);
    match settings.mode {
        BatchMode::ConceptToConcept => {
            for measure in context.engine.plan().pairwise() {
                let value = context.engine.score_pairwise(measure, &first, &second);
                let value = ensure_finite(value, &measure.config.id, None, &first, &second)?;
                write!(line, "\t{value}").map_err(Error::wrap)?;
            }
        }
        BatchMode::EntityToEntity => {
            let ancestry = context.engine.ancestry();
            let first_classes = ancestry.direct_classes(&first);
            let second_classes = ancestry.direct_classes(&second);
            if first_classes.is_empty() || second_classes.is_empty() {
                if !settings.quiet {
                    info!(
                        first = %first,
                        first_classes = first_classes.len(),
                        second = %second,
                        second_classes = second_classes.len(),
                        "query_entity_without_annotation"
                    );
                }
                return apply_policy(context, Check::NoAnnotation, entry, &first, &second, outcome, || {
                    Error::NoAnnotation {
                        first: first.clone(),
                        first_classes: first_classes.len(),
                        second: second.clone(),
                        second_classes: second_classes.len(),
                    }
                });
            }
            for measure in context.engine.plan().groupwise() {
                let value = context
                    .engine
                    .score_groupwise(measure, &first_classes, &second_classes);
                let value = ensure_finite(
                    value,
                    &measure.config().id,
                    measure.pairwise_id(),
                    &first,
                    &second,
                )?;
                write!(line, "\t{value}").map_err(Error::wrap)?;
            }
        }
    }
    line.push('\n');
    outcome.buffer.push_str(&line);
    outcome.rows += 1;
    Ok(())
}

fn apply_policy(
    context: &TaskContext,
    check: Check,
    entry: &QueryEntry,
    first: &Identifier,
    second: &Identifier,
    outcome: &mut TaskOutcome,
    stop: impl FnOnce() -> Error,
) -> Result<()> {
    let policy = match check {
        Check::NotFound => context.settings.not_found,
        Check::NoAnnotation => context.settings.no_annotation,
    };
    match policy {
        QueryPolicy::Set { score } => {
            let mut line = context.label(entry, first, second);
            for _ in 0..context.columns() {
                write!(line, "\t{score}").map_err(Error::wrap)?;
            }
            line.push('\n');
            outcome.buffer.push_str(&line);
            outcome.substituted += 1;
            outcome.rows += 1;
            Ok(())
        }
        QueryPolicy::Exclude => {
            outcome.skipped += 1;
            Ok(())
        }
        QueryPolicy::Stop => Err(stop()),
    }
}

impl TaskContext {
    /// The two leading columns of a row.
    fn label(&self, entry: &QueryEntry, first: &Identifier, second: &Identifier) -> String {
        match self.settings.display {
            DisplayMode::Short => format!(
                "{}\t{}",
                self.registry.shorten(first),
                self.registry.shorten(second)
            ),
            DisplayMode::Raw => format!("{}\t{}", entry.first, entry.second),
            DisplayMode::LocalName => format!("{}\t{}", first.local_name(), second.local_name()),
        }
    }
}
