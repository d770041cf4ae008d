//! Crate wide error type.
//!
//! Configuration and parse errors abort the operation that raised them.
//! Lookup and annotation errors are recoverable per row unless the query
//! policy says otherwise. Arithmetic faults are always fatal.

use crate::ontology::{Identifier, IdentifierError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cannot parse `{input}`: {reason}")]
    Parse { input: String, reason: String },

    #[error("cannot locate `{entity}` in `{graph}`")]
    NotFound {
        entity: Identifier,
        graph: Identifier,
    },

    #[error(
        "entry contains an element without annotations: `{first}` (annotations = {first_classes}) / `{second}` (annotations = {second_classes}); exclude those entries or set a value"
    )]
    NoAnnotation {
        first: Identifier,
        first_classes: usize,
        second: Identifier,
        second_classes: usize,
    },

    #[error("measure `{measure}`{} produced {value} for `{first}` / `{second}`", pairwise_note(.pairwise))]
    Arithmetic {
        measure: String,
        pairwise: Option<String>,
        first: Identifier,
        second: Identifier,
        value: f64,
    },

    #[error("query task {task} failed at row {row} ({failed} of {total} tasks failed): {source}")]
    Task {
        task: usize,
        row: usize,
        failed: usize,
        total: usize,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Any(#[from] Box<dyn std::error::Error + Send + Sync>),
}

fn pairwise_note(pairwise: &Option<String>) -> String {
    pairwise
        .as_ref()
        .map(|id| format!(" over pairwise `{id}`"))
        .unwrap_or_default()
}

impl Error {
    pub fn wrap(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Any(Box::new(err))
    }

    pub fn msg(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Message(err.to_string())
    }

    /// Returns the innermost error, looking through [`Error::Task`].
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Task { source, .. } => source.root(),
            other => other,
        }
    }
}
