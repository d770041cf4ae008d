//! Wiring of a configured run: identifier registry, frozen graph, measure
//! plan and batch processor.

use std::sync::Arc;

use tracing::info;

use crate::batch::{BatchQueryProcessor, BatchResult};
use crate::config::Config;
use crate::measures::{MeasurePlan, MeasureRegistry, SimilarityEngine};
use crate::ontology::{load_graph, AncestryCache, Graph, IdentifierRegistry};
use crate::Result;

/// Everything a batch needs, built once from a [`Config`].
pub struct Session {
    pub registry: Arc<IdentifierRegistry>,
    pub graph: Arc<Graph>,
    pub engine: Arc<SimilarityEngine>,
    pub processor: BatchQueryProcessor,
}

impl Session {
    /// Builds a session with the built in measure table.
    ///
    /// # Errors
    ///
    /// See [`Session::with_measures`].
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_measures(config, &MeasureRegistry::default())
    }

    /// Builds a session resolving measure flags against `measures`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid graph name, a loader failure, an unresolved
    /// measure or invalid batch settings. Nothing is scored before every
    /// check passed.
    pub fn with_measures(config: &Config, measures: &MeasureRegistry) -> Result<Self> {
        let registry = Arc::new(config.registry());
        let plan = MeasurePlan::resolve(&config.measures, &config.ic, measures)?;
        let name = registry.resolve(&config.graph.name, true)?;
        let graph = Arc::new(load_graph(&name, &config.graph.sources, &registry)?);
        let ancestry = Arc::new(AncestryCache::new(Arc::clone(&graph)));
        let engine = Arc::new(SimilarityEngine::new(ancestry, plan));
        let processor = BatchQueryProcessor::new(
            Arc::clone(&engine),
            Arc::clone(&registry),
            config.batch.clone(),
        )?;
        Ok(Self {
            registry,
            graph,
            engine,
            processor,
        })
    }

    /// Reads the configured queries and scores them.
    ///
    /// # Errors
    ///
    /// Propagates query reading and batch failures.
    pub async fn run(&self, config: &Config) -> Result<BatchResult> {
        let entries = config.queries.read()?;
        info!(path = %config.queries.path.display(), entries = entries.len(), "queries_loaded");
        self.processor.run(entries).await
    }
}
