//! Information content (IC) scoring.
//!
//! An IC formula turns occurrence counts into one score per vertex. Callers
//! only see the [`InformationContent`] contract, so corpus based and
//! structure based formulas are interchangeable.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ontology::{AncestryCache, Identifier};
use crate::{Error, Result};

mod corpus;
mod intrinsic;

pub use corpus::Resnik1995;
pub use intrinsic::Seco2004;

/// Occurrence count per vertex.
pub type Occurrences = BTreeMap<Identifier, u64>;

/// IC score per vertex. Vertices without an occurrence entry have no score.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IcScores {
    scores: HashMap<Identifier, f64>,
}

impl IcScores {
    /// Score of `vertex`, `None` when it was never scored.
    #[must_use]
    pub fn get(&self, vertex: &Identifier) -> Option<f64> {
        self.scores.get(vertex).copied()
    }

    /// Score of `vertex`, or NaN when it was never scored.
    ///
    /// NaN propagates through the measure formulas and is reported as an
    /// arithmetic fault by the caller.
    #[must_use]
    pub fn get_or_nan(&self, vertex: &Identifier) -> f64 {
        self.get(vertex).unwrap_or(f64::NAN)
    }

    /// Returns the number of scored vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether no vertex was scored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl FromIterator<(Identifier, f64)> for IcScores {
    fn from_iter<T: IntoIterator<Item = (Identifier, f64)>>(iter: T) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

/// Logarithm base shared by every score of a computation run.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct LogBase(f64);

impl LogBase {
    pub const NATURAL: Self = Self(std::f64::consts::E);

    /// # Errors
    ///
    /// Fails with [`Error::Configuration`] unless `base` is finite, strictly
    /// positive and different from 1.
    pub fn new(base: f64) -> Result<Self> {
        if base.is_finite() && base > 0.0 && (base - 1.0).abs() > f64::EPSILON {
            Ok(Self(base))
        } else {
            Err(Error::Configuration(format!("invalid log base {base}")))
        }
    }

    /// `log_base(value)`.
    #[must_use]
    pub fn log(self, value: f64) -> f64 {
        if self == Self::NATURAL {
            value.ln()
        } else {
            value.ln() / self.0.ln()
        }
    }

    /// Returns the raw base.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for LogBase {
    fn default() -> Self {
        Self::NATURAL
    }
}

impl TryFrom<f64> for LogBase {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LogBase> for f64 {
    fn from(base: LogBase) -> Self {
        base.0
    }
}

/// Capability shared by every IC formula.
pub trait InformationContent: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Counts this formula is defined over, derived from the graph.
    fn occurrences(&self, ancestry: &AncestryCache) -> Occurrences {
        ancestry.inferred_instance_counts()
    }

    /// Scores every vertex with an entry in `occurrences`. An empty map
    /// yields empty scores.
    fn compute(&self, occurrences: &Occurrences) -> IcScores;
}

/// Registered IC formulas.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IcFormula {
    /// Corpus based IC with Laplace smoothing.
    #[serde(rename = "resnik_1995")]
    Resnik1995,
    /// Intrinsic IC from the number of descendants.
    #[serde(rename = "seco_2004")]
    Seco2004,
}

impl IcFormula {
    /// Instantiates the formula with `base`.
    #[must_use]
    pub fn build(self, base: LogBase) -> Box<dyn InformationContent> {
        match self {
            Self::Resnik1995 => Box::new(Resnik1995::new(base)),
            Self::Seco2004 => Box::new(Seco2004),
        }
    }
}

/// Named IC configuration referenced by measures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IcConfig {
    pub id: String,
    pub formula: IcFormula,
    #[serde(default)]
    pub log_base: LogBase,
}

impl IcConfig {
    /// Configuration `id` using `formula` with the natural log.
    #[must_use]
    pub fn new(id: impl Into<String>, formula: IcFormula) -> Self {
        Self {
            id: id.into(),
            formula,
            log_base: LogBase::default(),
        }
    }

    #[must_use]
    pub fn with_log_base(mut self, log_base: LogBase) -> Self {
        self.log_base = log_base;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct IcKey {
    formula: IcFormula,
    log_base: u64,
}

impl From<&IcConfig> for IcKey {
    fn from(config: &IcConfig) -> Self {
        Self {
            formula: config.formula,
            log_base: config.log_base.value().to_bits(),
        }
    }
}

/// Computes IC scores once per (formula, log base) and keeps them.
pub struct IcEngine {
    ancestry: Arc<AncestryCache>,
    scores: Cache<IcKey, Arc<IcScores>>,
}

impl IcEngine {
    /// Creates an engine with an empty score cache.
    #[must_use]
    pub fn new(ancestry: Arc<AncestryCache>) -> Self {
        Self {
            ancestry,
            scores: Cache::builder().name("ic_scores").build(),
        }
    }

    /// Returns the scores for `config`, computing them on first use.
    pub fn scores(&self, config: &IcConfig) -> Arc<IcScores> {
        self.scores.get_with(IcKey::from(config), || {
            let formula = config.formula.build(config.log_base);
            let occurrences = formula.occurrences(&self.ancestry);
            let scores = formula.compute(&occurrences);
            info!(
                ic = %config.id,
                formula = formula.name(),
                scored = scores.len(),
                "ic_scores_computed"
            );
            Arc::new(scores)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::{IcConfig, IcEngine, IcFormula, LogBase};
    use crate::ontology::{AncestryCache, Graph, Identifier, INSTANCE_OF, SUBCLASS_OF};
    use crate::Error;

    fn id(text: &str) -> Identifier {
        Identifier::new(format!("http://example.org/{text}")).expect("valid identifier")
    }

    fn engine() -> Arc<IcEngine> {
        let sub = Identifier::new(SUBCLASS_OF).expect("subclass");
        let isa = Identifier::new(INSTANCE_OF).expect("type");
        let mut graph = Graph::new(id("g"));
        graph.add_statement(id("Dog"), sub.clone(), id("Mammal"));
        graph.add_statement(id("Cat"), sub, id("Mammal"));
        graph.add_statement(id("Fido"), isa, id("Dog"));
        Arc::new(IcEngine::new(Arc::new(AncestryCache::new(Arc::new(graph)))))
    }

    #[test]
    fn scores_are_computed_once_per_formula_and_base() {
        let engine = engine();
        let config = IcConfig::new("corpus", IcFormula::Resnik1995);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let config = config.clone();
                thread::spawn(move || engine.scores(&config))
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .collect();
        let first = &results[0];
        assert!(results.iter().all(|scores| Arc::ptr_eq(first, scores)));
        assert_eq!(first.len(), 3);

        // same formula and base under another id shares the entry
        let alias = IcConfig::new("alias", IcFormula::Resnik1995);
        assert!(Arc::ptr_eq(first, &engine.scores(&alias)));

        let base_two = config
            .clone()
            .with_log_base(LogBase::new(2.0).expect("base 2"));
        assert!(!Arc::ptr_eq(first, &engine.scores(&base_two)));
        let intrinsic = IcConfig::new("intrinsic", IcFormula::Seco2004);
        assert!(!Arc::ptr_eq(first, &engine.scores(&intrinsic)));
    }

    #[test]
    fn log_base_rejects_degenerate_values() {
        assert!(matches!(LogBase::new(1.0), Err(Error::Configuration(_))));
        assert!(matches!(LogBase::new(0.0), Err(Error::Configuration(_))));
        assert!(matches!(LogBase::new(f64::NAN), Err(Error::Configuration(_))));
        let two = LogBase::new(2.0).expect("base 2");
        assert!((two.log(8.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn log_base_deserializes_from_a_number() {
        let base: LogBase = serde_yaml::from_str("10").expect("base 10");
        assert!((base.log(1000.0) - 3.0).abs() < 1e-12);
        assert!(serde_yaml::from_str::<LogBase>("1").is_err());
    }
}
