//! Similarity measure dispatch.
//!
//! Measures are selected from configuration by flag through lookup tables
//! ([`MeasureRegistry`]): one table of pairwise measures, one of standalone
//! groupwise measures and one of aggregation rules turning a pairwise
//! measure into a groupwise one ("add-on" measures). A [`MeasurePlan`]
//! resolves the configured measures against those tables once, before any
//! query is scored.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ic::{IcConfig, IcEngine, IcFormula, IcScores};
use crate::ontology::{AncestryCache, Identifier};
use crate::{Error, Result};

mod aggregation;
mod groupwise;
mod pairwise;

pub use aggregation::{Average, BestMatchAverage, BestMatchMax, Hausdorff, Max, Min, ScoreMatrix};
pub use groupwise::{SimGic, SimUi};
pub use pairwise::{JaccardAncestors, JiangConrath1997, Lin1998, Resnik1995Mica};

/// Read-only view handed to measures.
pub struct Scope<'a> {
    pub ancestry: &'a AncestryCache,
    pub ic: &'a IcScores,
}

/// Similarity between two single vertices.
pub trait PairwiseMeasure: Send + Sync {
    /// Whether the measure reads IC scores.
    fn requires_ic(&self) -> bool {
        true
    }

    fn compute(&self, scope: &Scope<'_>, a: &Identifier, b: &Identifier) -> f64;
}

/// Similarity between two sets of classes, computed directly.
pub trait GroupwiseMeasure: Send + Sync {
    fn requires_ic(&self) -> bool {
        true
    }

    fn compute(&self, scope: &Scope<'_>, a: &BTreeSet<Identifier>, b: &BTreeSet<Identifier>)
        -> f64;
}

/// Reduction of a pairwise score matrix into one groupwise score.
pub trait Aggregation: Send + Sync {
    fn aggregate(&self, matrix: &ScoreMatrix) -> f64;
}

/// Measure entry of the configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureConfig {
    /// Unique name of the measure; also the output column header.
    pub id: String,
    /// Registry key selecting the formula.
    pub flag: String,
    /// IC configuration id, for measures reading IC scores.
    #[serde(default)]
    pub ic: Option<String>,
    /// Pairwise measure id, for add-on groupwise measures.
    #[serde(default)]
    pub pairwise_measure: Option<String>,
}

impl MeasureConfig {
    #[must_use]
    pub fn new(id: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            flag: flag.into(),
            ic: None,
            pairwise_measure: None,
        }
    }

    #[must_use]
    pub fn with_ic(mut self, ic: impl Into<String>) -> Self {
        self.ic = Some(ic.into());
        self
    }

    #[must_use]
    pub fn over_pairwise(mut self, pairwise: impl Into<String>) -> Self {
        self.pairwise_measure = Some(pairwise.into());
        self
    }
}

/// Configured pairwise and groupwise measures, in output order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureSettings {
    #[serde(default)]
    pub pairwise: Vec<MeasureConfig>,
    #[serde(default)]
    pub groupwise: Vec<MeasureConfig>,
}

/// Flag → implementation tables.
pub struct MeasureRegistry {
    pairwise: HashMap<String, Arc<dyn PairwiseMeasure>>,
    groupwise: HashMap<String, Arc<dyn GroupwiseMeasure>>,
    add_ons: HashMap<String, Arc<dyn Aggregation>>,
}

impl Default for MeasureRegistry {
    fn default() -> Self {
        Self::empty()
            .with_pairwise("resnik_1995", Resnik1995Mica)
            .with_pairwise("lin_1998", Lin1998)
            .with_pairwise("jiang_conrath_1997", JiangConrath1997)
            .with_pairwise("jaccard_ancestors", JaccardAncestors)
            .with_groupwise("sim_gic", SimGic)
            .with_groupwise("sim_ui", SimUi)
            .with_add_on("max", Max)
            .with_add_on("min", Min)
            .with_add_on("average", Average)
            .with_add_on("bma", BestMatchAverage)
            .with_add_on("bmm", BestMatchMax)
            .with_add_on("hausdorff", Hausdorff)
    }
}

impl MeasureRegistry {
    /// Registry without any entry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            pairwise: HashMap::new(),
            groupwise: HashMap::new(),
            add_ons: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_pairwise(
        mut self,
        flag: impl Into<String>,
        measure: impl PairwiseMeasure + 'static,
    ) -> Self {
        self.pairwise.insert(flag.into(), Arc::new(measure));
        self
    }

    #[must_use]
    pub fn with_groupwise(
        mut self,
        flag: impl Into<String>,
        measure: impl GroupwiseMeasure + 'static,
    ) -> Self {
        self.groupwise.insert(flag.into(), Arc::new(measure));
        self
    }

    #[must_use]
    pub fn with_add_on(mut self, flag: impl Into<String>, rule: impl Aggregation + 'static) -> Self {
        self.add_ons.insert(flag.into(), Arc::new(rule));
        self
    }

    /// Whether `flag` names an add-on groupwise measure.
    #[must_use]
    pub fn is_add_on(&self, flag: &str) -> bool {
        self.add_ons.contains_key(flag)
    }
}

/// Pairwise measure bound to its implementation and IC configuration.
#[derive(Clone)]
pub struct ResolvedPairwise {
    pub config: MeasureConfig,
    measure: Arc<dyn PairwiseMeasure>,
    ic: Option<IcConfig>,
}

/// Groupwise measure bound to its implementation.
#[derive(Clone)]
pub enum ResolvedGroupwise {
    Standalone {
        config: MeasureConfig,
        measure: Arc<dyn GroupwiseMeasure>,
        ic: Option<IcConfig>,
    },
    AddOn {
        config: MeasureConfig,
        aggregation: Arc<dyn Aggregation>,
        pairwise: ResolvedPairwise,
    },
}

impl ResolvedGroupwise {
    #[must_use]
    pub fn config(&self) -> &MeasureConfig {
        match self {
            Self::Standalone { config, .. } | Self::AddOn { config, .. } => config,
        }
    }

    /// Id of the composed pairwise measure, for add-on measures.
    #[must_use]
    pub fn pairwise_id(&self) -> Option<&str> {
        match self {
            Self::Standalone { .. } => None,
            Self::AddOn { pairwise, .. } => Some(pairwise.config.id.as_str()),
        }
    }
}

/// Configured measures resolved against a [`MeasureRegistry`].
#[derive(Clone, Default)]
pub struct MeasurePlan {
    pairwise: Vec<ResolvedPairwise>,
    groupwise: Vec<ResolvedGroupwise>,
}

impl MeasurePlan {
    /// Resolves every configured measure.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Configuration`] on an unknown flag, an unknown IC
    /// configuration, a duplicate measure id, or an add-on measure whose
    /// pairwise measure is missing or not configured.
    pub fn resolve(
        settings: &MeasureSettings,
        ic_configs: &[IcConfig],
        registry: &MeasureRegistry,
    ) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for config in settings.pairwise.iter().chain(&settings.groupwise) {
            if !seen.insert(config.id.as_str()) {
                return Err(Error::Configuration(format!(
                    "measure id `{}` is declared twice",
                    config.id
                )));
            }
        }

        let pairwise = settings
            .pairwise
            .iter()
            .map(|config| {
                let measure = registry.pairwise.get(&config.flag).cloned().ok_or_else(|| {
                    Error::Configuration(format!(
                        "unknown pairwise measure flag `{}` for `{}`",
                        config.flag, config.id
                    ))
                })?;
                let ic = resolve_ic(config, measure.requires_ic(), ic_configs)?;
                Ok(ResolvedPairwise {
                    config: config.clone(),
                    measure,
                    ic,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let groupwise = settings
            .groupwise
            .iter()
            .map(|config| {
                if let Some(aggregation) = registry.add_ons.get(&config.flag) {
                    let pairwise_id = config.pairwise_measure.as_deref().ok_or_else(|| {
                        Error::Configuration(format!(
                            "groupwise measure `{}` requires a `pairwise_measure`",
                            config.id
                        ))
                    })?;
                    let pairwise = pairwise
                        .iter()
                        .find(|candidate| candidate.config.id == pairwise_id)
                        .cloned()
                        .ok_or_else(|| {
                            Error::Configuration(format!(
                                "cannot locate configuration associated to pairwise measure `{pairwise_id}`"
                            ))
                        })?;
                    return Ok(ResolvedGroupwise::AddOn {
                        config: config.clone(),
                        aggregation: Arc::clone(aggregation),
                        pairwise,
                    });
                }
                let measure = registry.groupwise.get(&config.flag).cloned().ok_or_else(|| {
                    Error::Configuration(format!(
                        "unknown groupwise measure flag `{}` for `{}`",
                        config.flag, config.id
                    ))
                })?;
                let ic = resolve_ic(config, measure.requires_ic(), ic_configs)?;
                Ok(ResolvedGroupwise::Standalone {
                    config: config.clone(),
                    measure,
                    ic,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            pairwise = pairwise.len(),
            groupwise = groupwise.len(),
            "measure_plan_resolved"
        );
        Ok(Self {
            pairwise,
            groupwise,
        })
    }

    #[must_use]
    pub fn pairwise(&self) -> &[ResolvedPairwise] {
        &self.pairwise
    }

    #[must_use]
    pub fn groupwise(&self) -> &[ResolvedGroupwise] {
        &self.groupwise
    }

    fn find_pairwise(&self, id: &str) -> Result<&ResolvedPairwise> {
        self.pairwise
            .iter()
            .find(|measure| measure.config.id == id)
            .ok_or_else(|| Error::Configuration(format!("unknown pairwise measure `{id}`")))
    }

    fn find_groupwise(&self, id: &str) -> Result<&ResolvedGroupwise> {
        self.groupwise
            .iter()
            .find(|measure| measure.config().id == id)
            .ok_or_else(|| Error::Configuration(format!("unknown groupwise measure `{id}`")))
    }
}

fn resolve_ic(
    config: &MeasureConfig,
    requires_ic: bool,
    ic_configs: &[IcConfig],
) -> Result<Option<IcConfig>> {
    if !requires_ic {
        return Ok(None);
    }
    match config.ic.as_deref() {
        None => Ok(Some(IcConfig::new("resnik_1995", IcFormula::Resnik1995))),
        Some(id) => ic_configs
            .iter()
            .find(|candidate| candidate.id == id)
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "measure `{}` references unknown IC configuration `{id}`",
                    config.id
                ))
            }),
    }
}

/// Computes configured similarity scores over a frozen graph.
///
/// Scores are returned as is; callers decide what a NaN or infinite score
/// means for them (see [`ensure_finite`]).
pub struct SimilarityEngine {
    ancestry: Arc<AncestryCache>,
    ic: IcEngine,
    plan: MeasurePlan,
}

impl SimilarityEngine {
    #[must_use]
    pub fn new(ancestry: Arc<AncestryCache>, plan: MeasurePlan) -> Self {
        Self {
            ic: IcEngine::new(Arc::clone(&ancestry)),
            ancestry,
            plan,
        }
    }

    #[must_use]
    pub fn ancestry(&self) -> &AncestryCache {
        &self.ancestry
    }

    #[must_use]
    pub fn plan(&self) -> &MeasurePlan {
        &self.plan
    }

    /// Scores `a` and `b` with the pairwise measure `measure_id`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Configuration`] when the measure is not part of
    /// the plan.
    pub fn pairwise(&self, measure_id: &str, a: &Identifier, b: &Identifier) -> Result<f64> {
        Ok(self.score_pairwise(self.plan.find_pairwise(measure_id)?, a, b))
    }

    /// Scores two class sets with the standalone groupwise measure
    /// `measure_id`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Configuration`] when the measure is unknown or is
    /// an add-on measure.
    pub fn groupwise_standalone(
        &self,
        measure_id: &str,
        a: &BTreeSet<Identifier>,
        b: &BTreeSet<Identifier>,
    ) -> Result<f64> {
        match self.plan.find_groupwise(measure_id)? {
            standalone @ ResolvedGroupwise::Standalone { .. } => {
                Ok(self.score_groupwise(standalone, a, b))
            }
            ResolvedGroupwise::AddOn { .. } => Err(Error::Configuration(format!(
                "groupwise measure `{measure_id}` is an add-on measure"
            ))),
        }
    }

    /// Scores two class sets by aggregating `pairwise_id` with the add-on
    /// rule of `group_measure_id`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Configuration`] when either measure is unknown or
    /// the group measure is not an add-on measure.
    pub fn groupwise_addon(
        &self,
        group_measure_id: &str,
        pairwise_id: &str,
        a: &BTreeSet<Identifier>,
        b: &BTreeSet<Identifier>,
    ) -> Result<f64> {
        let ResolvedGroupwise::AddOn { aggregation, .. } =
            self.plan.find_groupwise(group_measure_id)?
        else {
            return Err(Error::Configuration(format!(
                "groupwise measure `{group_measure_id}` is not an add-on measure"
            )));
        };
        let pairwise = self.plan.find_pairwise(pairwise_id)?;
        Ok(self.aggregate(aggregation.as_ref(), pairwise, a, b))
    }

    /// Scores two class sets with the groupwise measure `measure_id`,
    /// whatever its kind.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Configuration`] when the measure is unknown.
    pub fn groupwise(
        &self,
        measure_id: &str,
        a: &BTreeSet<Identifier>,
        b: &BTreeSet<Identifier>,
    ) -> Result<f64> {
        Ok(self.score_groupwise(self.plan.find_groupwise(measure_id)?, a, b))
    }

    /// Scores with an already resolved pairwise measure.
    #[must_use]
    pub fn score_pairwise(&self, measure: &ResolvedPairwise, a: &Identifier, b: &Identifier) -> f64 {
        let ic = self.ic_scores(measure.ic.as_ref());
        let scope = Scope {
            ancestry: &self.ancestry,
            ic: &ic,
        };
        measure.measure.compute(&scope, a, b)
    }

    /// Scores with an already resolved groupwise measure.
    #[must_use]
    pub fn score_groupwise(
        &self,
        measure: &ResolvedGroupwise,
        a: &BTreeSet<Identifier>,
        b: &BTreeSet<Identifier>,
    ) -> f64 {
        match measure {
            ResolvedGroupwise::Standalone { measure, ic, .. } => {
                let ic = self.ic_scores(ic.as_ref());
                let scope = Scope {
                    ancestry: &self.ancestry,
                    ic: &ic,
                };
                measure.compute(&scope, a, b)
            }
            ResolvedGroupwise::AddOn {
                aggregation,
                pairwise,
                ..
            } => self.aggregate(aggregation.as_ref(), pairwise, a, b),
        }
    }

    fn aggregate(
        &self,
        aggregation: &dyn Aggregation,
        pairwise: &ResolvedPairwise,
        a: &BTreeSet<Identifier>,
        b: &BTreeSet<Identifier>,
    ) -> f64 {
        let matrix = ScoreMatrix::build(a, b, |x, y| self.score_pairwise(pairwise, x, y));
        aggregation.aggregate(&matrix)
    }

    fn ic_scores(&self, config: Option<&IcConfig>) -> Arc<IcScores> {
        config.map(|config| self.ic.scores(config)).unwrap_or_default()
    }
}

/// Turns a NaN or infinite score into an [`Error::Arithmetic`].
///
/// # Errors
///
/// Fails when `value` is not finite.
pub fn ensure_finite(
    value: f64,
    measure: &str,
    pairwise: Option<&str>,
    first: &Identifier,
    second: &Identifier,
) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::Arithmetic {
            measure: measure.to_string(),
            pairwise: pairwise.map(str::to_string),
            first: first.clone(),
            second: second.clone(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MeasureSettings {
        MeasureSettings {
            pairwise: vec![MeasureConfig::new("lin", "lin_1998")],
            groupwise: vec![
                MeasureConfig::new("bma_lin", "bma").over_pairwise("lin"),
                MeasureConfig::new("gic", "sim_gic"),
            ],
        }
    }

    #[test]
    fn resolves_add_on_and_standalone_measures() {
        let plan = MeasurePlan::resolve(&settings(), &[], &MeasureRegistry::default())
            .expect("resolved");
        assert_eq!(plan.groupwise().len(), 2);
        assert_eq!(plan.groupwise()[0].pairwise_id(), Some("lin"));
        assert_eq!(plan.groupwise()[1].pairwise_id(), None);
    }

    #[test]
    fn add_on_without_configured_pairwise_is_rejected() {
        let mut settings = settings();
        settings.groupwise[0].pairwise_measure = Some("resnik".to_string());
        let err = MeasurePlan::resolve(&settings, &[], &MeasureRegistry::default())
            .err()
            .expect("unresolved pairwise");
        assert!(matches!(err, Error::Configuration(message) if message.contains("resnik")));
    }

    #[test]
    fn add_on_without_reference_is_rejected() {
        let mut settings = settings();
        settings.groupwise[0].pairwise_measure = None;
        assert!(matches!(
            MeasurePlan::resolve(&settings, &[], &MeasureRegistry::default()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn unknown_flags_and_ic_are_rejected() {
        let mut settings = settings();
        settings.groupwise[1].flag = "sim_unknown".to_string();
        assert!(matches!(
            MeasurePlan::resolve(&settings, &[], &MeasureRegistry::default()),
            Err(Error::Configuration(_))
        ));

        let mut settings = self::settings();
        settings.pairwise[0].ic = Some("missing".to_string());
        assert!(matches!(
            MeasurePlan::resolve(&settings, &[], &MeasureRegistry::default()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn non_finite_scores_are_arithmetic_faults() {
        let a = Identifier::new("http://example.org/a").expect("a");
        let b = Identifier::new("http://example.org/b").expect("b");
        assert_eq!(ensure_finite(0.5, "m", None, &a, &b).expect("finite"), 0.5);
        let err = ensure_finite(f64::INFINITY, "m", Some("p"), &a, &b).expect_err("infinite");
        assert!(matches!(err, Error::Arithmetic { ref measure, .. } if measure == "m"));
        assert!(err.to_string().contains("over pairwise `p`"));
    }
}
