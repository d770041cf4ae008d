use crate::ontology::Identifier;

use super::{PairwiseMeasure, Scope};

/// IC of the most informative common ancestor of `a` and `b`.
///
/// 0 when the two vertices share no ancestor; NaN when a common ancestor
/// has no IC score.
fn mica(scope: &Scope<'_>, a: &Identifier, b: &Identifier) -> f64 {
    let ancestors_a = scope.ancestry.ancestors(a);
    let ancestors_b = scope.ancestry.ancestors(b);
    ancestors_a
        .intersection(&ancestors_b)
        .map(|ancestor| scope.ic.get_or_nan(ancestor))
        .fold(0.0, |best, ic| {
            if best.is_nan() || ic.is_nan() {
                f64::NAN
            } else {
                best.max(ic)
            }
        })
}

/// Resnik (1995): IC of the most informative common ancestor.
#[derive(Copy, Clone, Debug, Default)]
pub struct Resnik1995Mica;

impl PairwiseMeasure for Resnik1995Mica {
    fn compute(&self, scope: &Scope<'_>, a: &Identifier, b: &Identifier) -> f64 {
        mica(scope, a, b)
    }
}

/// Lin (1998): `2·IC(mica) / (IC(a) + IC(b))`.
///
/// NaN as soon as `a`, `b` or a common ancestor is unscored, identical
/// inputs included.
#[derive(Copy, Clone, Debug, Default)]
pub struct Lin1998;

impl PairwiseMeasure for Lin1998 {
    fn compute(&self, scope: &Scope<'_>, a: &Identifier, b: &Identifier) -> f64 {
        let denominator = scope.ic.get_or_nan(a) + scope.ic.get_or_nan(b);
        if denominator.is_nan() {
            return f64::NAN;
        }
        let shared = mica(scope, a, b);
        if shared.is_nan() {
            return f64::NAN;
        }
        if a == b {
            return 1.0;
        }
        if denominator == 0.0 {
            return 0.0;
        }
        2.0 * shared / denominator
    }
}

/// Jiang & Conrath (1997) distance, turned into a similarity with
/// `1 / (1 + distance)`.
#[derive(Copy, Clone, Debug, Default)]
pub struct JiangConrath1997;

impl PairwiseMeasure for JiangConrath1997 {
    fn compute(&self, scope: &Scope<'_>, a: &Identifier, b: &Identifier) -> f64 {
        let distance = scope.ic.get_or_nan(a) + scope.ic.get_or_nan(b) - 2.0 * mica(scope, a, b);
        1.0 / (1.0 + distance)
    }
}

/// Jaccard index of the two ancestries.
#[derive(Copy, Clone, Debug, Default)]
pub struct JaccardAncestors;

impl PairwiseMeasure for JaccardAncestors {
    fn requires_ic(&self) -> bool {
        false
    }

    fn compute(&self, scope: &Scope<'_>, a: &Identifier, b: &Identifier) -> f64 {
        let ancestors_a = scope.ancestry.ancestors(a);
        let ancestors_b = scope.ancestry.ancestors(b);
        let shared = ancestors_a.intersection(&ancestors_b).count() as f64;
        let union = ancestors_a.union(&ancestors_b).count() as f64;
        shared / union
    }
}
