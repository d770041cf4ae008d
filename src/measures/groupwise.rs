use std::collections::BTreeSet;

use crate::ontology::Identifier;

use super::{GroupwiseMeasure, Scope};

/// simGIC (Pesquita et al., 2007): IC weighted Jaccard index of the
/// ancestries of both sets.
///
/// NaN when both sets are empty. When every shared and unshared ancestor has
/// a zero IC the score is 1 for identical sets and 0 otherwise.
#[derive(Copy, Clone, Debug, Default)]
pub struct SimGic;

impl GroupwiseMeasure for SimGic {
    fn compute(
        &self,
        scope: &Scope<'_>,
        a: &BTreeSet<Identifier>,
        b: &BTreeSet<Identifier>,
    ) -> f64 {
        let ancestors_a = scope.ancestry.ancestors_of_set(a);
        let ancestors_b = scope.ancestry.ancestors_of_set(b);
        if ancestors_a.is_empty() && ancestors_b.is_empty() {
            return f64::NAN;
        }
        let shared = ic_mass(scope, ancestors_a.intersection(&ancestors_b));
        let union = ic_mass(scope, ancestors_a.union(&ancestors_b));
        if union == 0.0 {
            return if ancestors_a == ancestors_b { 1.0 } else { 0.0 };
        }
        shared / union
    }
}

fn ic_mass<'a>(scope: &Scope<'_>, classes: impl Iterator<Item = &'a Identifier>) -> f64 {
    classes.map(|class| scope.ic.get_or_nan(class)).sum()
}

/// simUI (Gentleman, 2005): Jaccard index of the ancestries of both sets.
#[derive(Copy, Clone, Debug, Default)]
pub struct SimUi;

impl GroupwiseMeasure for SimUi {
    fn requires_ic(&self) -> bool {
        false
    }

    fn compute(
        &self,
        scope: &Scope<'_>,
        a: &BTreeSet<Identifier>,
        b: &BTreeSet<Identifier>,
    ) -> f64 {
        let ancestors_a = scope.ancestry.ancestors_of_set(a);
        let ancestors_b = scope.ancestry.ancestors_of_set(b);
        let union = ancestors_a.union(&ancestors_b).count();
        if union == 0 {
            return f64::NAN;
        }
        ancestors_a.intersection(&ancestors_b).count() as f64 / union as f64
    }
}
