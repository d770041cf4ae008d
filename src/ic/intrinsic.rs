use super::{IcScores, InformationContent, Occurrences};
use crate::ontology::AncestryCache;

/// Intrinsic IC (Seco et al., 2004), defined over descendant counts.
///
/// `ic(v) = 1 - ln(n(v)) / ln(|occurrences|)`, clamped to `[0, 1]`. Counts
/// below 1 are read as 1 (a class is its own descendant). The ratio does not
/// depend on the log base.
#[derive(Copy, Clone, Debug, Default)]
pub struct Seco2004;

impl InformationContent for Seco2004 {
    fn name(&self) -> &'static str {
        "seco_2004"
    }

    fn occurrences(&self, ancestry: &AncestryCache) -> Occurrences {
        ancestry.descendant_counts()
    }

    fn compute(&self, occurrences: &Occurrences) -> IcScores {
        let total = occurrences.len() as f64;
        occurrences
            .iter()
            .map(|(vertex, count)| {
                let ic = if total <= 1.0 {
                    0.0
                } else {
                    let descendants = (*count).max(1) as f64;
                    (1.0 - descendants.ln() / total.ln()).clamp(0.0, 1.0)
                };
                (vertex.clone(), ic)
            })
            .collect()
    }
}
