use super::{IcScores, InformationContent, LogBase, Occurrences};

/// Corpus based IC (Resnik, 1995).
///
/// `p(v) = (n(v) + 1) / (Σn + |occurrences|)` and `ic(v) = -log_b(p(v))`.
/// The +1 smoothing keeps `p(v)` in `(0, 1]`, so every score is finite and
/// non negative.
#[derive(Copy, Clone, Debug, Default)]
pub struct Resnik1995 {
    base: LogBase,
}

impl Resnik1995 {
    #[must_use]
    pub fn new(base: LogBase) -> Self {
        Self { base }
    }
}

impl InformationContent for Resnik1995 {
    fn name(&self) -> &'static str {
        "resnik_1995"
    }

    fn compute(&self, occurrences: &Occurrences) -> IcScores {
        let mass: f64 = occurrences
            .values()
            .map(|count| *count as f64 + 1.0)
            .sum();
        occurrences
            .iter()
            .map(|(vertex, count)| {
                // -log(p) written as log(1/p) so that p = 1 yields +0
                (vertex.clone(), self.base.log(mass / (*count as f64 + 1.0)))
            })
            .collect()
    }
}
