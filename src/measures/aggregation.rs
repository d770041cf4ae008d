use std::collections::BTreeSet;

use crate::ontology::Identifier;
use crate::{Error, Result};

use super::Aggregation;

/// Pairwise scores of `a × b`, rows following `a` and columns following `b`
/// in set order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreMatrix {
    rows: Vec<Vec<f64>>,
    columns: usize,
}

impl ScoreMatrix {
    /// Evaluates `score` over the cross product of `a` and `b`.
    pub fn build<F>(a: &BTreeSet<Identifier>, b: &BTreeSet<Identifier>, mut score: F) -> Self
    where
        F: FnMut(&Identifier, &Identifier) -> f64,
    {
        let rows = a
            .iter()
            .map(|x| b.iter().map(|y| score(x, y)).collect())
            .collect();
        Self {
            rows,
            columns: b.len(),
        }
    }

    /// Wraps precomputed rows.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Message`] when the rows differ in length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let columns = rows.first().map_or(0, Vec::len);
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns)
        {
            return Err(Error::Message(format!(
                "score matrix row {index} has {} columns, expected {columns}",
                row.len()
            )));
        }
        Ok(Self { rows, columns })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns == 0
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Every score, row by row.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().flatten().copied()
    }

    /// Best score of each row; NaN for a row holding a NaN.
    #[must_use]
    pub fn row_best(&self) -> Vec<f64> {
        self.rows.iter().map(|row| max(row.iter().copied())).collect()
    }

    /// Best score of each column; NaN for a column holding a NaN.
    #[must_use]
    pub fn column_best(&self) -> Vec<f64> {
        (0..self.columns)
            .map(|column| max(self.rows.iter().map(|row| row[column])))
            .collect()
    }
}

/// NaN when `values` is empty or holds a NaN.
fn reduce(values: impl Iterator<Item = f64>, pick: fn(f64, f64) -> f64) -> f64 {
    let mut acc: Option<f64> = None;
    for value in values {
        if value.is_nan() {
            return f64::NAN;
        }
        acc = Some(acc.map_or(value, |current| pick(current, value)));
    }
    acc.unwrap_or(f64::NAN)
}

fn max(values: impl Iterator<Item = f64>) -> f64 {
    reduce(values, f64::max)
}

fn min(values: impl Iterator<Item = f64>) -> f64 {
    reduce(values, f64::min)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0_usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Highest pairwise score.
#[derive(Copy, Clone, Debug, Default)]
pub struct Max;

impl Aggregation for Max {
    fn aggregate(&self, matrix: &ScoreMatrix) -> f64 {
        max(matrix.values())
    }
}

/// Lowest pairwise score.
#[derive(Copy, Clone, Debug, Default)]
pub struct Min;

impl Aggregation for Min {
    fn aggregate(&self, matrix: &ScoreMatrix) -> f64 {
        min(matrix.values())
    }
}

/// Mean of every pairwise score.
#[derive(Copy, Clone, Debug, Default)]
pub struct Average;

impl Aggregation for Average {
    fn aggregate(&self, matrix: &ScoreMatrix) -> f64 {
        mean(matrix.values())
    }
}

/// Best-match average: mean of the row best matches and mean of the column
/// best matches, averaged.
#[derive(Copy, Clone, Debug, Default)]
pub struct BestMatchAverage;

impl Aggregation for BestMatchAverage {
    fn aggregate(&self, matrix: &ScoreMatrix) -> f64 {
        if matrix.is_empty() {
            return f64::NAN;
        }
        let rows = mean(matrix.row_best().into_iter());
        let columns = mean(matrix.column_best().into_iter());
        (rows + columns) / 2.0
    }
}

/// Best-match max: the larger of the two best-match means.
#[derive(Copy, Clone, Debug, Default)]
pub struct BestMatchMax;

impl Aggregation for BestMatchMax {
    fn aggregate(&self, matrix: &ScoreMatrix) -> f64 {
        if matrix.is_empty() {
            return f64::NAN;
        }
        let rows = mean(matrix.row_best().into_iter());
        let columns = mean(matrix.column_best().into_iter());
        max([rows, columns].into_iter())
    }
}

/// Hausdorff style: the weakest best match in either direction.
#[derive(Copy, Clone, Debug, Default)]
pub struct Hausdorff;

impl Aggregation for Hausdorff {
    fn aggregate(&self, matrix: &ScoreMatrix) -> f64 {
        if matrix.is_empty() {
            return f64::NAN;
        }
        let rows = min(matrix.row_best().into_iter());
        let columns = min(matrix.column_best().into_iter());
        min([rows, columns].into_iter())
    }
}
