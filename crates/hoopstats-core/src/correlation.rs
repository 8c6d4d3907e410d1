// Pearson correlation matrix over the numeric columns of a table.

use crate::model::{ColumnKind, Tabular};

/// Square, symmetric matrix of pairwise Pearson correlations.
///
/// Pairs are computed over rows where both cells are numbers. A pair with
/// fewer than two such rows, or where one side does not vary, is NaN. The
/// diagonal is always 1.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    labels: Vec<String>,
    values: Vec<f64>,
}

impl CorrelationMatrix {
    pub fn from_table<T: Tabular + ?Sized>(table: &T) -> Self {
        let numeric: Vec<usize> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ColumnKind::Number)
            .map(|(i, _)| i)
            .collect();
        let labels: Vec<String> = numeric
            .iter()
            .map(|&i| table.columns()[i].name.clone())
            .collect();

        let series: Vec<Vec<Option<f64>>> = numeric
            .iter()
            .map(|&col| {
                (0..table.row_count())
                    .map(|r| table.row(r)[col].as_number())
                    .collect()
            })
            .collect();

        let n = labels.len();
        let mut values = vec![f64::NAN; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
            for j in 0..i {
                let r = pearson(&series[i], &series[j]);
                values[i * n + j] = r;
                values[j * n + i] = r;
            }
        }

        Self { labels, values }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn dimension(&self) -> usize {
        self.labels.len()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.dimension() + j]
    }

    /// Correlation between two named columns.
    pub fn between(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        Some(self.get(i, j))
    }
}

/// Pearson correlation over pairwise-complete observations.
fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
