//! Statistics over columns with missing values.
//!
//! Missing values are skipped everywhere; a statistic that has too few
//! observations is `None` rather than NaN.

use rayon::prelude::*;
use statrs::distribution::{ContinuousCDF, StudentsT};

use mettool_core::EngineError;

#[allow(clippy::cast_precision_loss)]
fn as_f64(n: usize) -> f64 {
    n as f64
}

/// Mean of the present values.
#[must_use]
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / as_f64(n))
}

/// Standard deviation with `ddof` delta degrees of freedom.
#[must_use]
pub fn std_dev(values: &[f64], ddof: usize) -> f64 {
    if values.len() <= ddof {
        return f64::NAN;
    }
    let m = values.iter().sum::<f64>() / as_f64(values.len());
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / as_f64(values.len() - ddof)).sqrt()
}

/// Linear-interpolated quantile of sorted values, `q` in `[0, 1]`.
#[must_use]
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * as_f64(n - 1);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = pos - pos.floor();
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Pearson correlation over rows where both values are present.
#[must_use]
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = as_f64(pairs.len());
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((sxy / denom).clamp(-1.0, 1.0))
}

/// Pairwise-complete correlation matrix; rows are computed in parallel.
#[must_use]
pub fn correlation_matrix(columns: &[&[Option<f64>]]) -> Vec<Vec<Option<f64>>> {
    (0..columns.len())
        .into_par_iter()
        .map(|i| {
            (0..columns.len())
                .map(|j| pearson(columns[i], columns[j]))
                .collect()
        })
        .collect()
}

/// Running sum of deviations from the mean. Missing values stay missing and
/// do not reset the sum.
#[must_use]
pub fn cusum(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let Some(m) = mean(values) else {
        return vec![None; values.len()];
    };
    let mut acc = 0.0;
    values
        .iter()
        .map(|v| {
            v.map(|x| {
                acc += x - m;
                acc
            })
        })
        .collect()
}

/// Two-sided Student-t confidence limits of the mean: `(upper, lower)`.
///
/// `None` with fewer than two observations.
pub fn control_limits(
    values: &[Option<f64>],
    confidence: f64,
) -> Result<Option<(f64, f64)>, EngineError> {
    if !(confidence > 0.0 && confidence < 100.0) {
        return Err(EngineError::Compute(format!(
            "Confidence must be between 0 and 100, got {confidence}"
        )));
    }
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.len() < 2 {
        return Ok(None);
    }
    let n = as_f64(present.len());
    let m = present.iter().sum::<f64>() / n;
    let dist = StudentsT::new(0.0, 1.0, n - 1.0)
        .map_err(|e| EngineError::Compute(format!("Student t: {e}")))?;
    let t = dist.inverse_cdf(1.0 - (1.0 - confidence / 100.0) / 2.0);
    let se = std_dev(&present, 1) / n.sqrt();
    Ok(Some((m + t * se, m - t * se)))
}
