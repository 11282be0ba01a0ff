//! Ordinary least squares for the driver models
//!
//! Fits `target = intercept + Σ coefficient_i * driver_i` on centred data.
//! The 3x3 normal equations are solved through a Jacobi eigendecomposition
//! of the Gram matrix. Directions with (numerically) zero variance are
//! dropped, which yields the minimum-norm solution for rank-deficient
//! designs. A single training row therefore produces an intercept-only model
//! that predicts the training target.
//!
//! Everything here is a pure function of the inputs: no randomness and a
//! fixed iteration order, so refitting the same rows gives identical models.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::FeatureRow;

use super::{DriverFeature, DriverVector, Target, DRIVER_FEATURES};

const N: usize = DRIVER_FEATURES.len();

/// Eigenvalues below `RANK_TOLERANCE * λ_max` are treated as zero
const RANK_TOLERANCE: f64 = 1e-12;

const MAX_SWEEPS: usize = 64;

/// A fitted linear driver model
///
/// Immutable once fit. Serializable so callers can persist it explicitly;
/// nothing in the pipeline does so on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    target: Target,
    features: [DriverFeature; N],
    intercept: f64,
    coefficients: [f64; N],
}

impl LinearModel {
    /// Fit a model for `target` on the given training rows
    pub fn fit(rows: &[FeatureRow], target: Target) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::InsufficientHistory {
                context: "driver model training rows",
                required: 1,
                found: 0,
            });
        }

        let x: Vec<[f64; N]> = rows
            .iter()
            .map(|r| DriverVector::from_row(r).as_array())
            .collect();
        let y: Vec<f64> = rows.iter().map(|r| target.value(r)).collect();

        let (intercept, coefficients) = least_squares(&x, &y);
        debug!(
            target = target.as_str(),
            intercept,
            headcount = coefficients[0],
            inflation_idx = coefficients[1],
            growth_idx = coefficients[2],
            rows = rows.len(),
            "Fitted driver model"
        );

        Ok(Self {
            target,
            features: DRIVER_FEATURES,
            intercept,
            coefficients,
        })
    }

    /// Build a model from known coefficients (ordered as `DRIVER_FEATURES`)
    pub fn from_parts(target: Target, intercept: f64, coefficients: [f64; N]) -> Self {
        Self {
            target,
            features: DRIVER_FEATURES,
            intercept,
            coefficients,
        }
    }

    pub fn predict(&self, drivers: &DriverVector) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(drivers.as_array())
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    pub fn predict_row(&self, row: &FeatureRow) -> f64 {
        self.predict(&DriverVector::from_row(row))
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn features(&self) -> &[DriverFeature; N] {
        &self.features
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64; N] {
        &self.coefficients
    }
}

/// Solve least squares with intercept, returning (intercept, coefficients)
fn least_squares(x: &[[f64; N]], y: &[f64]) -> (f64, [f64; N]) {
    let n = y.len() as f64;

    let mut mean_x = [0.0; N];
    for row in x {
        for (m, v) in mean_x.iter_mut().zip(row) {
            *m += v;
        }
    }
    for m in &mut mean_x {
        *m /= n;
    }
    let mean_y = y.iter().sum::<f64>() / n;

    // Gram matrix and moment vector of the centred data
    let mut gram = [[0.0; N]; N];
    let mut moment = [0.0; N];
    for (row, target) in x.iter().zip(y) {
        let mut centred = [0.0; N];
        for j in 0..N {
            centred[j] = row[j] - mean_x[j];
        }
        let yc = target - mean_y;
        for i in 0..N {
            moment[i] += centred[i] * yc;
            for j in 0..N {
                gram[i][j] += centred[i] * centred[j];
            }
        }
    }

    let (eigenvalues, eigenvectors) = symmetric_eigen(gram);
    let max_eigenvalue = eigenvalues.iter().cloned().fold(0.0, f64::max);

    let mut coefficients = [0.0; N];
    if max_eigenvalue > 0.0 {
        for k in 0..N {
            if eigenvalues[k] <= max_eigenvalue * RANK_TOLERANCE {
                continue;
            }
            let projection: f64 =
                (0..N).map(|i| eigenvectors[i][k] * moment[i]).sum::<f64>() / eigenvalues[k];
            for (i, c) in coefficients.iter_mut().enumerate() {
                *c += eigenvectors[i][k] * projection;
            }
        }
    }

    let intercept = mean_y
        - coefficients
            .iter()
            .zip(mean_x.iter())
            .map(|(c, m)| c * m)
            .sum::<f64>();

    (intercept, coefficients)
}

/// Cyclic Jacobi eigendecomposition of a symmetric matrix
///
/// Returns eigenvalues and a matrix whose columns are the eigenvectors.
fn symmetric_eigen(mut a: [[f64; N]; N]) -> ([f64; N], [[f64; N]; N]) {
    let mut v = [[0.0; N]; N];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        let mut total = 0.0;
        for p in 0..N {
            for q in 0..N {
                total += a[p][q] * a[p][q];
                if q > p {
                    off += a[p][q] * a[p][q];
                }
            }
        }
        if off == 0.0 || off <= total * 1e-30 {
            break;
        }

        for p in 0..N {
            for q in (p + 1)..N {
                let apq = a[p][q];
                if apq == 0.0 {
                    continue;
                }

                let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..N {
                    let (akp, akq) = (a[k][p], a[k][q]);
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..N {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let (vkp, vkq) = (row[p], row[q]);
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut eigenvalues = [0.0; N];
    for (i, e) in eigenvalues.iter_mut().enumerate() {
        *e = a[i][i];
    }
    (eigenvalues, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Month;

    fn row(month: u32, headcount: f64, inflation: f64, growth: f64, revenue: f64) -> FeatureRow {
        FeatureRow::new(
            Month::new(2024, month).unwrap(),
            revenue,
            revenue * 0.6,
            headcount,
            inflation,
            growth,
        )
    }

    fn assert_close(a: f64, b: f64) {
        assert!(
            (a - b).abs() <= 1e-9 * b.abs().max(1.0),
            "expected {} to be close to {}",
            a,
            b
        );
    }

    #[test]
    fn test_recovers_exact_linear_relationship() {
        let drivers = [
            (1.0, 2.0, 3.0),
            (2.0, 1.0, 0.0),
            (3.0, 5.0, 1.0),
            (4.0, 4.0, 4.0),
            (0.0, 1.0, 7.0),
        ];
        let rows: Vec<FeatureRow> = drivers
            .iter()
            .enumerate()
            .map(|(i, &(h, inf, g))| row(i as u32 + 1, h, inf, g, 10.0 + 2.0 * h - inf + 0.5 * g))
            .collect();

        let model = LinearModel::fit(&rows, Target::Revenue).unwrap();
        assert_close(model.intercept(), 10.0);
        assert_close(model.coefficients()[0], 2.0);
        assert_close(model.coefficients()[1], -1.0);
        assert_close(model.coefficients()[2], 0.5);

        for r in &rows {
            assert_close(model.predict_row(r), r.revenue);
        }
    }

    #[test]
    fn test_single_row_is_intercept_only() {
        let rows = vec![row(1, 300.0, 101.0, 102.0, 5000.0)];
        let model = LinearModel::fit(&rows, Target::Revenue).unwrap();

        assert_eq!(model.coefficients(), &[0.0, 0.0, 0.0]);
        assert_eq!(model.intercept(), 5000.0);

        let other = DriverVector {
            headcount: 1.0,
            inflation_idx: 2.0,
            growth_idx: 3.0,
        };
        assert_eq!(model.predict(&other), 5000.0);
    }

    #[test]
    fn test_collinear_drivers_give_minimum_norm_solution() {
        // All three drivers are multiples of one direction (1, 2, 4)
        let rows = vec![
            row(1, 1.0, 2.0, 4.0, 1.0),
            row(2, 2.0, 4.0, 8.0, 2.0),
            row(3, 3.0, 6.0, 12.0, 3.0),
        ];
        let model = LinearModel::fit(&rows, Target::Revenue).unwrap();

        let c = model.coefficients();
        assert_close(c[0], 1.0 / 21.0);
        assert_close(c[1], 2.0 / 21.0);
        assert_close(c[2], 4.0 / 21.0);
        for r in &rows {
            assert_close(model.predict_row(r), r.revenue);
        }
    }

    #[test]
    fn test_fit_uses_requested_target() {
        let rows = vec![
            row(1, 10.0, 100.0, 100.0, 1000.0),
            row(2, 20.0, 101.0, 99.0, 2000.0),
            row(3, 30.0, 99.0, 101.0, 3000.0),
            row(4, 40.0, 100.5, 100.5, 4000.0),
        ];

        let opex = LinearModel::fit(&rows, Target::Opex).unwrap();
        assert_eq!(opex.target(), Target::Opex);
        for r in &rows {
            assert_close(opex.predict_row(r), r.opex);
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let rows: Vec<FeatureRow> = (1..=12)
            .map(|m| {
                let t = m as f64;
                row(
                    m,
                    270.0 + 3.0 * t + (t * 1.7).sin(),
                    100.0 + 0.15 * t + (t * 0.3).cos() * 0.2,
                    100.0 + 0.2 * t + (t * 2.1).sin() * 0.3,
                    1_000_000.0 + 5000.0 * t,
                )
            })
            .collect();

        let a = LinearModel::fit(&rows, Target::Revenue).unwrap();
        let b = LinearModel::fit(&rows, Target::Revenue).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fit_empty_is_insufficient() {
        let err = LinearModel::fit(&[], Target::Revenue).unwrap_err();
        assert!(matches!(err, Error::InsufficientHistory { .. }));
    }

    #[test]
    fn test_from_parts_predicts_with_known_coefficients() {
        let model = LinearModel::from_parts(Target::Revenue, 5.0, [1.0, 2.0, 3.0]);
        let drivers = DriverVector {
            headcount: 1.0,
            inflation_idx: 1.0,
            growth_idx: 1.0,
        };
        assert_eq!(model.predict(&drivers), 11.0);
        assert_eq!(model.features(), &DRIVER_FEATURES);
    }

    #[test]
    fn test_model_serializes() {
        let model = LinearModel::from_parts(Target::Opex, 600.0, [0.0, 0.0, 0.0]);
        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"target\":\"opex\""));
        assert!(json.contains("inflation_idx"));
        let back: LinearModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn test_symmetric_eigen_diagonalizes() {
        let a = [[4.0, 1.0, 2.0], [1.0, 3.0, 0.5], [2.0, 0.5, 5.0]];
        let (values, vectors) = symmetric_eigen(a);

        for k in 0..N {
            for i in 0..N {
                let av: f64 = (0..N).map(|j| a[i][j] * vectors[j][k]).sum();
                assert!((av - values[k] * vectors[i][k]).abs() < 1e-10);
            }
        }
        let trace: f64 = values.iter().sum();
        assert!((trace - 12.0).abs() < 1e-10);
    }
}
