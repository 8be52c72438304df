//! Per-column predictive models for chained-equations imputation
//!
//! A [`Predictor`] is a model factory: `fit` consumes training rows and
//! returns a fresh [`FittedModel`], which is dropped once its predictions
//! have been written back. Nothing is cached between fits.

use crate::error::{ImputeError, Result};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Factory for models predicting `Target` from a numeric design matrix
pub trait Predictor {
    type Target;
    type Model: FittedModel<Output = Self::Target>;

    /// Fit on `x` (one row per training sample) and `y`. Randomized fitting
    /// draws only from `rng`.
    fn fit<R: Rng + ?Sized>(
        &self,
        x: ArrayView2<'_, f64>,
        y: &[Self::Target],
        rng: &mut R,
    ) -> Result<Self::Model>;
}

/// A fitted model
pub trait FittedModel {
    type Output;

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<Self::Output>>;
}

// ============ Linear regression ============

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
/// Retries once with a small ridge if the matrix is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    cholesky_solve_inner(a, b).or_else(|| {
        let scale = a.diag().iter().map(|v| v.abs()).sum::<f64>() / n.max(1) as f64;
        let ridge = 1e-8 * scale;
        if ridge <= 0.0 {
            return None;
        }
        let mut a_reg = a.clone();
        for k in 0..n {
            a_reg[[k, k]] += ridge;
        }
        cholesky_solve_inner(&a_reg, b)
    })
}

fn cholesky_solve_inner(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let max_diag = a.diag().iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 1e-12 * max_diag || diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Solve Ax = b by Gauss-Jordan elimination with partial pivoting (fallback)
fn gauss_jordan_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut aug = Array2::<f64>::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| {
            aug[[r1, col]]
                .abs()
                .partial_cmp(&aug[[r2, col]].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

        if pivot_row != col {
            for j in 0..=n {
                aug.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        if pivot.abs() < 1e-10 {
            return None;
        }
        for j in 0..=n {
            aug[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..=n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    Some(aug.column(n).to_owned())
}

/// Least-squares linear regression with intercept and optional L2 penalty
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearRegressor {
    /// Regularization strength (L2)
    pub alpha: f64,
}

impl LinearRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set regularization strength (Ridge regression)
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.max(0.0);
        self
    }
}

/// Fitted linear model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl Predictor for LinearRegressor {
    type Target = f64;
    type Model = LinearModel;

    fn fit<R: Rng + ?Sized>(
        &self,
        x: ArrayView2<'_, f64>,
        y: &[f64],
        _rng: &mut R,
    ) -> Result<LinearModel> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(ImputeError::ComputationError(format!(
                "design matrix has {} rows but target has {} values",
                n_samples,
                y.len()
            )));
        }
        if n_samples == 0 {
            return Err(ImputeError::ComputationError(
                "cannot fit linear model on zero rows".to_string(),
            ));
        }

        let y = Array1::from(y.to_vec());
        let x_mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n_features));
        let y_mean = y.mean().unwrap_or(0.0);

        let x_centered = &x - &x_mean.view().insert_axis(Axis(0));
        let y_centered = &y - y_mean;

        // Solve normal equations: (X^T X + alpha*I) * w = X^T y
        let mut xtx = x_centered.t().dot(&x_centered);
        for i in 0..n_features {
            xtx[[i, i]] += self.alpha;
        }
        let xty = x_centered.t().dot(&y_centered);

        let coefficients = cholesky_solve(&xtx, &xty)
            .or_else(|| gauss_jordan_solve(&xtx, &xty))
            .ok_or_else(|| {
                ImputeError::ComputationError(
                    "normal equations are singular, cannot solve least squares".to_string(),
                )
            })?;

        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ImputeError::ComputationError(
                "least squares produced non-finite coefficients".to_string(),
            ));
        }

        let intercept = y_mean - coefficients.dot(&x_mean);
        Ok(LinearModel {
            coefficients,
            intercept,
        })
    }
}

impl FittedModel for LinearModel {
    type Output = f64;

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        if x.ncols() != self.coefficients.len() {
            return Err(ImputeError::ComputationError(format!(
                "model expects {} features, got {}",
                self.coefficients.len(),
                x.ncols()
            )));
        }
        Ok((x.dot(&self.coefficients) + self.intercept).to_vec())
    }
}

// ============ Softmax classifier ============

/// Multinomial logistic regression trained by stochastic gradient descent.
///
/// Targets are class codes `0..n_classes`. Initial weights and the sample
/// order of every epoch are drawn from the caller's rng.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    /// Initial learning rate; decays as `eta0 / sqrt(epoch + 1)`
    pub eta0: f64,
    /// L2 regularization
    pub alpha: f64,
    pub max_epochs: usize,
    /// Stop when the epoch loss changes by less than this
    pub tol: f64,
}

impl Default for SoftmaxClassifier {
    fn default() -> Self {
        Self {
            eta0: 0.1,
            alpha: 1e-4,
            max_epochs: 100,
            tol: 1e-4,
        }
    }
}

impl SoftmaxClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs.max(1);
        self
    }

    pub fn with_learning_rate(mut self, eta0: f64) -> Self {
        self.eta0 = eta0;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.max(0.0);
        self
    }
}

/// Fitted softmax model; features are standardized with the training
/// means and scales before scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxModel {
    weights: Array2<f64>,
    bias: Array1<f64>,
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl SoftmaxModel {
    fn standardize(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        (&x - &self.means.view().insert_axis(Axis(0))) / &self.scales.view().insert_axis(Axis(0))
    }

    pub fn n_classes(&self) -> usize {
        self.bias.len()
    }
}

/// Softmax of `logits` in place
fn softmax(logits: &mut Array1<f64>) {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    logits.mapv_inplace(|v| (v - max).exp());
    let sum = logits.sum();
    logits.mapv_inplace(|v| v / sum);
}

impl Predictor for SoftmaxClassifier {
    type Target = usize;
    type Model = SoftmaxModel;

    fn fit<R: Rng + ?Sized>(
        &self,
        x: ArrayView2<'_, f64>,
        y: &[usize],
        rng: &mut R,
    ) -> Result<SoftmaxModel> {
        let n = x.nrows();
        let p = x.ncols();
        if n != y.len() {
            return Err(ImputeError::ComputationError(format!(
                "design matrix has {} rows but target has {} values",
                n,
                y.len()
            )));
        }
        if n == 0 {
            return Err(ImputeError::ComputationError(
                "cannot fit classifier on zero rows".to_string(),
            ));
        }

        let n_classes = y.iter().copied().max().unwrap_or(0) + 1;
        let means = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
        let scales = x.std_axis(Axis(0), 0.0).mapv(|s| if s > 1e-12 { s } else { 1.0 });
        let z = (&x - &means.view().insert_axis(Axis(0))) / &scales.view().insert_axis(Axis(0));

        let mut w = Array2::from_shape_fn((n_classes, p), |_| rng.gen_range(-0.01..0.01));
        let mut b = Array1::<f64>::zeros(n_classes);
        let mut indices: Vec<usize> = (0..n).collect();
        let mut prev_loss = f64::MAX;

        for epoch in 0..self.max_epochs {
            indices.shuffle(&mut *rng);
            let lr = self.eta0 / ((epoch + 1) as f64).sqrt();
            let mut epoch_loss = 0.0;

            for &i in &indices {
                let zi = z.row(i);
                let mut probs = w.dot(&zi) + &b;
                softmax(&mut probs);
                epoch_loss -= probs[y[i]].max(1e-15).ln();

                // Gradient of cross-entropy: p - onehot(y)
                probs[y[i]] -= 1.0;
                for k in 0..n_classes {
                    let g = probs[k];
                    for j in 0..p {
                        w[[k, j]] -= lr * (g * zi[j] + self.alpha * w[[k, j]]);
                    }
                    b[k] -= lr * g;
                }
            }

            epoch_loss /= n as f64;
            if !epoch_loss.is_finite() {
                return Err(ImputeError::ComputationError(
                    "softmax training diverged".to_string(),
                ));
            }
            if (prev_loss - epoch_loss).abs() < self.tol && epoch > 0 {
                break;
            }
            prev_loss = epoch_loss;
        }

        Ok(SoftmaxModel {
            weights: w,
            bias: b,
            means,
            scales,
        })
    }
}

impl FittedModel for SoftmaxModel {
    type Output = usize;

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<usize>> {
        if x.ncols() != self.means.len() {
            return Err(ImputeError::ComputationError(format!(
                "model expects {} features, got {}",
                self.means.len(),
                x.ncols()
            )));
        }

        let z = self.standardize(x);
        let scores = z.dot(&self.weights.t()) + &self.bias.view().insert_axis(Axis(0));

        Ok(scores
            .rows()
            .into_iter()
            .map(|row| {
                // argmax, lowest class on ties
                row.iter()
                    .enumerate()
                    .fold((0usize, f64::NEG_INFINITY), |(bk, bv), (k, &v)| {
                        if v > bv {
                            (k, v)
                        } else {
                            (bk, bv)
                        }
                    })
                    .0
            })
            .collect())
    }
}
