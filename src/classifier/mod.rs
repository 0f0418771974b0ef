use std::collections::BTreeSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::category::Category;
use crate::error::{Error, Result};
use crate::utils::sparse::{FeatureMatrix, SparseVec};

/// Samples per gradient chunk. Chunks are summed in order, so the
/// result does not depend on the rayon thread count.
const GRADIENT_CHUNK: usize = 4096;

/// Training options of [`LogisticRegression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// gradient descent step size
    pub learning_rate: f32,
    pub max_iter: usize,
    /// stop once every gradient component is below this
    pub tol: f32,
    /// inverse L2 regularization strength
    pub c: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { learning_rate: 1.0, max_iter: 300, tol: 1e-5, c: 1.0 }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(Error::InvalidConfig(format!("learning_rate {} must be positive", self.learning_rate)));
        }
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(Error::InvalidConfig(format!("c {} must be positive", self.c)));
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidConfig("max_iter must be positive".to_string()));
        }
        Ok(())
    }
}

/// Learned weights; rows of `coef` follow `classes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierState {
    pub classes: Vec<Category>,
    /// `[n_classes][n_features]`
    pub coef: Vec<Vec<f32>>,
    pub intercept: Vec<f32>,
    pub n_features: usize,
    /// iterations run during fit
    pub n_iter: usize,
}

impl ClassifierState {
    fn check_row(&self, row: &SparseVec<f32>) -> Result<()> {
        if row.len() != self.n_features {
            return Err(Error::DimensionMismatch { expected: self.n_features, found: row.len() });
        }
        Ok(())
    }

    fn decision(&self, row: &SparseVec<f32>) -> Vec<f32> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(w, b)| row.dot_dense(w) + b)
            .collect()
    }

    fn proba(&self, row: &SparseVec<f32>) -> Vec<f32> {
        let mut z = self.decision(row);
        softmax_in_place(&mut z);
        z
    }
}

fn softmax_in_place(z: &mut [f32]) {
    let max = z.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in z.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in z.iter_mut() {
        *v /= sum;
    }
}

/// index of the first maximum
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

struct Gradient {
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
    loss: f64,
}

impl Gradient {
    fn zeros(n_classes: usize, n_features: usize) -> Self {
        Self { coef: vec![vec![0.0; n_features]; n_classes], intercept: vec![0.0; n_classes], loss: 0.0 }
    }

    fn merge(&mut self, other: &Gradient) {
        for (acc, part) in self.coef.iter_mut().zip(&other.coef) {
            for (a, p) in acc.iter_mut().zip(part) {
                *a += p;
            }
        }
        for (a, p) in self.intercept.iter_mut().zip(&other.intercept) {
            *a += p;
        }
        self.loss += other.loss;
    }
}

/// Multinomial (softmax) logistic regression over sparse feature rows,
/// fit by full-batch gradient descent from zero weights.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: ClassifierConfig,
    state: Option<ClassifierState>,
}

impl LogisticRegression {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config, state: None }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub fn state(&self) -> Result<&ClassifierState> {
        self.state.as_ref().ok_or(Error::NotFitted("classifier"))
    }

    pub fn classes(&self) -> Result<&[Category]> {
        Ok(&self.state()?.classes)
    }

    pub fn n_features(&self) -> Result<usize> {
        Ok(self.state()?.n_features)
    }

    /// Fit on `x` against category codes `y`.
    pub fn fit(&mut self, x: &FeatureMatrix<f32>, y: &[u32]) -> Result<()> {
        self.config.validate()?;
        let (n_samples, n_features) = x.shape();
        if n_samples != y.len() {
            return Err(Error::DimensionMismatch { expected: n_samples, found: y.len() });
        }
        if n_samples == 0 {
            return Err(Error::EmptyCorpus);
        }

        let labels = y.iter().map(|&code| Category::from_code(code)).collect::<Result<Vec<_>>>()?;
        let classes: Vec<Category> = labels.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        if classes.len() < 2 {
            return Err(Error::TooFewClasses { found: classes.len() });
        }
        let mut slot = [usize::MAX; Category::COUNT];
        for (idx, class) in classes.iter().enumerate() {
            slot[class.code() as usize] = idx;
        }
        let targets: Vec<usize> = labels.iter().map(|c| slot[c.code() as usize]).collect();

        let n_classes = classes.len();
        let mut coef = vec![vec![0.0f32; n_features]; n_classes];
        let mut intercept = vec![0.0f32; n_classes];
        let lr = self.config.learning_rate;
        let reg = 1.0 / (self.config.c * n_samples as f32);
        let scale = 1.0 / n_samples as f32;

        let mut n_iter = 0;
        let mut converged = false;
        for iter in 0..self.config.max_iter {
            n_iter = iter + 1;
            let grad = batch_gradient(x, &targets, &coef, &intercept);

            let mut max_grad = 0.0f32;
            for (w_row, g_row) in coef.iter_mut().zip(&grad.coef) {
                for (w, g) in w_row.iter_mut().zip(g_row) {
                    let step = g * scale + reg * *w;
                    max_grad = max_grad.max(step.abs());
                    *w -= lr * step;
                }
            }
            for (b, g) in intercept.iter_mut().zip(&grad.intercept) {
                let step = g * scale;
                max_grad = max_grad.max(step.abs());
                *b -= lr * step;
            }

            if iter % 50 == 0 {
                debug!(iter, loss = grad.loss / n_samples as f64, max_grad, "classifier step");
            }
            if max_grad < self.config.tol {
                converged = true;
                break;
            }
        }
        if converged {
            info!(samples = n_samples, classes = n_classes, n_iter, "classifier converged");
        } else {
            warn!(samples = n_samples, classes = n_classes, n_iter, "classifier reached max_iter before converging");
        }

        self.state = Some(ClassifierState { classes, coef, intercept, n_features, n_iter });
        Ok(())
    }

    /// Class probabilities per row, columns ordered as [`Self::classes`].
    pub fn predict_proba(&self, x: &FeatureMatrix<f32>) -> Result<Vec<Vec<f32>>> {
        let state = self.state()?;
        x.rows()
            .iter()
            .map(|row| {
                state.check_row(row)?;
                Ok(state.proba(row))
            })
            .collect()
    }

    /// Most probable category of one row.
    pub fn predict_one(&self, row: &SparseVec<f32>) -> Result<Category> {
        let state = self.state()?;
        state.check_row(row)?;
        Ok(state.classes[argmax(&state.decision(row))])
    }

    pub fn predict(&self, x: &FeatureMatrix<f32>) -> Result<Vec<Category>> {
        x.rows().iter().map(|row| self.predict_one(row)).collect()
    }

    /// Fraction of rows whose prediction equals the code in `y`.
    pub fn score(&self, x: &FeatureMatrix<f32>, y: &[u32]) -> Result<f32> {
        if x.shape().0 != y.len() {
            return Err(Error::DimensionMismatch { expected: x.shape().0, found: y.len() });
        }
        if y.is_empty() {
            return Ok(0.0);
        }
        let predicted = self.predict(x)?;
        let correct = predicted.iter().zip(y).filter(|(p, &code)| p.code() == code).count();
        Ok(correct as f32 / y.len() as f32)
    }
}

/// Summed (not averaged) cross-entropy gradient over all rows.
fn batch_gradient(x: &FeatureMatrix<f32>, targets: &[usize], coef: &[Vec<f32>], intercept: &[f32]) -> Gradient {
    let n_classes = coef.len();
    let n_features = x.n_features();

    let partials: Vec<Gradient> = x
        .rows()
        .par_chunks(GRADIENT_CHUNK)
        .zip(targets.par_chunks(GRADIENT_CHUNK))
        .map(|(rows, chunk_targets)| {
            let mut g = Gradient::zeros(n_classes, n_features);
            for (row, &target) in rows.iter().zip(chunk_targets) {
                let mut p: Vec<f32> = coef.iter().zip(intercept).map(|(w, b)| row.dot_dense(w) + b).collect();
                softmax_in_place(&mut p);
                g.loss -= f64::from(p[target].max(1e-12)).ln();
                for (class, &prob) in p.iter().enumerate() {
                    let err = if class == target { prob - 1.0 } else { prob };
                    g.intercept[class] += err;
                    let g_row = &mut g.coef[class];
                    for (j, v) in row.iter() {
                        g_row[j as usize] += err * v;
                    }
                }
            }
            g
        })
        .collect();

    let mut total = Gradient::zeros(n_classes, n_features);
    for part in &partials {
        total.merge(part);
    }
    total
}
