//! Model-agnostic random sample consensus.
//!
//! Implement [`Estimator`] for a geometric model and call [`ransac`] with a
//! slice of data and some [`RansacOptions`]. The engine never panics: when no
//! consensus is found it returns a [`RansacResult`] with `model == None`.
//!
//! Sampling is driven by a seeded [`StdRng`] so runs are reproducible.

use rand::prelude::IndexedRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::math::Real;

/// Configuration for the RANSAC engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RansacOptions {
    /// Upper bound on the number of iterations.
    pub max_iters: usize,
    /// Residual threshold below which a datum counts as an inlier.
    pub inlier_threshold: Real,
    /// Minimum consensus size for a model to be accepted at all.
    pub min_inliers: usize,
    /// Desired probability of having sampled at least one outlier-free
    /// subset; drives the adaptive iteration bound.
    pub confidence: Real,
    /// Seed for the sampling RNG.
    pub seed: u64,
    /// Refit the model on its full inlier set before scoring.
    pub refit: bool,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            inlier_threshold: 2.0,
            min_inliers: 12,
            confidence: 0.99,
            seed: 7919,
            refit: true,
        }
    }
}

/// Output of a RANSAC run. `model` is `None` when no consensus satisfying
/// the options was found; the remaining fields are then unspecified.
#[derive(Debug, Clone)]
pub struct RansacResult<M> {
    /// Best model found, if any.
    pub model: Option<M>,
    /// Indices of the inlier data points for the best model.
    pub inliers: Vec<usize>,
    /// Root-mean-square residual over the inliers.
    pub inlier_rms: Real,
    /// Iterations actually performed.
    pub iters: usize,
}

impl<M> Default for RansacResult<M> {
    fn default() -> Self {
        Self {
            model: None,
            inliers: Vec::new(),
            inlier_rms: Real::INFINITY,
            iters: 0,
        }
    }
}

impl<M> RansacResult<M> {
    /// Whether a consensus model was found.
    pub fn found(&self) -> bool {
        self.model.is_some()
    }
}

/// A minimal-sample estimator for RANSAC-style fitting.
pub trait Estimator {
    type Datum;
    type Model;

    /// Number of samples a minimal fit requires.
    const MIN_SAMPLES: usize;

    /// Fit a model from the data at `sample` indices, or `None` when the
    /// subset is degenerate.
    fn fit(data: &[Self::Datum], sample: &[usize]) -> Option<Self::Model>;

    /// Non-negative residual of one datum under a model, in the same units
    /// as [`RansacOptions::inlier_threshold`].
    fn residual(model: &Self::Model, datum: &Self::Datum) -> Real;

    /// Cheap degeneracy pre-check on a sample subset (default: none).
    fn is_degenerate(_data: &[Self::Datum], _sample: &[usize]) -> bool {
        false
    }

    /// Refit on a full inlier set (default: keep the minimal-sample model).
    fn refit(_data: &[Self::Datum], _inliers: &[usize]) -> Option<Self::Model> {
        None
    }
}

/// Collect inlier indices and their RMS residual for a candidate model.
fn score<E: Estimator>(
    model: &E::Model,
    data: &[E::Datum],
    threshold: Real,
) -> (Vec<usize>, Real) {
    let mut inliers = Vec::new();
    let mut sum_sq = 0.0;
    for (idx, datum) in data.iter().enumerate() {
        let r = E::residual(model, datum);
        if r <= threshold {
            inliers.push(idx);
            sum_sq += r * r;
        }
    }
    let rms = if inliers.is_empty() {
        Real::INFINITY
    } else {
        (sum_sq / inliers.len() as Real).sqrt()
    };
    (inliers, rms)
}

/// Adaptive iteration bound from the current inlier ratio.
fn required_iterations(
    confidence: Real,
    inlier_ratio: Real,
    min_samples: usize,
    floor: usize,
    ceiling: usize,
) -> usize {
    if confidence <= 0.0 || inlier_ratio <= 0.0 {
        return ceiling;
    }
    let denom = (1.0 - inlier_ratio.powi(min_samples as i32)).max(1e-12).ln();
    if denom >= 0.0 {
        return ceiling;
    }
    let needed = ((1.0 - confidence).ln() / denom).ceil() as usize;
    needed.clamp(floor, ceiling)
}

/// Run the RANSAC loop for an [`Estimator`] implementation.
pub fn ransac<E: Estimator>(data: &[E::Datum], opts: &RansacOptions) -> RansacResult<E::Model> {
    let mut best = RansacResult::default();
    if data.len() < E::MIN_SAMPLES {
        return best;
    }

    let indices: Vec<usize> = (0..data.len()).collect();
    let mut sample = vec![0usize; E::MIN_SAMPLES];
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut bound = opts.max_iters;
    let mut iters = 0;

    while iters < bound {
        iters += 1;

        for (slot, &idx) in sample
            .iter_mut()
            .zip(indices.choose_multiple(&mut rng, E::MIN_SAMPLES))
        {
            *slot = idx;
        }
        if E::is_degenerate(data, &sample) {
            continue;
        }
        let Some(model) = E::fit(data, &sample) else {
            continue;
        };

        let (mut inliers, mut rms) = score::<E>(&model, data, opts.inlier_threshold);
        if inliers.len() < opts.min_inliers {
            continue;
        }

        let mut candidate = model;
        if opts.refit {
            if let Some(refined) = E::refit(data, &inliers) {
                let (refined_inliers, refined_rms) =
                    score::<E>(&refined, data, opts.inlier_threshold);
                if refined_inliers.len() >= opts.min_inliers {
                    candidate = refined;
                    inliers = refined_inliers;
                    rms = refined_rms;
                }
            }
        }

        let better = inliers.len() > best.inliers.len()
            || (inliers.len() == best.inliers.len() && rms < best.inlier_rms);
        if !best.found() || better {
            let ratio = inliers.len() as Real / data.len() as Real;
            best.model = Some(candidate);
            best.inliers = inliers;
            best.inlier_rms = rms;
            best.iters = iters;
            bound = required_iterations(opts.confidence, ratio, E::MIN_SAMPLES, iters, opts.max_iters);
        }
    }

    best
}
