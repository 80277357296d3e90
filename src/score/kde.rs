// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::f64::consts::PI;

use super::{DensityModel, ScoreError};

/// Two-dimensional [kernel density estimator](https://en.wikipedia.org/wiki/Kernel_density_estimation)
/// with an isotropic Gaussian kernel.
///
/// Works directly on `(lon, lat)` degrees, thus densities are per square degree
/// and the kernel is slightly stretched in the east-west direction away from the equator.
#[derive(Debug, Clone)]
pub struct GaussianKde {
    samples: Vec<(f64, f64)>,
    bandwidth: f64,
}

impl GaussianKde {
    /// Fits the estimator over the provided samples, picking the bandwidth
    /// with [Scott's rule](https://en.wikipedia.org/wiki/Kernel_density_estimation#A_rule-of-thumb_bandwidth_estimator):
    /// `n^(-1/6) × σ`, where σ is the pooled standard deviation of both coordinates.
    pub fn fit<I: IntoIterator<Item = (f64, f64)>>(samples: I) -> Result<Self, ScoreError> {
        let samples: Vec<(f64, f64)> = samples.into_iter().collect();
        if samples.is_empty() {
            return Err(ScoreError::EmptyModel);
        }

        let n = samples.len() as f64;
        let (sum_x, sum_y) = samples
            .iter()
            .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
        let (mean_x, mean_y) = (sum_x / n, sum_y / n);
        let var = samples
            .iter()
            .map(|&(x, y)| (x - mean_x).powi(2) + (y - mean_y).powi(2))
            .sum::<f64>()
            / (2.0 * n);

        let bandwidth = n.powf(-1.0 / 6.0) * var.sqrt();
        Self::with_bandwidth(samples, bandwidth)
    }

    /// Creates the estimator with an explicit bandwidth, in degrees.
    pub fn with_bandwidth(samples: Vec<(f64, f64)>, bandwidth: f64) -> Result<Self, ScoreError> {
        if samples.is_empty() {
            return Err(ScoreError::EmptyModel);
        }
        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            return Err(ScoreError::InvalidBandwidth(bandwidth));
        }
        Ok(Self { samples, bandwidth })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Evaluates the estimated density at a single point.
    pub fn density(&self, x: f64, y: f64) -> f64 {
        let h2 = self.bandwidth * self.bandwidth;
        let sum: f64 = self
            .samples
            .iter()
            .map(|&(sx, sy)| {
                let d2 = (x - sx).powi(2) + (y - sy).powi(2);
                (-0.5 * d2 / h2).exp()
            })
            .sum();
        sum / (self.samples.len() as f64 * 2.0 * PI * h2)
    }
}

impl DensityModel for GaussianKde {
    fn score_samples(&self, coordinates: &[(f64, f64)]) -> Result<Vec<f64>, ScoreError> {
        Ok(coordinates
            .iter()
            .map(|&(x, y)| self.density(x, y))
            .collect())
    }
}
