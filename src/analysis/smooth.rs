use ndarray::{Array1, ArrayView1};

use crate::types::{SmoothedTrace, Trace};

/// Kernel half-width in units of sigma.
pub const DEFAULT_TRUNCATE: f64 = 4.0;

/// Normalized, symmetric Gaussian weights.
#[derive(Clone, Debug)]
pub struct GaussianKernel {
    weights: Vec<f64>,
    radius: usize,
}

impl GaussianKernel {
    /// `sigma <= 0` (or NaN) gives the identity kernel.
    pub fn new(sigma: f64, truncate: f64) -> Self {
        if !(sigma > 0.0) || !sigma.is_finite() {
            return Self::identity();
        }
        let radius = (truncate * sigma + 0.5).floor() as usize;
        if radius == 0 {
            return Self::identity();
        }
        let span = radius as i64;
        let mut weights: Vec<f64> = (-span..=span)
            .map(|x| (-0.5 * (x * x) as f64 / (sigma * sigma)).exp())
            .collect();
        let total: f64 = weights.iter().sum();
        for weight in &mut weights {
            *weight /= total;
        }
        Self { weights, radius }
    }

    fn identity() -> Self {
        Self {
            weights: vec![1.0],
            radius: 0,
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Convolves `input`, mirroring it about its edges (`d c b a | a b c d | d c b a`).
    pub fn apply(&self, input: ArrayView1<'_, f64>) -> Array1<f64> {
        let len = input.len();
        if len == 0 || self.radius == 0 {
            return input.to_owned();
        }
        let radius = self.radius as isize;
        (0..len as isize)
            .map(|center| {
                self.weights
                    .iter()
                    .zip(center - radius..)
                    .map(|(weight, offset)| weight * input[reflect_index(offset, len)])
                    .sum::<f64>()
            })
            .collect()
    }
}

/// Maps any offset onto `0..len` by repeated half-sample reflection.
fn reflect_index(offset: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let wrapped = offset.rem_euclid(period) as usize;
    if wrapped < len {
        wrapped
    } else {
        2 * len - 1 - wrapped
    }
}

pub fn gaussian_filter1d(input: &[f64], sigma: f64) -> Vec<f64> {
    GaussianKernel::new(sigma, DEFAULT_TRUNCATE)
        .apply(ArrayView1::from(input))
        .to_vec()
}

/// Smooths current and voltage independently with the same kernel.
pub fn smooth_trace(trace: &Trace, sigma: f64) -> SmoothedTrace {
    let kernel = GaussianKernel::new(sigma, DEFAULT_TRUNCATE);
    SmoothedTrace {
        current: kernel.apply(trace.current.view()),
        voltage: kernel.apply(trace.voltage.view()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sample;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-8, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn matches_reference_values() {
        assert_close(
            &gaussian_filter1d(&[1.0, 2.0, 3.0, 4.0, 5.0], 1.0),
            &[1.42704095, 2.06782203, 3.0, 3.93217797, 4.57295905],
        );
        // Kernel wider than the input: reflection repeats.
        assert_close(
            &gaussian_filter1d(&[1.0, 2.0, 3.0, 4.0, 5.0], 4.0),
            &[2.91948343, 2.95023502, 3.0, 3.04976498, 3.08051657],
        );
    }

    #[test]
    fn preserves_length() {
        for len in [0usize, 1, 2, 7, 40] {
            let input: Vec<f64> = (0..len).map(|i| (i as f64 * 0.7).sin()).collect();
            for sigma in [0.0, 0.5, 2.0, 3.0, 25.0] {
                assert_eq!(gaussian_filter1d(&input, sigma).len(), len);
            }
        }
    }

    #[test]
    fn vanishing_sigma_is_identity() {
        let input = [3.0, -1.0, 4.0, 1.0, -5.0, 9.0];
        assert_eq!(gaussian_filter1d(&input, 0.0), input.to_vec());
        assert_eq!(gaussian_filter1d(&input, 1e-3), input.to_vec());
        assert_eq!(GaussianKernel::new(1e-3, DEFAULT_TRUNCATE).radius(), 0);
    }

    #[test]
    fn kernel_is_normalized() {
        let kernel = GaussianKernel::new(3.0, DEFAULT_TRUNCATE);
        assert_eq!(kernel.radius(), 12);
        assert_eq!(kernel.weights().len(), 25);
        assert!((kernel.weights().iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn output_stays_within_input_range() {
        let input: Vec<f64> = (0..50).map(|i| ((i * 37) % 11) as f64).collect();
        let output = gaussian_filter1d(&input, 2.0);
        assert!(output.iter().all(|v| (0.0 - 1e-9..=10.0 + 1e-9).contains(v)));
        let constant = gaussian_filter1d(&[2.5; 9], 3.0);
        assert_close(&constant, &[2.5; 9]);
    }

    #[test]
    fn smooths_both_columns() {
        let samples: Vec<Sample> = (0..20)
            .map(|i| Sample {
                time: i as f64,
                current: if i % 2 == 0 { 1.0 } else { -1.0 },
                voltage: i as f64,
            })
            .collect();
        let smoothed = smooth_trace(&Trace::from_samples(&samples), 2.0);
        assert_eq!(smoothed.len(), 20);
        assert!(smoothed.current.iter().all(|v| v.abs() < 0.5));
        assert!((smoothed.voltage[10] - 10.0).abs() < 1e-9);
    }
}
