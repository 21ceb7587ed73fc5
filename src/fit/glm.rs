// src/fit/glm.rs

/// Two-sided 95% normal quantile, used for the confidence band around the
/// fitted mean (GLM predictions use the normal, not Student's t).
pub const Z_95: f64 = 1.959_963_984_540_054;

/// Gaussian-family GLM with identity link, i.e. ordinary least squares of
/// `y` on `x`. Stored in centred form so predictions stay well conditioned
/// when `x` is a day count in the tens of thousands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub n: usize,
    pub x_mean: f64,
    pub y_mean: f64,
    pub slope: f64,
    /// Sum of squared deviations of x.
    pub sxx: f64,
    /// Residual standard deviation; `None` when there are no residual
    /// degrees of freedom.
    pub sigma: Option<f64>,
}

impl LinearFit {
    /// `None` for empty input. A single distinct x gives a flat fit.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Option<Self> {
        let n = xs.len().min(ys.len());
        if n == 0 {
            return None;
        }
        let nf = n as f64;
        let x_mean = xs[..n].iter().sum::<f64>() / nf;
        let y_mean = ys[..n].iter().sum::<f64>() / nf;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        for (x, y) in xs[..n].iter().zip(&ys[..n]) {
            let dx = x - x_mean;
            sxx += dx * dx;
            sxy += dx * (y - y_mean);
        }

        let degenerate = sxx <= f64::EPSILON * nf;
        let slope = if degenerate { 0.0 } else { sxy / sxx };

        let params = if degenerate { 1 } else { 2 };
        let sigma = (n > params).then(|| {
            let rss: f64 = xs[..n]
                .iter()
                .zip(&ys[..n])
                .map(|(x, y)| {
                    let r = y - (y_mean + slope * (x - x_mean));
                    r * r
                })
                .sum();
            (rss / (n - params) as f64).sqrt()
        });

        Some(Self {
            n,
            x_mean,
            y_mean,
            slope,
            sxx: if degenerate { 0.0 } else { sxx },
            sigma,
        })
    }

    pub fn intercept(&self) -> f64 {
        self.y_mean - self.slope * self.x_mean
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.y_mean + self.slope * (x - self.x_mean)
    }

    /// Standard error of the fitted mean at `x`.
    pub fn se_mean(&self, x: f64) -> Option<f64> {
        let sigma = self.sigma?;
        if self.sxx == 0.0 {
            return Some(sigma / (self.n as f64).sqrt());
        }
        let dx = x - self.x_mean;
        Some(sigma * (1.0 / self.n as f64 + dx * dx / self.sxx).sqrt())
    }

    /// `(fit, lo, hi)` with a 95% band when one can be computed.
    pub fn predict_with_band(&self, x: f64) -> (f64, Option<(f64, f64)>) {
        let y = self.predict(x);
        let band = self.se_mean(x).map(|se| (y - Z_95 * se, y + Z_95 * se));
        (y, band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_line() {
        let xs: Vec<f64> = (0..10).map(|i| 18_500.0 + i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x - 30_000.0).collect();
        let fit = LinearFit::fit(&xs, &ys).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept() + 30_000.0).abs() < 1e-6);
        assert!((fit.predict(18_520.0) - 7_040.0).abs() < 1e-6);
        assert!(fit.sigma.unwrap() < 1e-6);
    }

    #[test]
    fn band_is_narrowest_at_the_mean() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ys = [1.2, 1.9, 3.3, 3.8, 5.1, 6.2];
        let fit = LinearFit::fit(&xs, &ys).unwrap();
        let (_, at_mean) = fit.predict_with_band(fit.x_mean);
        let (_, at_edge) = fit.predict_with_band(6.0);
        let w = |b: Option<(f64, f64)>| {
            let (lo, hi) = b.unwrap();
            hi - lo
        };
        assert!(w(at_mean) < w(at_edge));
    }

    #[test]
    fn degenerate_inputs() {
        assert!(LinearFit::fit(&[], &[]).is_none());

        let single_x = LinearFit::fit(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(single_x.slope, 0.0);
        assert_eq!(single_x.predict(100.0), 2.0);

        let two = LinearFit::fit(&[1.0, 2.0], &[1.0, 3.0]).unwrap();
        assert!(two.sigma.is_none());
        assert!(two.predict_with_band(1.5).1.is_none());
    }
}
