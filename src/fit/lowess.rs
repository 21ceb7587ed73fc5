// src/fit/lowess.rs

use anyhow::{anyhow, Result};
use lowess::prelude::{Batch, Lowess};

/// Smoothing parameters. Defaults follow the usual `geom_smooth` LOWESS:
/// two thirds of the points per local fit, three robustifying passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowessParams {
    pub span: f64,
    pub iterations: usize,
}

impl Default for LowessParams {
    fn default() -> Self {
        Self {
            span: 2.0 / 3.0,
            iterations: 3,
        }
    }
}

/// Robust LOWESS through the `lowess` crate, collapsed to one fitted value
/// per distinct `x` (sorted, no duplicate abscissae). Non-finite pairs are
/// skipped.
pub fn lowess(xs: &[f64], ys: &[f64], params: &LowessParams) -> Result<Vec<(f64, f64)>> {
    let mut pts: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| (x, y))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if pts.is_empty() {
        return Ok(Vec::new());
    }
    pts.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (x, y): (Vec<f64>, Vec<f64>) = pts.into_iter().unzip();

    let distinct = 1 + x.windows(2).filter(|w| w[0] != w[1]).count();
    if distinct <= 2 {
        // any local line through two abscissae passes through their means
        return Ok(per_x_mean(&x, &y));
    }

    let model = Lowess::new()
        .fraction(params.span)
        .iterations(params.iterations)
        .adapter(Batch)
        .build()
        .map_err(|e| anyhow!("configuring lowess: {:?}", e))?;
    let fitted = model
        .fit(&x, &y)
        .map_err(|e| anyhow!("lowess fit over {} points: {:?}", x.len(), e))?
        .y;
    if fitted.len() != x.len() {
        return Err(anyhow!(
            "lowess returned {} values for {} points",
            fitted.len(),
            x.len()
        ));
    }

    let mut out: Vec<(f64, f64)> = Vec::with_capacity(distinct);
    for (&xi, &yi) in x.iter().zip(&fitted) {
        if out.last().map(|p| p.0) != Some(xi) {
            out.push((xi, yi));
        }
    }
    Ok(out)
}

fn per_x_mean(x: &[f64], y: &[f64]) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64, usize)> = Vec::new();
    for (&xi, &yi) in x.iter().zip(y) {
        match out.last_mut() {
            Some(last) if last.0 == xi => {
                last.1 += yi;
                last.2 += 1;
            }
            _ => out.push((xi, yi, 1)),
        }
    }
    out.into_iter()
        .map(|(xi, sum, n)| (xi, sum / n as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three posts per day for ten days, with spread that varies by day and
    /// one wild value on day 4.
    fn tied_days() -> (Vec<f64>, Vec<f64>) {
        let noise = [-0.6, 0.1, 0.5];
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for d in 0..10 {
            for k in 0..3 {
                let scale = 1.0 + (d % 3) as f64 * 0.5;
                xs.push(d as f64);
                ys.push(5.0 + 0.8 * d as f64 + (d as f64).sin() + noise[k] * scale);
            }
        }
        ys[14] += 12.0;
        (xs, ys)
    }

    #[test]
    fn matches_reference_smoother_on_tied_days() {
        // Cleveland's lowess, f = 2/3, iter = 3, delta = 0
        let expected = [
            5.525515, 6.211131, 6.851101, 7.411728, 7.870721, 8.574878, 9.659828, 10.823828,
            11.934048, 13.023666,
        ];
        let (xs, ys) = tied_days();
        let out = lowess(&xs, &ys, &LowessParams::default()).unwrap();
        assert_eq!(out.len(), 10);
        for (d, ((x, y), want)) in out.iter().zip(expected).enumerate() {
            assert_eq!(*x, d as f64);
            assert!((y - want).abs() < 0.05, "day {}: got {} want {}", d, y, want);
        }
    }

    #[test]
    fn robustness_passes_discount_the_wild_value() {
        let (xs, ys) = tied_days();
        let robust = lowess(&xs, &ys, &LowessParams::default()).unwrap();
        let plain = lowess(
            &xs,
            &ys,
            &LowessParams {
                iterations: 0,
                ..Default::default()
            },
        )
        .unwrap();
        // plain fit at day 4 is pulled up to ~8.99 by the outlier
        assert!(robust[4].1 < 8.2, "robust {}", robust[4].1);
        assert!(plain[4].1 > 8.6, "plain {}", plain[4].1);
    }

    #[test]
    fn reproduces_a_straight_line() {
        let xs: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 + 0.5 * x).collect();
        let out = lowess(&xs, &ys, &LowessParams::default()).unwrap();
        assert_eq!(out.len(), 40);
        for (x, y) in out {
            assert!((y - (3.0 + 0.5 * x)).abs() < 1e-6, "x={} y={}", x, y);
        }
    }

    #[test]
    fn one_output_per_distinct_x() {
        let xs = [3.0, 1.0, 2.0, 1.0, 3.0, 2.0, 4.0, 4.0];
        let ys = [3.0, 1.0, 2.0, 1.0, 3.0, 2.0, 4.0, 4.0];
        let out = lowess(&xs, &ys, &LowessParams::default()).unwrap();
        let got: Vec<f64> = out.iter().map(|p| p.0).collect();
        assert_eq!(got, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn tiny_inputs() {
        assert!(lowess(&[], &[], &LowessParams::default()).unwrap().is_empty());
        assert_eq!(
            lowess(&[2.0], &[7.0], &LowessParams::default()).unwrap(),
            vec![(2.0, 7.0)]
        );
        assert_eq!(
            lowess(&[1.0, 1.0, 5.0], &[2.0, 4.0, 9.0], &LowessParams::default()).unwrap(),
            vec![(1.0, 3.0), (5.0, 9.0)]
        );
    }
}
