// src/fit/mod.rs

pub mod glm;
pub mod lowess;

pub use glm::LinearFit;
pub use lowess::{lowess, LowessParams};

use tracing::warn;

use crate::chart::FitMethod;

/// Number of evaluation points for the parametric fit.
pub const GLM_GRID_POINTS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedPoint {
    /// Whole days since the Unix epoch.
    pub day: i32,
    pub y: f64,
    pub band: Option<(f64, f64)>,
}

/// Fit `ys` against day numbers with the chosen smoother.
///
/// `Glm` is evaluated on up to [`GLM_GRID_POINTS`] whole days spread over the
/// observed range and carries a 95% band; `Lowess` is evaluated at every
/// observed day and has no band. A LOWESS failure is logged and yields no
/// points.
pub fn fit_curve(method: FitMethod, days: &[i32], ys: &[f64]) -> Vec<FittedPoint> {
    let xs: Vec<f64> = days.iter().map(|&d| d as f64).collect();
    match method {
        FitMethod::Glm => {
            let Some(fit) = LinearFit::fit(&xs, ys) else {
                return Vec::new();
            };
            day_grid(days, GLM_GRID_POINTS)
                .into_iter()
                .map(|day| {
                    let (y, band) = fit.predict_with_band(day as f64);
                    FittedPoint { day, y, band }
                })
                .collect()
        }
        FitMethod::Lowess => match lowess(&xs, ys, &LowessParams::default()) {
            Ok(points) => points
                .into_iter()
                .map(|(x, y)| FittedPoint {
                    day: x as i32,
                    y,
                    band: None,
                })
                .collect(),
            Err(e) => {
                warn!(n = xs.len(), error = %format!("{:#}", e), "lowess fit failed");
                Vec::new()
            }
        },
    }
}

/// Evenly spaced whole days covering `[min, max]`, at most `points` of them.
fn day_grid(days: &[i32], points: usize) -> Vec<i32> {
    let (Some(&min), Some(&max)) = (days.iter().min(), days.iter().max()) else {
        return Vec::new();
    };
    let span = (max - min) as usize;
    if span + 1 <= points {
        return (min..=max).collect();
    }
    let step = span as f64 / (points - 1) as f64;
    let mut grid: Vec<i32> = (0..points)
        .map(|i| min + (i as f64 * step).round() as i32)
        .collect();
    grid.dedup();
    grid
}
