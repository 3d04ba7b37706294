//! Display intervals: choosing the pixel values mapped to black and white.

use serde::{Deserialize, Serialize};

/// How display levels are derived from pixel values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "percent", rename_all = "lowercase")]
pub enum Interval {
    /// Full range of finite values.
    MinMax,
    /// IRAF-style zscale, suited to sky-dominated images.
    #[default]
    ZScale,
    /// The central `p` percent of finite values.
    Percentile(f64),
}

const ZSCALE_SAMPLES: usize = 1000;
const ZSCALE_CONTRAST: f64 = 0.25;
const ZSCALE_MAX_REJECT: f64 = 0.5;
const ZSCALE_MIN_NPIXELS: usize = 5;
const ZSCALE_KREJ: f64 = 2.5;
const ZSCALE_MAX_ITERATIONS: usize = 5;

impl Interval {
    /// Computes `(low, high)` display levels. Non-finite values are ignored;
    /// returns `None` when no finite value remains.
    pub fn levels(&self, values: &[f32]) -> Option<(f64, f64)> {
        let mut finite: Vec<f64> = values
            .iter()
            .filter(|v| v.is_finite())
            .map(|&v| f64::from(v))
            .collect();
        if finite.is_empty() {
            return None;
        }
        match *self {
            Interval::MinMax => {
                let low = finite.iter().copied().fold(f64::INFINITY, f64::min);
                let high = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Some((low, high))
            }
            Interval::Percentile(percent) => {
                finite.sort_by(f64::total_cmp);
                let percent = percent.clamp(0.0, 100.0);
                let tail = (100.0 - percent) / 200.0;
                Some((quantile(&finite, tail), quantile(&finite, 1.0 - tail)))
            }
            Interval::ZScale => Some(zscale(&finite)),
        }
    }

    /// Short label for menus and logs.
    pub fn label(&self) -> String {
        match self {
            Interval::MinMax => "minmax".to_string(),
            Interval::ZScale => "zscale".to_string(),
            Interval::Percentile(p) => format!("{p}%"),
        }
    }
}

/// Linear interpolation quantile over sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn zscale(values: &[f64]) -> (f64, f64) {
    let stride = (values.len() / ZSCALE_SAMPLES).max(1);
    let mut samples: Vec<f64> = values
        .iter()
        .step_by(stride)
        .take(ZSCALE_SAMPLES)
        .copied()
        .collect();
    samples.sort_by(f64::total_cmp);

    let npix = samples.len();
    let vmin = samples[0];
    let vmax = samples[npix - 1];

    let min_npixels = ZSCALE_MIN_NPIXELS.max((npix as f64 * ZSCALE_MAX_REJECT) as usize);
    let ngrow = 1.max((npix as f64 * 0.01) as usize);
    let center_pixel = (npix as f64 - 1.0) / 2.0;
    let median = quantile(&samples, 0.5);

    let x: Vec<f64> = (0..npix).map(|i| i as f64).collect();
    let mut good = vec![true; npix];
    let mut last_good = npix;
    let mut slope = 0.0;

    for _ in 0..ZSCALE_MAX_ITERATIONS {
        let ngood = good.iter().filter(|g| **g).count();
        if ngood < min_npixels {
            break;
        }
        let (fit_slope, intercept) = fit_line(&x, &samples, &good);
        slope = fit_slope;

        let residuals: Vec<f64> = x
            .iter()
            .zip(&samples)
            .map(|(xi, yi)| yi - (intercept + slope * xi))
            .collect();
        let kept: Vec<f64> = residuals
            .iter()
            .zip(&good)
            .filter_map(|(r, g)| g.then_some(*r))
            .collect();
        let threshold = ZSCALE_KREJ * std_dev(&kept);

        let rejected: Vec<usize> = residuals
            .iter()
            .enumerate()
            .filter(|(_, r)| r.abs() > threshold)
            .map(|(i, _)| i)
            .collect();
        for i in rejected {
            let start = i.saturating_sub(ngrow);
            let end = (i + ngrow).min(npix - 1);
            good[start..=end].iter_mut().for_each(|g| *g = false);
        }

        let ngood = good.iter().filter(|g| **g).count();
        if ngood >= last_good {
            break;
        }
        last_good = ngood;
    }

    if good.iter().filter(|g| **g).count() >= min_npixels {
        let slope = slope / ZSCALE_CONTRAST;
        let low = vmin.max(median - (center_pixel - 1.0) * slope);
        let high = vmax.min(median + (npix as f64 - center_pixel) * slope);
        (low, high)
    } else {
        (vmin, vmax)
    }
}

fn fit_line(x: &[f64], y: &[f64], mask: &[bool]) -> (f64, f64) {
    let points = x.iter().zip(y).zip(mask).filter(|(_, m)| **m);
    let (mut n, mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for ((xi, yi), _) in points {
        n += 1.0;
        sx += xi;
        sy += yi;
        sxx += xi * xi;
        sxy += xi * yi;
    }
    let denominator = n * sxx - sx * sx;
    if n == 0.0 || denominator == 0.0 {
        return (0.0, if n > 0.0 { sy / n } else { 0.0 });
    }
    let slope = (n * sxy - sx * sy) / denominator;
    let intercept = (sy - slope * sx) / n;
    (slope, intercept)
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}
