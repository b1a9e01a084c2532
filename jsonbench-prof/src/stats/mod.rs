
/// Descriptive statistics of the measured iterations of one strategy.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
  pub min: f64,
  pub max: f64,
  pub mean: f64,
  pub median: f64,
  /// Sample standard deviation.
  pub std_dev: f64,
  /// Median absolute deviation as a percentage of the median, scaled to estimate the standard deviation of normal
  /// samples.
  pub median_abs_dev_pct: f64,
}

impl Summary {
  pub fn new(samples: &[f64]) -> Option<Summary> {
    if samples.is_empty() {
      return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let variance =
      if sorted.len() > 1 { sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0) } else { 0.0 };
    let median = median(&sorted);
    let mut deviations = sorted.iter().map(|x| (x - median).abs()).collect::<Vec<_>>();
    deviations.sort_by(|a, b| a.total_cmp(b));
    let median_abs_dev = self::median(&deviations) * 1.4826;
    let median_abs_dev_pct = if median == 0.0 { 0.0 } else { median_abs_dev / median * 100.0 };

    Some(Summary {
      min: sorted[0],
      max: sorted[sorted.len() - 1],
      mean,
      median,
      std_dev: variance.sqrt(),
      median_abs_dev_pct,
    })
  }
}

fn median(sorted: &[f64]) -> f64 {
  let mid = sorted.len() / 2;
  if sorted.len() % 2 == 0 {
    (sorted[mid - 1] + sorted[mid]) / 2.0
  } else {
    sorted[mid]
  }
}
