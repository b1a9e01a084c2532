use crate::stats::Summary;
use jsonbench::fetch::Fetch;
use jsonbench::{memory, Benchmark, Strategy};
use std::io::{self, Write};


#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
  /// Measured iterations per strategy.
  pub iterations: usize,
  /// Discarded iterations before measuring.
  pub warmup: usize,
}

impl Default for RunConfig {
  fn default() -> Self {
    Self { iterations: 10, warmup: 0 }
  }
}

/// Outcome of all measured iterations of one strategy against one payload.
#[derive(Clone, Debug)]
pub struct Measurement {
  pub strategy: Strategy,
  pub iterations: usize,
  /// Records counted by the last successful iteration.
  pub count: Option<usize>,
  /// Elapsed nanoseconds of the successful iterations.
  pub elapsed: Option<Summary>,
  /// Largest peak allocation over the successful iterations; `None` when heap accounting is off.
  pub peak_memory: Option<u64>,
  pub failures: usize,
  pub last_error: Option<String>,
}

/// Runs `strategy` back-to-back `config.warmup + config.iterations` times and summarises the measured iterations.
pub fn measure<F: Fetch, W: Write>(
  bench: &mut Benchmark<F, W>, strategy: Strategy, url: &str, config: &RunConfig,
) -> Measurement {
  for i in 0..config.warmup {
    if let Err(err) = bench.run(strategy, url) {
      log::warn!("{} warm-up {} failed: {}", strategy, i, err);
    }
  }

  let mut samples = Vec::with_capacity(config.iterations);
  let mut count = None;
  let mut peak_memory = 0;
  let mut failures = 0;
  let mut last_error = None;
  for i in 0..config.iterations {
    match bench.run(strategy, url) {
      Ok(result) => {
        if count.map(|c| c != result.count).unwrap_or(false) {
          log::warn!("{} iteration {} counted {} records, previously {:?}", strategy, i, result.count, count);
        }
        samples.push(result.elapsed.as_nanos() as f64);
        count = Some(result.count);
        peak_memory = peak_memory.max(result.peak_memory);
      }
      Err(err) => {
        log::warn!("{} iteration {} failed: {}", strategy, i, err);
        failures += 1;
        last_error = Some(err.to_string());
      }
    }
  }

  Measurement {
    strategy,
    iterations: config.iterations,
    count,
    elapsed: Summary::new(&samples),
    peak_memory: if memory::is_tracking() { Some(peak_memory) } else { None },
    failures,
    last_error,
  }
}

/// Writes the comparison table of one payload.
pub fn render<W: Write>(out: &mut W, url: &str, measurements: &[Measurement]) -> io::Result<()> {
  writeln!(out, "[{}]", url)?;
  for m in measurements {
    let target = format!("  {}", m.strategy);
    match (&m.elapsed, m.count) {
      (Some(elapsed), Some(count)) => {
        let peak = m.peak_memory.map(num).unwrap_or_else(|| String::from("n/a"));
        write!(
          out,
          "{target:32}: {:>8} records {:>15} ns/iter (±{:.1}%)  mean {:>15}  sd {:>13}  min {:>15}  max {:>15}  \
           peak {:>14} bytes",
          num(count as u64),
          num(elapsed.median as u64),
          elapsed.median_abs_dev_pct,
          num(elapsed.mean as u64),
          num(elapsed.std_dev as u64),
          num(elapsed.min as u64),
          num(elapsed.max as u64),
          peak,
        )?;
        if m.failures > 0 {
          write!(out, "  [{}/{} failed]", m.failures, m.iterations)?;
        }
        writeln!(out)?;
      }
      _ => {
        let error = m.last_error.as_deref().unwrap_or("no iterations");
        writeln!(out, "{target:32}: FAILED {}/{}: {}", m.failures, m.iterations, error)?;
      }
    }
  }
  Ok(())
}

/// Formats `n` with thousands separators.
pub fn num(n: u64) -> String {
  let digits = n.to_string();
  let lead = digits.len() % 3;
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, digit) in digits.chars().enumerate() {
    if i > 0 && (i + 3 - lead) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(digit);
  }
  grouped
}
