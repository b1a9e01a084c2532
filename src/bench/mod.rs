use crate::decode::{Decoder, Records, SerdeJson, Struson};
use crate::fetch::{ByteStream, Fetch, FetchConfig, HttpFetcher};
use crate::memory::PeakWindow;
use crate::{Error, PayloadRecord, Result};
use std::fmt::Display;
use std::io::{self, Write};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tokio_util::io::SyncIoBridge;

#[cfg(test)]
mod test;

/// A fetch strategy paired with a JSON library.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strategy {
  /// Whole body as text, then `serde_json::from_str`.
  SerdeJson,
  /// Whole body as text, then one struson `deserialize_next` for the array.
  Struson,
  /// Body stream cut into elements, each decoded by serde_json.
  StreamSerdeJson,
  /// Body stream read as consecutive top-level arrays by serde_json's `StreamDeserializer`.
  StreamSerdeJsonDocuments,
  /// Body stream walked by struson's pull reader.
  StreamStruson,
}

impl Strategy {
  pub const ALL: [Strategy; 5] = [
    Strategy::SerdeJson,
    Strategy::Struson,
    Strategy::StreamSerdeJson,
    Strategy::StreamSerdeJsonDocuments,
    Strategy::StreamStruson,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      Strategy::SerdeJson => "serde-json",
      Strategy::Struson => "struson",
      Strategy::StreamSerdeJson => "stream-serde-json",
      Strategy::StreamSerdeJsonDocuments => "stream-serde-json-documents",
      Strategy::StreamStruson => "stream-struson",
    }
  }

  pub fn is_streaming(&self) -> bool {
    !matches!(self, Strategy::SerdeJson | Strategy::Struson)
  }

  /// Name of the JSON library doing the parsing.
  pub fn library(&self) -> &'static str {
    match self {
      Strategy::SerdeJson | Strategy::StreamSerdeJson | Strategy::StreamSerdeJsonDocuments => SerdeJson.name(),
      Strategy::Struson | Strategy::StreamStruson => Struson.name(),
    }
  }
}

impl Display for Strategy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Strategy {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Strategy::ALL.into_iter().find(|strategy| strategy.name() == s).ok_or_else(|| Error::UnknownStrategy(s.to_string()))
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchmarkResult {
  pub strategy: Strategy,
  /// Number of array elements decoded.
  pub count: usize,
  /// Wall-clock time from issuing the request to the last decoded element.
  pub elapsed: Duration,
  /// Heap growth high-water mark during the run in bytes; 0 unless `CountingAllocator` is the global allocator.
  pub peak_memory: u64,
}

/// Fetches a JSON array and decodes it with one [`Strategy`] per call.
///
/// Calls block the current thread on an owned runtime, so they must not be made from inside another tokio runtime.
/// No state is carried from one run to the next apart from the fetcher's connection pool, which holds no idle
/// connections with the default [`FetchConfig`]. A request that never completes blocks the run indefinitely.
pub struct Benchmark<F = HttpFetcher, W = io::Stdout> {
  runtime: Runtime,
  fetcher: F,
  sink: W,
}

impl Benchmark {
  /// Benchmark over HTTP reporting to the standard output.
  pub fn new(config: &FetchConfig) -> Result<Self> {
    Benchmark::with(HttpFetcher::new(config)?, io::stdout(), config.worker_threads)
  }
}

impl<F: Fetch, W: Write> Benchmark<F, W> {
  pub fn with(fetcher: F, sink: W, worker_threads: usize) -> Result<Self> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
      .worker_threads(worker_threads.max(1))
      .thread_name("jsonbench-io")
      .enable_all()
      .build()
      .map_err(Error::Runtime)?;
    Ok(Self { runtime, fetcher, sink })
  }

  pub fn fetcher(&self) -> &F {
    &self.fetcher
  }

  pub fn sink(&self) -> &W {
    &self.sink
  }

  /// Fetches `url` and counts its records with `strategy`, then writes a summary line to the sink.
  pub fn run(&mut self, strategy: Strategy, url: &str) -> Result<BenchmarkResult> {
    log::debug!("run {} <- {}", strategy, url);
    let window = PeakWindow::open();
    let start = Instant::now();
    let count = self.drive(strategy, url, &mut |record: PayloadRecord| drop(record))?;
    let elapsed = start.elapsed();
    let peak_memory = window.close();
    log::debug!("run {}: {} records in {:?}, peak {} bytes", strategy, count, elapsed, peak_memory);

    writeln!(self.sink, "{} Data count: {}", strategy, count)?;
    Ok(BenchmarkResult { strategy, count, elapsed, peak_memory })
  }

  /// Decodes `url` with `strategy` and keeps every record, in payload order.
  pub fn records(&self, strategy: Strategy, url: &str) -> Result<Vec<PayloadRecord>> {
    let mut records = Vec::new();
    self.drive(strategy, url, &mut |record| records.push(record))?;
    Ok(records)
  }

  fn drive(&self, strategy: Strategy, url: &str, each: &mut dyn FnMut(PayloadRecord)) -> Result<usize> {
    match strategy {
      Strategy::SerdeJson => self.buffered(&SerdeJson, url, each),
      Strategy::Struson => self.buffered(&Struson, url, each),
      Strategy::StreamSerdeJson => self.streaming(url, |r| SerdeJson.decode_incremental(r), each),
      Strategy::StreamSerdeJsonDocuments => self.streaming(url, |r| SerdeJson.decode_documents(r), each),
      Strategy::StreamStruson => self.streaming(url, |r| Struson.decode_incremental(r), each),
    }
  }

  /// The body text and every decoded record are resident at the same time.
  fn buffered<D: Decoder>(&self, decoder: &D, url: &str, each: &mut dyn FnMut(PayloadRecord)) -> Result<usize> {
    let text = self.runtime.block_on(self.fetcher.text(url))?;
    let records = decoder.decode_all::<PayloadRecord>(&text)?;
    let count = records.len();
    log::debug!("{}: {} records from {} bytes of text", decoder.name(), count, text.len());
    records.into_iter().for_each(each);
    Ok(count)
  }

  /// Records are decoded while the body is still arriving; the stream is released when the decoder is dropped.
  fn streaming<D>(&self, url: &str, decode: D, each: &mut dyn FnMut(PayloadRecord)) -> Result<usize>
  where
    D: FnOnce(SyncIoBridge<ByteStream>) -> Records<'static, PayloadRecord>,
  {
    let stream = self.runtime.block_on(self.fetcher.stream(url))?;
    let reader = SyncIoBridge::new_with_handle(stream, self.runtime.handle().clone());
    let mut count = 0;
    for record in decode(reader) {
      each(record?);
      count += 1;
    }
    Ok(count)
  }
}
