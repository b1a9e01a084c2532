use clap::{Parser, Subcommand};
use jsonbench::fetch::FetchConfig;
use jsonbench::fixture::Fixture;
use jsonbench::memory::CountingAllocator;
use jsonbench::{Benchmark, Strategy};
use jsonbench_prof::report::{measure, render, RunConfig};

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
  #[clap(subcommand)]
  subcommand: Commands,
}

#[derive(Debug, Clone, Subcommand)]
enum Commands {
  /// Fetches each payload with every selected strategy and prints a comparison table.
  Bench {
    /// Published payload by element count: 10, 100, 1000 or 10000.
    #[clap(short, long, value_parser)]
    fixture: Vec<Fixture>,
    /// Any URL serving a JSON array of records.
    #[clap(short, long, value_parser)]
    url: Vec<String>,
    #[clap(short, long, value_parser)]
    strategy: Vec<Strategy>,
    #[clap(short = 'n', long, value_parser, default_value_t = 10, env = "JSONBENCH_ITERATIONS")]
    iterations: usize,
    #[clap(short, long, value_parser, default_value_t = 0, env = "JSONBENCH_WARMUP")]
    warmup: usize,
    #[clap(long, value_parser)]
    user_agent: Option<String>,
  },
  /// Lists the strategies and published payloads.
  List,
}

fn main() {
  pretty_env_logger::init();
  let args = Args::parse();
  match args.subcommand {
    Commands::Bench { fixture, url, strategy, iterations, warmup, user_agent } => {
      let mut urls = fixture.iter().map(Fixture::url).collect::<Vec<_>>();
      urls.extend(url);
      if urls.is_empty() {
        urls.push(Fixture::TenThousand.url());
      }
      let strategies = if strategy.is_empty() { Strategy::ALL.to_vec() } else { strategy };

      let mut config = FetchConfig::default();
      if let Some(user_agent) = user_agent {
        config.user_agent = user_agent;
      }
      let run = RunConfig { iterations, warmup };
      if let Err(err) = bench(&config, &run, &urls, &strategies) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
      }
    }
    Commands::List => list(),
  }
}

fn bench(config: &FetchConfig, run: &RunConfig, urls: &[String], strategies: &[Strategy]) -> jsonbench::Result<()> {
  let mut bench = Benchmark::new(config)?;
  for url in urls {
    log::info!("{}: {} strategies x {} iterations", url, strategies.len(), run.warmup + run.iterations);
    let measurements = strategies.iter().map(|s| measure(&mut bench, *s, url, run)).collect::<Vec<_>>();
    render(&mut std::io::stdout(), url, &measurements)?;
  }
  Ok(())
}

fn list() {
  println!("strategies:");
  for strategy in Strategy::ALL {
    let mode = if strategy.is_streaming() { "streaming" } else { "buffered" };
    println!("  {:28} {:10} {}", strategy.name(), strategy.library(), mode);
  }
  println!("fixtures:");
  for fixture in Fixture::ALL {
    println!("  {:6} {}", fixture.count(), fixture.url());
  }
}
