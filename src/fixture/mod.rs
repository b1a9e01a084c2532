use crate::{Error, PayloadRecord, Result};
use std::fmt::Display;
use std::str::FromStr;


const BASE_URL: &str = "https://blog.poychang.net/apps/json-mock-data";

/// Published JSON array documents of fixed element count.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Fixture {
  Ten,
  Hundred,
  Thousand,
  TenThousand,
}

impl Fixture {
  pub const ALL: [Fixture; 4] = [Fixture::Ten, Fixture::Hundred, Fixture::Thousand, Fixture::TenThousand];

  pub fn count(&self) -> usize {
    match self {
      Fixture::Ten => 10,
      Fixture::Hundred => 100,
      Fixture::Thousand => 1_000,
      Fixture::TenThousand => 10_000,
    }
  }

  pub fn url(&self) -> String {
    format!("{}/json-array-data-{}.json", BASE_URL, self.count())
  }
}

impl Display for Fixture {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.count())
  }
}

impl FromStr for Fixture {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let len = s.replace(['_', ','], "");
    Fixture::ALL.into_iter().find(|f| f.count().to_string() == len).ok_or_else(|| Error::UnknownFixture(s.to_string()))
  }
}

/// Deterministic records shaped like the published fixtures.
pub fn sample_records(count: usize) -> Vec<PayloadRecord> {
  (0..count).map(sample_record).collect()
}

pub fn sample_record(i: usize) -> PayloadRecord {
  PayloadRecord {
    id: format!("{:08x}-{:04x}", i.wrapping_mul(2_654_435_761) & 0xffff_ffff, i & 0xffff),
    name: format!("Person {}", i),
    dob: format!("19{:02}-{:02}-{:02}", 50 + i % 50, 1 + i % 12, 1 + i % 28),
    telephone: format!("+1 ({:03}) 555-{:04}", 200 + i % 800, i % 10_000),
    score: (i % 1000) as f64 / 8.0,
    email: format!("person{}@example.com", i),
    url: format!("https://example.com/people/{}", i),
    description: format!("Sample \"record\" #{} with [brackets], {{braces}} and a \\ backslash.", i),
    verified: i % 2 == 0,
    salary: (30_000 + (i * 37) % 90_000) as i32,
  }
}

/// JSON text of a `count`-element fixture.
pub fn sample_payload(count: usize) -> String {
  // PayloadRecord only holds strings and finite numbers
  serde_json::to_string(&sample_records(count)).unwrap_or_default()
}
