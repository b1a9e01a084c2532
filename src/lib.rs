pub mod bench;
pub mod decode;
pub mod fetch;
pub mod fixture;
pub mod memory;
pub mod record;

pub use bench::{Benchmark, BenchmarkResult, Strategy};
pub use record::PayloadRecord;


#[cfg(test)]
#[global_allocator]
static GLOBAL: memory::CountingAllocator = memory::CountingAllocator;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
  // Transport
  #[error("failed to fetch {url}: {message}")]
  Transport { url: String, message: String },
  #[error("{url} responded with HTTP {status}")]
  Status { url: String, status: u16 },

  // Parse
  #[error("malformed payload: {0}")]
  Parse(String),
  #[error("failed to decode response body in {encoding}")]
  CharacterDecoding { encoding: &'static str },

  #[error("unknown strategy `{0}`")]
  UnknownStrategy(String),
  #[error("unknown fixture `{0}`")]
  UnknownFixture(String),
  #[error("failed to start the I/O runtime: {0}")]
  Runtime(std::io::Error),
  #[error("failed to build the HTTP client: {0}")]
  Client(String),

  #[error(transparent)]
  Io(std::io::Error),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
  /// The payload could not be fetched completely.
  Transport,
  /// The payload was fetched but is not an array of records.
  Parse,
  Other,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::Transport { .. } | Error::Status { .. } | Error::Io(_) => ErrorKind::Transport,
      Error::Parse(_) | Error::CharacterDecoding { .. } => ErrorKind::Parse,
      Error::UnknownStrategy(_) | Error::UnknownFixture(_) | Error::Runtime(_) | Error::Client(_) => {
        ErrorKind::Other
      }
    }
  }

  pub(crate) fn parse<E: std::fmt::Display>(err: E) -> Self {
    Error::Parse(err.to_string())
  }
}

/// An [`Error`] raised below an `io::Read` travels as the payload of an `InvalidData` I/O error and is restored here.
impl From<std::io::Error> for Error {
  fn from(err: std::io::Error) -> Self {
    if !err.get_ref().map_or(false, |inner| inner.is::<Error>()) {
      return Error::Io(err);
    }
    match err.into_inner().map(|inner| inner.downcast::<Error>()) {
      Some(Ok(inner)) => *inner,
      Some(Err(other)) => Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, other)),
      None => Error::Io(std::io::Error::from(std::io::ErrorKind::InvalidData)),
    }
  }
}
