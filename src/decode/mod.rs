//! JSON array decoders.
//!
//! Each [`Decoder`] offers a buffered mode, which parses a complete text into a `Vec`, and an incremental mode, which
//! pulls one array element at a time out of a byte reader.
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::io::Read;

mod documents;
pub use documents::*;

mod elements;
pub use elements::*;

mod struson_reader;
pub use struson_reader::*;


/// Lazy, single-pass sequence of decoded array elements. It ends after the first error.
pub type Records<'r, T> = Box<dyn Iterator<Item = Result<T>> + 'r>;

pub trait Decoder {
  fn name(&self) -> &'static str;

  /// Parses `text`, which must be a single JSON array, in one call.
  fn decode_all<T: DeserializeOwned>(&self, text: &str) -> Result<Vec<T>>;

  /// Decodes the elements of the JSON array read from `reader`, each one as soon as its bytes have arrived.
  fn decode_incremental<'r, T, R>(&self, reader: R) -> Records<'r, T>
  where
    T: DeserializeOwned + 'r,
    R: Read + 'r;
}

/// [serde_json](https://docs.rs/serde_json) backed decoder.
#[derive(Copy, Clone, Debug, Default)]
pub struct SerdeJson;

impl SerdeJson {
  /// Decodes a stream of whitespace separated JSON arrays, yielding the elements of every array in order. One array is
  /// held in memory at a time.
  pub fn decode_documents<'r, T, R>(&self, reader: R) -> Records<'r, T>
  where
    T: DeserializeOwned + 'r,
    R: Read + 'r,
  {
    Box::new(Documents::new(reader))
  }
}

impl Decoder for SerdeJson {
  fn name(&self) -> &'static str {
    "serde_json"
  }

  fn decode_all<T: DeserializeOwned>(&self, text: &str) -> Result<Vec<T>> {
    serde_json::from_str::<Vec<T>>(text).map_err(Error::parse)
  }

  fn decode_incremental<'r, T, R>(&self, reader: R) -> Records<'r, T>
  where
    T: DeserializeOwned + 'r,
    R: Read + 'r,
  {
    Box::new(ArrayElements::new(reader))
  }
}

/// [struson](https://docs.rs/struson) backed decoder.
#[derive(Copy, Clone, Debug, Default)]
pub struct Struson;

impl Decoder for Struson {
  fn name(&self) -> &'static str {
    "struson"
  }

  fn decode_all<T: DeserializeOwned>(&self, text: &str) -> Result<Vec<T>> {
    read_whole_array(text.as_bytes())
  }

  fn decode_incremental<'r, T, R>(&self, reader: R) -> Records<'r, T>
  where
    T: DeserializeOwned + 'r,
    R: Read + 'r,
  {
    Box::new(StrusonElements::new(reader))
  }
}

fn from_serde_json(err: serde_json::Error) -> Error {
  if err.is_io() {
    Error::from(std::io::Error::from(err))
  } else {
    Error::parse(err)
  }
}
