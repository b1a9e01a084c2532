use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::fmt::Display;
use std::io::{self, Read};
use std::marker::PhantomData;
use std::rc::Rc;
use struson::reader::{JsonReader, JsonStreamReader};

/// Pull cursor over the elements of a top-level JSON array, driven by struson's streaming reader.
pub struct StrusonElements<R: Read, T> {
  reader: Option<JsonStreamReader<Watched<R>>>,
  failure: Failure,
  started: bool,
  index: usize,
  _record: PhantomData<fn() -> T>,
}

impl<R: Read, T: DeserializeOwned> StrusonElements<R, T> {
  pub fn new(reader: R) -> Self {
    let failure = Failure::default();
    let reader = JsonStreamReader::new(Watched { inner: reader, failure: failure.clone() });
    Self { reader: Some(reader), failure, started: false, index: 0, _record: PhantomData }
  }

  fn advance(&mut self) -> Result<Option<T>> {
    let failure = &self.failure;
    let reader = match self.reader.as_mut() {
      Some(reader) => reader,
      None => return Ok(None),
    };

    if !self.started {
      reader.begin_array().map_err(|e| failure.error(e))?;
      self.started = true;
    }

    if reader.has_next().map_err(|e| failure.error(e))? {
      let index = self.index;
      let item: T = reader.deserialize_next().map_err(|e| failure.error(format!("element {}: {}", index, e)))?;
      self.index += 1;
      return Ok(Some(item));
    }

    reader.end_array().map_err(|e| failure.error(e))?;
    if let Some(reader) = self.reader.take() {
      reader.consume_trailing_whitespace().map_err(|e| failure.error(e))?;
    }
    Ok(None)
  }
}

impl<R: Read, T: DeserializeOwned> Iterator for StrusonElements<R, T> {
  type Item = Result<T>;

  fn next(&mut self) -> Option<Self::Item> {
    match self.advance() {
      Ok(item) => item.map(Ok),
      Err(err) => {
        self.reader = None;
        Some(Err(err))
      }
    }
  }
}

/// Buffered struson decoding: the whole input is one array.
pub(crate) fn read_whole_array<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
  let mut reader = JsonStreamReader::new(bytes);
  let items: Vec<T> = reader.deserialize_next().map_err(Error::parse)?;
  reader.consume_trailing_whitespace().map_err(Error::parse)?;
  Ok(items)
}

/// The I/O error struson's reader last hit, so that a dropped connection is not mistaken for malformed JSON.
#[derive(Clone, Default)]
struct Failure(Rc<RefCell<Option<io::Error>>>);

impl Failure {
  fn error<E: Display>(&self, err: E) -> Error {
    match self.0.borrow_mut().take() {
      Some(io) => Error::from(io),
      None => Error::parse(err),
    }
  }
}

struct Watched<R> {
  inner: R,
  failure: Failure,
}

impl<R: Read> Read for Watched<R> {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    self.inner.read(buf).map_err(|e| {
      let copy = io::Error::new(e.kind(), e.to_string());
      *self.failure.0.borrow_mut() = Some(e);
      copy
    })
  }
}
