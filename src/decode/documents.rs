use super::from_serde_json;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::de::IoRead;
use serde_json::StreamDeserializer;
use std::io::{BufReader, Read};

/// Elements of consecutive top-level JSON arrays read from one stream, e.g. `[1, 2] [3]\n[4]`. At least one array
/// is required.
pub struct Documents<R: Read, T> {
  documents: StreamDeserializer<'static, IoRead<BufReader<R>>, Vec<T>>,
  current: std::vec::IntoIter<T>,
  count: usize,
  done: bool,
}

impl<R: Read, T: DeserializeOwned> Documents<R, T> {
  pub fn new(reader: R) -> Self {
    let documents = serde_json::Deserializer::from_reader(BufReader::new(reader)).into_iter::<Vec<T>>();
    Self { documents, current: Vec::new().into_iter(), count: 0, done: false }
  }

  /// Number of array documents read so far.
  pub fn documents(&self) -> usize {
    self.count
  }
}

impl<R: Read, T: DeserializeOwned> Iterator for Documents<R, T> {
  type Item = Result<T>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      if let Some(item) = self.current.next() {
        return Some(Ok(item));
      }
      if self.done {
        return None;
      }
      match self.documents.next() {
        Some(Ok(document)) => {
          log::trace!("document {}: {} elements", self.count, document.len());
          self.count += 1;
          self.current = document.into_iter();
        }
        Some(Err(err)) => {
          self.done = true;
          return Some(Err(from_serde_json(err)));
        }
        None if self.count == 0 => {
          self.done = true;
          return Some(Err(Error::parse("empty payload, expected an array")));
        }
        None => {
          self.done = true;
          return None;
        }
      }
    }
  }
}
