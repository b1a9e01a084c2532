use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::io::{BufRead, BufReader, Read};
use std::marker::PhantomData;

/// Pull cursor over the elements of a top-level JSON array.
///
/// The raw bytes of one element are cut out of the input by tracking bracket nesting and string literals, then handed
/// to `serde_json`. Only the current element is buffered, so memory stays bounded by the largest element regardless
/// of the array length.
pub struct ArrayElements<R: Read, T> {
  input: BufReader<R>,
  state: State,
  element: Vec<u8>,
  index: usize,
  _record: PhantomData<fn() -> T>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
  Start,
  Elements,
  Done,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Terminator {
  Comma,
  Close,
}

impl<R: Read, T: DeserializeOwned> ArrayElements<R, T> {
  pub fn new(reader: R) -> Self {
    let element = Vec::with_capacity(1024);
    Self { input: BufReader::new(reader), state: State::Start, element, index: 0, _record: PhantomData }
  }

  /// Number of elements decoded so far.
  pub fn index(&self) -> usize {
    self.index
  }

  fn advance(&mut self) -> Result<Option<T>> {
    let token = match self.state {
      State::Done => return Ok(None),
      State::Start => {
        match self.next_token()? {
          Some(b'[') => (),
          Some(other) => {
            return Err(Error::Parse(format!("expected `[` at the start of the payload, found {}", symbol(other))))
          }
          None => return Err(Error::parse("empty payload, expected an array")),
        }
        self.state = State::Elements;
        match self.next_token()? {
          Some(b']') => {
            self.finish()?;
            return Ok(None);
          }
          token => token,
        }
      }
      State::Elements => self.next_token()?,
    };

    let first = match token {
      Some(b) if b == b',' || b == b']' => {
        return Err(Error::Parse(format!("expected array element {}, found {}", self.index, symbol(b))))
      }
      Some(b) => b,
      None => return Err(self.unexpected_eof()),
    };

    let terminator = self.scan_element(first)?;
    let item = serde_json::from_slice::<T>(&self.element)
      .map_err(|e| Error::Parse(format!("element {}: {}", self.index, e)))?;
    log::trace!("element {}: {} bytes", self.index, self.element.len());
    self.index += 1;

    if terminator == Terminator::Close {
      self.finish()?;
    }
    Ok(Some(item))
  }

  /// Copies one element into `self.element`, consuming the `,` or `]` that follows it.
  fn scan_element(&mut self, first: u8) -> Result<Terminator> {
    self.element.clear();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut b = first;
    loop {
      if in_string {
        if escaped {
          escaped = false;
        } else if b == b'\\' {
          escaped = true;
        } else if b == b'"' {
          in_string = false;
        }
      } else {
        match b {
          b'"' => in_string = true,
          b'{' | b'[' => depth += 1,
          b',' if depth == 0 => return Ok(Terminator::Comma),
          b']' if depth == 0 => return Ok(Terminator::Close),
          b'}' | b']' if depth > 0 => depth -= 1,
          _ => (),
        }
      }
      self.element.push(b);
      b = match self.next_byte()? {
        Some(b) => b,
        None => return Err(self.unexpected_eof()),
      };
    }
  }

  /// Only whitespace may follow the closing bracket.
  fn finish(&mut self) -> Result<()> {
    self.state = State::Done;
    match self.next_token()? {
      None => Ok(()),
      Some(b) => Err(Error::Parse(format!("trailing characters after the array: {}", symbol(b)))),
    }
  }

  fn unexpected_eof(&self) -> Error {
    Error::Parse(format!("unexpected end of payload in array element {}", self.index))
  }

  fn next_token(&mut self) -> std::io::Result<Option<u8>> {
    loop {
      match self.next_byte()? {
        Some(b' ' | b'\t' | b'\n' | b'\r') => continue,
        other => return Ok(other),
      }
    }
  }

  fn next_byte(&mut self) -> std::io::Result<Option<u8>> {
    let b = self.input.fill_buf()?.first().copied();
    if b.is_some() {
      self.input.consume(1);
    }
    Ok(b)
  }
}

impl<R: Read, T: DeserializeOwned> Iterator for ArrayElements<R, T> {
  type Item = Result<T>;

  fn next(&mut self) -> Option<Self::Item> {
    match self.advance() {
      Ok(Some(item)) => Some(Ok(item)),
      Ok(None) => None,
      Err(err) => {
        self.state = State::Done;
        Some(Err(err))
      }
    }
  }
}

fn symbol(b: u8) -> String {
  if b.is_ascii_graphic() {
    format!("`{}`", b as char)
  } else {
    format!("0x{:02X}", b)
  }
}
