use crate::{Error, Result};
use async_trait::async_trait;
use encoding_rs::{Decoder, DecoderResult, Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio_stream::{Stream, StreamExt};
use tokio_util::io::StreamReader;


/// Response body positioned at its first byte.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// HTTP GET in the two shapes the benchmark strategies consume.
#[async_trait]
pub trait Fetch: Send + Sync {
  /// Reads the whole body and decodes it to text.
  async fn text(&self, url: &str) -> Result<String>;

  /// Returns the body as a UTF-8 byte stream without reading it. The body is transcoded chunk by chunk like
  /// [`Fetch::text`] decodes it, so a byte order mark is dropped.
  async fn stream(&self, url: &str) -> Result<ByteStream>;
}

#[derive(Clone, Debug)]
pub struct FetchConfig {
  pub user_agent: String,
  /// Idle keep-alive connections retained per host between requests.
  pub pool_max_idle_per_host: usize,
  /// Worker threads of the runtime that drives sockets while a run blocks on them.
  pub worker_threads: usize,
}

impl Default for FetchConfig {
  fn default() -> Self {
    Self {
      user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
      pool_max_idle_per_host: 0,
      worker_threads: 1,
    }
  }
}

pub struct HttpFetcher {
  client: reqwest::Client,
  open: Arc<AtomicUsize>,
}

impl HttpFetcher {
  pub fn new(config: &FetchConfig) -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(config.user_agent.as_str())
      .pool_max_idle_per_host(config.pool_max_idle_per_host)
      .build()
      .map_err(|e| Error::Client(e.to_string()))?;
    Ok(Self { client, open: Arc::default() })
  }

  /// Responses and body streams handed out by this fetcher that have not been dropped yet.
  pub fn open_responses(&self) -> usize {
    self.open.load(Ordering::SeqCst)
  }

  async fn get(&self, url: &str) -> Result<(reqwest::Response, OpenGuard)> {
    let guard = OpenGuard::acquire(&self.open);
    log::debug!("GET {}", url);
    let response = self.client.get(url).send().await.map_err(|e| transport(url, e))?;
    let status = response.status();
    if !status.is_success() {
      return Err(Error::Status { url: url.to_string(), status: status.as_u16() });
    }
    log::debug!("{} {} {:?} bytes", status, url, response.content_length());
    Ok((response, guard))
  }
}

#[async_trait]
impl Fetch for HttpFetcher {
  async fn text(&self, url: &str) -> Result<String> {
    let (response, _guard) = self.get(url).await?;
    let charset = response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).and_then(charset);
    let charset = charset.map(str::to_string);
    let bytes = response.bytes().await.map_err(|e| transport(url, e))?;
    decode_text(&bytes, charset.as_deref())
  }

  async fn stream(&self, url: &str) -> Result<ByteStream> {
    let (response, guard) = self.get(url).await?;
    let charset = response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).and_then(charset);
    let decoder = encoding(charset).new_decoder();
    let chunks = response.bytes_stream().map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e)));
    let chunks = Transcoded { inner: Box::pin(chunks), decoder, finished: false };
    Ok(Box::pin(Tracked { inner: Box::pin(StreamReader::new(chunks)), _guard: guard }))
  }
}

fn transport(url: &str, err: reqwest::Error) -> Error {
  Error::Transport { url: url.to_string(), message: err.to_string() }
}

/// Decodes a body in the charset of its `Content-Type`, UTF-8 by default. A byte order mark overrides the label.
pub fn decode_text(bytes: &[u8], charset: Option<&str>) -> Result<String> {
  let (text, encoding, malformed) = encoding(charset).decode(bytes);
  if malformed {
    return Err(Error::CharacterDecoding { encoding: encoding.name() });
  }
  Ok(text.into_owned())
}

fn encoding(charset: Option<&str>) -> &'static Encoding {
  charset.and_then(|label| Encoding::for_label(label.as_bytes())).unwrap_or(UTF_8)
}

/// `charset` parameter of a media type such as `application/json; charset=utf-8`.
pub fn charset(content_type: &str) -> Option<&str> {
  content_type.split(';').skip(1).find_map(|param| {
    let (name, value) = param.split_once('=')?;
    if name.trim().eq_ignore_ascii_case("charset") {
      Some(value.trim().trim_matches('"'))
    } else {
      None
    }
  })
}

struct OpenGuard(Arc<AtomicUsize>);

impl OpenGuard {
  fn acquire(open: &Arc<AtomicUsize>) -> Self {
    open.fetch_add(1, Ordering::SeqCst);
    OpenGuard(open.clone())
  }
}

impl Drop for OpenGuard {
  fn drop(&mut self) {
    self.0.fetch_sub(1, Ordering::SeqCst);
  }
}

struct Tracked {
  inner: ByteStream,
  _guard: OpenGuard,
}

impl AsyncRead for Tracked {
  fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
    self.inner.as_mut().poll_read(cx, buf)
  }
}

/// Body chunks decoded to UTF-8 as they arrive. Undecodable bytes end the stream with an `InvalidData` error that
/// carries [`Error::CharacterDecoding`].
struct Transcoded<S> {
  inner: S,
  decoder: Decoder,
  finished: bool,
}

impl<S, B> Stream for Transcoded<S>
where
  S: Stream<Item = io::Result<B>> + Unpin,
  B: AsRef<[u8]>,
{
  type Item = io::Result<Cursor<Vec<u8>>>;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = &mut *self;
    if this.finished {
      return Poll::Ready(None);
    }
    let item = match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
      Some(Ok(chunk)) => transcode(&mut this.decoder, chunk.as_ref(), false),
      Some(Err(err)) => Err(err),
      None => {
        this.finished = true;
        transcode(&mut this.decoder, &[], true)
      }
    };
    this.finished |= item.is_err();
    Poll::Ready(Some(item.map(Cursor::new)))
  }
}

fn transcode(decoder: &mut Decoder, src: &[u8], last: bool) -> io::Result<Vec<u8>> {
  let capacity = decoder.max_utf8_buffer_length_without_replacement(src.len()).unwrap_or(src.len() * 3 + 4);
  let mut out = vec![0; capacity];
  let (mut read, mut written) = (0, 0);
  loop {
    let (result, r, w) = decoder.decode_to_utf8_without_replacement(&src[read..], &mut out[written..], last);
    read += r;
    written += w;
    match result {
      DecoderResult::InputEmpty => break,
      DecoderResult::OutputFull => out.resize(out.len() * 2 + 4, 0),
      DecoderResult::Malformed(..) => {
        let err = Error::CharacterDecoding { encoding: decoder.encoding().name() };
        return Err(io::Error::new(io::ErrorKind::InvalidData, err));
      }
    }
  }
  out.truncate(written);
  Ok(out)
}
