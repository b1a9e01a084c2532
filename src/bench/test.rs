use super::{Benchmark, Strategy};
use crate::fetch::{FetchConfig, HttpFetcher};
use crate::fixture::{sample_payload, sample_records};
use crate::memory::SERIAL;
use crate::{Error, ErrorKind};
use httptest::{matchers::*, responders::*, Expectation, Server};
use std::sync::MutexGuard;

const SINGLE_RECORD: &str = r#"[{"id":"1","name":"A","dob":"","telephone":"","score":1.5,"email":"","url":"","description":"","verified":true,"salary":100}]"#;

// Runs share the process-wide peak counter.
fn serial() -> MutexGuard<'static, ()> {
  SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

fn benchmark() -> Benchmark<HttpFetcher, Vec<u8>> {
  let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
  Benchmark::with(fetcher, Vec::new(), 1).unwrap()
}

fn serve(server: &Server, path: &'static str, body: String, times: usize) {
  server.expect(
    Expectation::matching(request::method_path("GET", path))
      .times(times)
      .respond_with(status_code(200).append_header("Content-Type", "application/json; charset=utf-8").body(body)),
  );
}

#[test]
fn every_strategy_counts_all_elements() {
  let _serial = serial();
  let server = Server::run();
  let sizes = [0, 1, 10, 137];
  for (i, size) in sizes.iter().enumerate() {
    serve(&server, ["/0.json", "/1.json", "/10.json", "/137.json"][i], sample_payload(*size), Strategy::ALL.len());
  }

  let mut bench = benchmark();
  for size in sizes {
    let url = server.url_str(&format!("/{}.json", size));
    for strategy in Strategy::ALL {
      let result = bench.run(strategy, &url).unwrap();
      assert_eq!(strategy, result.strategy);
      assert_eq!(size, result.count, "{} on {} elements", strategy, size);
    }
  }
  assert_eq!(0, bench.fetcher().open_responses());
}

#[test]
fn single_record_scenario() {
  let _serial = serial();
  let server = Server::run();
  serve(&server, "/single.json", SINGLE_RECORD.to_string(), 2);

  let mut bench = benchmark();
  let url = server.url_str("/single.json");
  let result = bench.run(Strategy::StreamSerdeJson, &url).unwrap();
  assert_eq!(1, result.count);

  let records = bench.records(Strategy::StreamSerdeJson, &url).unwrap();
  assert_eq!(1, records.len());
  assert_eq!(1.5, records[0].score);
  assert!(records[0].verified);
}

#[test]
fn strategies_yield_identical_records() {
  let _serial = serial();
  let server = Server::run();
  serve(&server, "/64.json", sample_payload(64), Strategy::ALL.len());

  let bench = benchmark();
  let url = server.url_str("/64.json");
  let expected = sample_records(64);
  for strategy in Strategy::ALL {
    let records = bench.records(strategy, &url).unwrap();
    itertools::assert_equal(expected.iter(), records.iter());
  }
}

#[test]
fn byte_order_mark_and_charset_are_honoured_by_every_strategy() {
  let _serial = serial();
  let mut expected = sample_records(3);
  expected.iter_mut().for_each(|record| record.name = format!("Zoë {}", record.id));
  let text = serde_json::to_string(&expected).unwrap();
  let bom = [&b"\xef\xbb\xbf"[..], text.as_bytes()].concat();
  let (latin1, _, unmappable) = encoding_rs::WINDOWS_1252.encode(&text);
  assert!(!unmappable);

  let server = Server::run();
  server.expect(
    Expectation::matching(request::method_path("GET", "/bom.json"))
      .times(Strategy::ALL.len())
      .respond_with(status_code(200).append_header("Content-Type", "application/json").body(bom)),
  );
  server.expect(
    Expectation::matching(request::method_path("GET", "/latin1.json"))
      .times(Strategy::ALL.len())
      .respond_with(
        status_code(200).append_header("Content-Type", "application/json; charset=ISO-8859-1").body(latin1.into_owned()),
      ),
  );

  let bench = benchmark();
  for path in ["/bom.json", "/latin1.json"] {
    let url = server.url_str(path);
    for strategy in Strategy::ALL {
      let records = bench.records(strategy, &url).unwrap_or_else(|e| panic!("{} on {}: {}", strategy, path, e));
      assert_eq!(expected, records, "{} on {}", strategy, path);
    }
  }
  assert_eq!(0, bench.fetcher().open_responses());
}

#[test]
fn undecodable_body_is_parse_error_for_every_strategy() {
  let _serial = serial();
  let server = Server::run();
  server.expect(
    Expectation::matching(request::method_path("GET", "/broken.json"))
      .times(Strategy::ALL.len())
      .respond_with(status_code(200).body(b"[{\"name\":\"\xc3\x28\"}]".to_vec())),
  );

  let mut bench = benchmark();
  let url = server.url_str("/broken.json");
  for strategy in Strategy::ALL {
    let err = bench.run(strategy, &url).unwrap_err();
    assert!(matches!(err, Error::CharacterDecoding { .. }), "{}: {:?}", strategy, err);
  }
  assert_eq!(0, bench.fetcher().open_responses());
}

#[test]
fn summary_lines_written_to_sink() {
  let _serial = serial();
  let server = Server::run();
  serve(&server, "/3.json", sample_payload(3), 2);

  let mut bench = benchmark();
  let url = server.url_str("/3.json");
  bench.run(Strategy::SerdeJson, &url).unwrap();
  bench.run(Strategy::StreamStruson, &url).unwrap();
  let output = String::from_utf8(bench.sink().clone()).unwrap();
  assert_eq!("serde-json Data count: 3\nstream-struson Data count: 3\n", output);
}

#[test]
fn non_array_payload_is_parse_error_for_every_strategy() {
  let _serial = serial();
  let server = Server::run();
  serve(&server, "/object.json", String::from(r#"{"id":"1","name":"A"}"#), Strategy::ALL.len());
  serve(&server, "/empty.json", String::new(), Strategy::ALL.len());
  serve(&server, "/blank.json", String::from(" \n"), Strategy::ALL.len());

  let mut bench = benchmark();
  for path in ["/object.json", "/empty.json", "/blank.json"] {
    let url = server.url_str(path);
    for strategy in Strategy::ALL {
      let err = bench.run(strategy, &url).unwrap_err();
      assert_eq!(ErrorKind::Parse, err.kind(), "{} on {}: {}", strategy, path, err);
    }
  }
  assert!(bench.sink().is_empty());
  assert_eq!(0, bench.fetcher().open_responses());
}

#[test]
fn parse_failure_mid_stream_releases_the_stream() {
  let _serial = serial();
  let server = Server::run();
  let mut body = sample_payload(500);
  body.insert_str(body.len() - 1, r#",{"score":"not a number"}"#);
  serve(&server, "/bad-tail.json", body, Strategy::ALL.len());

  let mut bench = benchmark();
  let url = server.url_str("/bad-tail.json");
  for strategy in Strategy::ALL {
    let err = bench.run(strategy, &url).unwrap_err();
    assert_eq!(ErrorKind::Parse, err.kind(), "{}: {}", strategy, err);
    assert_eq!(0, bench.fetcher().open_responses(), "{}", strategy);
  }
}

#[test]
fn unreachable_url_is_transport_error_without_leaks() {
  let _serial = serial();
  let mut bench = benchmark();
  for strategy in Strategy::ALL {
    let err = bench.run(strategy, "http://127.0.0.1:1/data.json").unwrap_err();
    assert!(matches!(err, Error::Transport { .. }), "{}: {:?}", strategy, err);
    assert_eq!(0, bench.fetcher().open_responses());
  }
  assert!(bench.sink().is_empty());
}

#[test]
fn error_status_is_transport_error() {
  let _serial = serial();
  let server = Server::run();
  server.expect(
    Expectation::matching(request::method_path("GET", "/gone.json"))
      .times(Strategy::ALL.len())
      .respond_with(status_code(500)),
  );

  let mut bench = benchmark();
  let url = server.url_str("/gone.json");
  for strategy in Strategy::ALL {
    let err = bench.run(strategy, &url).unwrap_err();
    assert!(matches!(err, Error::Status { status: 500, .. }), "{}: {:?}", strategy, err);
  }
  assert_eq!(0, bench.fetcher().open_responses());
}

#[test]
fn buffered_run_reports_peak_memory() {
  let _serial = serial();
  let server = Server::run();
  let payload = sample_payload(2_000);
  let len = payload.len() as u64;
  serve(&server, "/2000.json", payload, 1);

  let mut bench = benchmark();
  let result = bench.run(Strategy::SerdeJson, &server.url_str("/2000.json")).unwrap();
  assert_eq!(2_000, result.count);
  assert!(result.peak_memory >= len / 2, "peak {} for {} bytes of text", result.peak_memory, len);
}

#[test]
fn strategy_names() {
  for strategy in Strategy::ALL {
    assert_eq!(strategy, strategy.to_string().parse::<Strategy>().unwrap());
  }
  assert!(Strategy::StreamStruson.is_streaming());
  assert!(!Strategy::Struson.is_streaming());
  assert_eq!("serde_json", Strategy::StreamSerdeJsonDocuments.library());
  assert_eq!("struson", Strategy::Struson.library());
  assert!(matches!("xml".parse::<Strategy>(), Err(Error::UnknownStrategy(name)) if name == "xml"));
}
