use super::PayloadRecord;

#[test]
fn all_fields() {
  let json = r#"{"id":"1","name":"A","dob":"1990-01-01","telephone":"555-0100","score":1.5,
    "email":"a@example.com","url":"http://example.com","description":"d","verified":true,"salary":100}"#;
  let record = serde_json::from_str::<PayloadRecord>(json).unwrap();
  assert_eq!("1", record.id);
  assert_eq!("A", record.name);
  assert_eq!("1990-01-01", record.dob);
  assert_eq!("555-0100", record.telephone);
  assert_eq!(1.5, record.score);
  assert_eq!("a@example.com", record.email);
  assert_eq!("http://example.com", record.url);
  assert_eq!("d", record.description);
  assert!(record.verified);
  assert_eq!(100, record.salary);
}

#[test]
fn missing_fields_default() {
  let record = serde_json::from_str::<PayloadRecord>(r#"{"id":"7"}"#).unwrap();
  assert_eq!(PayloadRecord { id: String::from("7"), ..Default::default() }, record);

  let record = serde_json::from_str::<PayloadRecord>("{}").unwrap();
  assert_eq!(PayloadRecord::default(), record);
}

#[test]
fn unknown_fields_ignored() {
  let record = serde_json::from_str::<PayloadRecord>(r#"{"id":"7","nickname":"x","tags":[1,2]}"#).unwrap();
  assert_eq!("7", record.id);
}

#[test]
fn type_mismatch_rejected() {
  for json in [r#"{"score":"high"}"#, r#"{"verified":1}"#, r#"{"salary":1.5}"#, r#"{"id":1}"#, "null", "\"x\""] {
    assert!(serde_json::from_str::<PayloadRecord>(json).is_err(), "{} accepted", json);
  }
}
