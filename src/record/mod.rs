use serde::{Deserialize, Serialize};

#[cfg(test)]
mod test;

/// One element of the benchmark payload array.
///
/// Fields absent from the JSON take their default value; a field of the wrong JSON type is rejected by the decoder.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadRecord {
  pub id: String,
  pub name: String,
  pub dob: String,
  pub telephone: String,
  pub score: f64,
  pub email: String,
  pub url: String,
  pub description: String,
  pub verified: bool,
  pub salary: i32,
}
