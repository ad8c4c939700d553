// mandi/src/model/loose.rs

//! Deserializers for form-entered fields that reach the store either as JSON numbers
//! or as the raw strings the listing form produced (`"2019"`, `"4+"`, `"18500"`).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
  Int(u64),
  Float(f64),
  Text(String),
}

/// A price given as a number or numeric string. An empty string reads as zero.
pub fn price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
  D: Deserializer<'de>,
{
  match Loose::deserialize(deserializer)? {
    Loose::Int(n) => Ok(n as f64),
    Loose::Float(n) => Ok(n),
    Loose::Text(s) if s.trim().is_empty() => Ok(0.0),
    Loose::Text(s) => s.trim().parse::<f64>().map_err(D::Error::custom),
  }
}

/// An optional year. Null, absent and blank strings all read as `None`.
pub fn opt_year<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<Loose>::deserialize(deserializer)? {
    None => Ok(None),
    Some(Loose::Int(n)) => u16::try_from(n).map(Some).map_err(D::Error::custom),
    Some(Loose::Float(n)) if n.fract() == 0.0 && (0.0..=u16::MAX as f64).contains(&n) => Ok(Some(n as u16)),
    Some(Loose::Float(n)) => Err(D::Error::custom(format!("invalid year {}", n))),
    Some(Loose::Text(s)) if s.trim().is_empty() => Ok(None),
    Some(Loose::Text(s)) => s.trim().parse::<u16>().map(Some).map_err(D::Error::custom),
  }
}

/// Optional free text that may have been stored as a bare number.
pub fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(match Option::<Loose>::deserialize(deserializer)? {
    None => None,
    Some(Loose::Int(n)) => Some(n.to_string()),
    Some(Loose::Float(n)) => Some(n.to_string()),
    Some(Loose::Text(s)) if s.trim().is_empty() => None,
    Some(Loose::Text(s)) => Some(s),
  })
}

#[cfg(test)]
mod tests {
  use crate::model::UsedDetails;
  use serde_json::json;

  fn used(body: serde_json::Value) -> UsedDetails {
    serde_json::from_value(body).unwrap()
  }

  #[test]
  fn form_strings_and_numbers_read_the_same() {
    let from_form = used(json!({"yearOfPurchase": "2019", "ownersCount": "1", "usage": "40k km"}));
    let from_numbers = used(json!({"yearOfPurchase": 2019, "ownersCount": 1, "usage": "40k km"}));
    assert_eq!(from_form, from_numbers);
    assert_eq!(from_form.year_of_purchase, Some(2019));
    assert_eq!(from_form.owners_count.as_deref(), Some("1"));
  }

  #[test]
  fn blank_and_open_ended_values() {
    let d = used(json!({"yearOfPurchase": "", "ownersCount": "4+", "usage": null}));
    assert_eq!(d.year_of_purchase, None);
    assert_eq!(d.owners_count.as_deref(), Some("4+"));
    assert_eq!(d.usage, None);
    assert!(serde_json::from_value::<UsedDetails>(json!({"yearOfPurchase": "soon"})).is_err());
  }
}
