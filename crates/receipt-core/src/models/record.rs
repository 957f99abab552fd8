//! Receipt record model.
//!
//! Records come straight from a language model's reply, so every field is
//! decoded loosely: numbers and booleans are kept as text, `null` and missing
//! keys become empty text, and unknown keys are dropped. Nothing here checks
//! whether a date is a date or a tax rate is a rate.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Sentinel the instruction prompt asks the model to use for unreadable values.
pub const UNKNOWN: &str = "不明";

/// Export column order, matching the serialized key names.
pub const FIELD_NAMES: [&str; 10] = [
    "file_name",
    "page_number",
    "date",
    "category",
    "amount",
    "tax_rate",
    "invoice_flag",
    "merchant",
    "description",
    "invoce_number",
];

/// One line item extracted from a receipt page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    /// Name of the uploaded document.
    #[serde(default, deserialize_with = "loose_text")]
    pub file_name: String,

    /// Page of the document the line came from.
    #[serde(default)]
    pub page_number: PageNumber,

    /// Transaction date, usually `YYYY/MM/DD`.
    #[serde(default, deserialize_with = "loose_text")]
    pub date: String,

    /// Account category chosen from the reference list.
    #[serde(default, deserialize_with = "loose_text")]
    pub category: String,

    /// Tax-inclusive amount.
    #[serde(default, deserialize_with = "loose_text")]
    pub amount: String,

    /// Consumption tax rate in percent, `"0"` when untaxed.
    #[serde(default, deserialize_with = "loose_text")]
    pub tax_rate: String,

    /// `""`, `"5"` or `"52"` depending on tax and invoice registration.
    #[serde(default, deserialize_with = "loose_text")]
    pub invoice_flag: String,

    /// Merchant name.
    #[serde(default, deserialize_with = "loose_text")]
    pub merchant: String,

    /// Item description.
    #[serde(default, deserialize_with = "loose_text")]
    pub description: String,

    /// Qualified invoice registration number.
    #[serde(
        rename = "invoce_number",
        alias = "invoice_number",
        default,
        deserialize_with = "loose_text"
    )]
    pub invoice_number: String,
}

impl ReceiptRecord {
    /// Field values in export column order.
    pub fn values(&self) -> [String; 10] {
        [
            self.file_name.clone(),
            self.page_number.to_string(),
            self.date.clone(),
            self.category.clone(),
            self.amount.clone(),
            self.tax_rate.clone(),
            self.invoice_flag.clone(),
            self.merchant.clone(),
            self.description.clone(),
            self.invoice_number.clone(),
        ]
    }

    /// Build a record from one element of a decoded model reply.
    ///
    /// Only JSON objects are accepted; serde would otherwise read an array
    /// positionally into the fields.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if !value.is_object() {
            return Err(<serde_json::Error as serde::de::Error>::custom(format!(
                "expected a JSON object, found {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value)
    }
}

/// Page number, or the text the model put there instead.
///
/// Numbers keep the JSON representation the model used, so `1` and `1.0`
/// both export unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PageNumber {
    Number(serde_json::Number),
    Text(String),
}

impl From<i64> for PageNumber {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for PageNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Number(n) => Self::Number(n),
            other => Self::Text(value_to_text(other)),
        })
    }
}

fn loose_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_to_text)
}

/// Short name of a JSON value's type, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
