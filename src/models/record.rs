use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One normalized CSV row.
///
/// `text` is the embedding payload; every other column survives as a
/// string field and is carried into vector metadata untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub row_index: usize,
    pub text: String,
    pub fields: BTreeMap<String, String>,
}

/// Columns checked, in order, for a human-readable row label.
const LABEL_COLUMNS: &[&str] = &["name", "id", "policy_name", "title"];

impl Record {
    pub fn new(row_index: usize, text: String, fields: BTreeMap<String, String>) -> Self {
        Self {
            row_index,
            text,
            fields,
        }
    }

    /// Row label used as the vector id prefix. Falls back to the row
    /// index when no naming column is present.
    pub fn label(&self) -> String {
        for col in LABEL_COLUMNS {
            if let Some(value) = self.fields.get(*col)
                && !value.trim().is_empty()
            {
                return value.trim().replace(char::is_whitespace, "_");
            }
        }
        format!("row_{}", self.row_index)
    }
}

/// The unit of storage: one embedded chunk ready for upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Map<String, Value>,
}

impl VectorRecord {
    /// `{label}_chunk_{index}_{8 hex chars}`. The random suffix keeps ids
    /// unique across repeated runs over the same input.
    pub fn generate_id(label: &str, chunk_index: usize) -> String {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        format!("{}_chunk_{}_{}", label, chunk_index, &suffix[..8])
    }
}

/// Distance metric for the remote index. Fixed at index creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    Dotproduct,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cosine"),
            Metric::Euclidean => write!(f, "euclidean"),
            Metric::Dotproduct => write!(f, "dotproduct"),
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "euclidean" => Ok(Metric::Euclidean),
            "dotproduct" => Ok(Metric::Dotproduct),
            other => Err(format!(
                "invalid metric '{other}' (expected cosine, euclidean, or dotproduct)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prefers_naming_columns() {
        let mut fields = BTreeMap::new();
        fields.insert("policy_name".to_string(), "Solar Credit".to_string());
        let record = Record::new(3, "text".to_string(), fields);
        assert_eq!(record.label(), "Solar_Credit");
    }

    #[test]
    fn test_label_falls_back_to_row_index() {
        let record = Record::new(7, "text".to_string(), BTreeMap::new());
        assert_eq!(record.label(), "row_7");
    }

    #[test]
    fn test_generate_id_shape_and_uniqueness() {
        let id = VectorRecord::generate_id("row_0", 2);
        assert!(id.starts_with("row_0_chunk_2_"));
        let suffix = id.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, VectorRecord::generate_id("row_0", 2));
    }

    #[test]
    fn test_metric_round_trip() {
        assert_eq!("cosine".parse::<Metric>().unwrap(), Metric::Cosine);
        assert_eq!(Metric::Dotproduct.to_string(), "dotproduct");
        assert!("manhattan".parse::<Metric>().is_err());
    }
}
