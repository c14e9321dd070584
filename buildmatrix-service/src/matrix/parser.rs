// Matrix document parser
// Loads matrix.yml into the domain model, preserving axis declaration order

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::matrix::models::{Axis, AxisValue, BlacklistEntry, Matrix, OptionSpec};

/// Raw document shape before validation.
///
/// `serde_yaml::Mapping` preserves document order, which the expander relies
/// on for deterministic product order.
#[derive(Debug, Deserialize)]
struct RawDocument {
    matrix: serde_yaml::Mapping,
    #[serde(default)]
    blacklist: Vec<serde_yaml::Mapping>,
    image_id: String,
    image_name: String,
    #[serde(default)]
    options: serde_yaml::Mapping,
}

/// Parser for the matrix definition file
pub struct MatrixParser;

impl MatrixParser {
    /// Load and validate a matrix definition from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Matrix, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_str(&source)
    }

    /// Parse and validate a matrix definition from YAML text
    pub fn from_str(source: &str) -> Result<Matrix, ConfigError> {
        let raw: RawDocument = serde_yaml::from_str(source)?;

        let mut axes = Vec::with_capacity(raw.matrix.len());
        for (key, value) in &raw.matrix {
            let name = mapping_key(key, "matrix")?;
            let sequence = value.as_sequence().ok_or_else(|| {
                ConfigError::Invalid(format!("axis '{}' must be a sequence of values", name))
            })?;
            let mut values = Vec::with_capacity(sequence.len());
            for item in sequence {
                values.push(AxisValue::from_yaml(item)?);
            }
            axes.push(Axis { name, values });
        }

        let mut blacklist = Vec::with_capacity(raw.blacklist.len());
        for entry in &raw.blacklist {
            let mut pairs = Vec::with_capacity(entry.len());
            for (key, value) in entry {
                let axis = mapping_key(key, "blacklist")?;
                pairs.push((axis, AxisValue::from_yaml(value)?));
            }
            blacklist.push(BlacklistEntry::new(pairs));
        }

        let mut options = Vec::with_capacity(raw.options.len());
        for (key, value) in &raw.options {
            let name = mapping_key(key, "options")?;
            let include_file = match value {
                serde_yaml::Value::Null => false,
                serde_yaml::Value::Mapping(def) => def
                    .get("include_file")
                    .and_then(serde_yaml::Value::as_bool)
                    .unwrap_or(false),
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "option '{}' must be null or a mapping, found {:?}",
                        name, other
                    )))
                }
            };
            options.push(OptionSpec { name, include_file });
        }

        Ok(Matrix {
            axes,
            blacklist,
            image_id: raw.image_id,
            image_name: raw.image_name,
            options,
        })
    }
}

fn mapping_key(key: &serde_yaml::Value, section: &str) -> Result<String, ConfigError> {
    key.as_str().map(str::to_string).ok_or_else(|| {
        ConfigError::Invalid(format!("keys in '{}' must be strings, found {:?}", section, key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
matrix:
  os:
    - jessie
    - stretch
  python:
    - "2.7"
    - "3.5"

blacklist:
  - os: jessie
    python: "3.5"

image_id: "base-{os}-python{python}"
image_name: "registry.example.com/base:{ID}"

options:
  push: ~
  ssh_key:
    include_file: true
"#;

    #[test]
    fn test_parse_full_document() {
        let matrix = MatrixParser::from_str(SAMPLE).unwrap();

        assert_eq!(matrix.axes.len(), 2);
        assert_eq!(matrix.axes[0].name, "os");
        assert_eq!(matrix.axes[1].name, "python");
        assert_eq!(
            matrix.axes[0].values,
            vec![AxisValue::from("jessie"), AxisValue::from("stretch")]
        );

        assert_eq!(matrix.blacklist.len(), 1);
        assert_eq!(matrix.image_id, "base-{os}-python{python}");
        assert_eq!(matrix.image_name, "registry.example.com/base:{ID}");

        assert_eq!(matrix.options.len(), 2);
        assert_eq!(matrix.options[0].name, "push");
        assert!(!matrix.options[0].include_file);
        assert_eq!(matrix.options[1].name, "ssh_key");
        assert!(matrix.options[1].include_file);
    }

    #[test]
    fn test_axis_order_preserved() {
        let source = r#"
matrix:
  zeta: [1]
  alpha: [2]
  mid: [3]
image_id: "x"
image_name: "y"
"#;
        let matrix = MatrixParser::from_str(source).unwrap();
        let names: Vec<_> = matrix.axis_names().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_blacklist_and_options_default_empty() {
        let source = r#"
matrix:
  os: [a]
image_id: "img-{os}"
image_name: "proj-{ID}"
"#;
        let matrix = MatrixParser::from_str(source).unwrap();
        assert!(matrix.blacklist.is_empty());
        assert!(matrix.options.is_empty());
    }

    #[test]
    fn test_axis_must_be_sequence() {
        let source = r#"
matrix:
  os: jessie
image_id: "x"
image_name: "y"
"#;
        let err = MatrixParser::from_str(source).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_required_field() {
        let source = r#"
matrix:
  os: [a]
image_id: "x"
"#;
        assert!(matches!(
            MatrixParser::from_str(source),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_numeric_axis_values() {
        let source = r#"
matrix:
  node: [18, 20]
image_id: "node-{node}"
image_name: "n-{ID}"
"#;
        let matrix = MatrixParser::from_str(source).unwrap();
        assert_eq!(
            matrix.axes[0].values,
            vec![AxisValue::Int(18), AxisValue::Int(20)]
        );
    }
}
