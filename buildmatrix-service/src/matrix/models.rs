// Matrix domain model
// Axes, combinations, blacklist entries, and build options

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::ConfigError;

/// A scalar axis value as it appears in the matrix document.
///
/// YAML scalars are kept in their native type so `3` and `"3"` stay
/// distinguishable for blacklist comparison, while `Display` gives the form
/// used in templates and log lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AxisValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AxisValue {
    /// Convert a YAML scalar into an axis value.
    ///
    /// Sequences and mappings are rejected: axis values and blacklist values
    /// must be scalars.
    pub fn from_yaml(value: &serde_yaml::Value) -> Result<Self, ConfigError> {
        match value {
            serde_yaml::Value::Bool(b) => Ok(AxisValue::Bool(*b)),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(AxisValue::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(AxisValue::Float(f))
                } else {
                    Err(ConfigError::Invalid(format!(
                        "unrepresentable number '{}' in matrix value",
                        n
                    )))
                }
            }
            serde_yaml::Value::String(s) => Ok(AxisValue::String(s.clone())),
            other => Err(ConfigError::Invalid(format!(
                "matrix values must be scalars, found {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for AxisValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisValue::Bool(b) => write!(f, "{}", b),
            AxisValue::Int(i) => write!(f, "{}", i),
            AxisValue::Float(x) => write!(f, "{}", x),
            AxisValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for AxisValue {
    fn from(s: &str) -> Self {
        AxisValue::String(s.to_string())
    }
}

impl From<String> for AxisValue {
    fn from(s: String) -> Self {
        AxisValue::String(s)
    }
}

impl From<i64> for AxisValue {
    fn from(i: i64) -> Self {
        AxisValue::Int(i)
    }
}

/// A named dimension of the build matrix with its ordered values
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub name: String,
    pub values: Vec<AxisValue>,
}

/// A partial axis assignment that forbids any combination containing it
#[derive(Debug, Clone, PartialEq)]
pub struct BlacklistEntry {
    entries: Vec<(String, AxisValue)>,
}

impl BlacklistEntry {
    pub fn new(entries: Vec<(String, AxisValue)>) -> Self {
        Self { entries }
    }

    /// True if every axis/value pair of this entry appears in the combination.
    pub fn is_contained_in(&self, combination: &Combination) -> bool {
        self.entries
            .iter()
            .all(|(axis, value)| combination.get(axis) == Some(value))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, AxisValue)> {
        self.entries.iter()
    }
}

/// One concrete assignment of a value to every axis, in axis order.
///
/// Immutable once produced by the expander.
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    entries: Vec<(String, AxisValue)>,
}

impl Combination {
    pub fn new(entries: Vec<(String, AxisValue)>) -> Self {
        Self { entries }
    }

    /// Look up the value assigned to an axis
    pub fn get(&self, axis: &str) -> Option<&AxisValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == axis)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, AxisValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (axis, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", axis, value)?;
        }
        write!(f, "}}")
    }
}

/// Static schema of a caller-supplied build option, as declared in the matrix
/// document. Resolution into a value happens once per run, producing a
/// separate [`ResolvedOption`] — the schema itself is never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub name: String,
    /// Whether the option's value is a local file to include in the context
    pub include_file: bool,
}

/// The resolved value of one build option for this invocation
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// Boolean toggle (false when the flag was not passed)
    Flag(bool),
    /// A local file to include in the build context
    File {
        /// The path exactly as the caller supplied it
        raw: String,
        /// Resolved absolute path on the local filesystem
        local_path: PathBuf,
        /// Basename used as the file's name inside the build context
        context_name: String,
    },
}

impl OptionValue {
    /// Whether the option counts as set for template purposes
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Flag(b) => *b,
            OptionValue::File { .. } => true,
        }
    }
}

/// An immutable resolved build option: schema name plus this run's value.
/// The same resolved set applies to every combination in one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOption {
    pub name: String,
    pub value: OptionValue,
}

/// The parsed build matrix: ordered axes, blacklist, naming templates, and
/// option schemas.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    /// Axes in document order; product order follows this order
    pub axes: Vec<Axis>,
    /// Partial combinations to exclude
    pub blacklist: Vec<BlacklistEntry>,
    /// Template for the string that is hashed into the image id
    pub image_id: String,
    /// Template for the image name; may reference `{ID}` and any axis
    pub image_name: String,
    /// Declared options in document order
    pub options: Vec<OptionSpec>,
}

impl Matrix {
    /// Axis names in declaration order
    pub fn axis_names(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|axis| axis.name.as_str())
    }
}
