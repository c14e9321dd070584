// Matrix Combination Expander
// Cartesian product over axis values, blacklist filtering, and
// deterministic per-combination image naming

use sha2::{Digest, Sha256};

use crate::error::ConfigError;
use crate::matrix::models::{BlacklistEntry, Combination, Matrix};

/// Reserved placeholder in the image-name template that receives the digest
pub const IMAGE_ID_PLACEHOLDER: &str = "ID";

/// The result of expanding a matrix: surviving combinations in product order,
/// plus the combinations a blacklist entry excluded (kept for reporting).
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    pub combinations: Vec<Combination>,
    pub blacklisted: Vec<Combination>,
}

/// Expands matrix axes into concrete combinations
pub struct MatrixExpander;

impl MatrixExpander {
    /// Expand the cartesian product of the matrix's axes.
    ///
    /// Product order follows axis declaration order with the rightmost axis
    /// varying fastest; the same matrix always expands to the same sequence.
    /// A matrix with no axes yields the single empty combination; an axis
    /// with no values empties the product.
    pub fn expand(matrix: &Matrix) -> Expansion {
        let axes = &matrix.axes;
        let mut expansion = Expansion::default();

        if axes.iter().any(|axis| axis.values.is_empty()) {
            return expansion;
        }

        let mut indices = vec![0usize; axes.len()];
        loop {
            let combination = Combination::new(
                axes.iter()
                    .zip(&indices)
                    .map(|(axis, &i)| (axis.name.clone(), axis.values[i].clone()))
                    .collect(),
            );

            if Self::is_blacklisted(&combination, &matrix.blacklist) {
                expansion.blacklisted.push(combination);
            } else {
                expansion.combinations.push(combination);
            }

            // Odometer increment, rightmost axis first
            let mut pos = axes.len();
            while pos > 0 {
                indices[pos - 1] += 1;
                if indices[pos - 1] < axes[pos - 1].values.len() {
                    break;
                }
                indices[pos - 1] = 0;
                pos -= 1;
            }
            if pos == 0 {
                break;
            }
        }

        expansion
    }

    /// True if any blacklist entry is fully contained in the combination
    pub fn is_blacklisted(combination: &Combination, blacklist: &[BlacklistEntry]) -> bool {
        blacklist
            .iter()
            .any(|entry| entry.is_contained_in(combination))
    }

    /// Derive the deterministic image name for one combination.
    ///
    /// The `image_id` template is formatted with the combination's values,
    /// hashed (SHA-256, hex-encoded), and the digest substituted for the
    /// reserved `{ID}` placeholder in the `image_name` template. Pure in
    /// (combination, templates): equal inputs give equal names within and
    /// across runs.
    pub fn image_name(combination: &Combination, matrix: &Matrix) -> Result<String, ConfigError> {
        let formatted_id = format_template(&matrix.image_id, |key| {
            combination.get(key).map(|value| value.to_string())
        })?;

        let digest = hex::encode(Sha256::digest(formatted_id.as_bytes()));

        format_template(&matrix.image_name, |key| {
            if key == IMAGE_ID_PLACEHOLDER {
                Some(digest.clone())
            } else {
                combination.get(key).map(|value| value.to_string())
            }
        })
    }
}

/// Substitute `{name}` placeholders in a template string.
///
/// `{{` and `}}` escape to literal braces. A placeholder the lookup does not
/// know, an unclosed `{`, or a stray `}` is a `ConfigError`.
pub fn format_template(
    template: &str,
    mut lookup: impl FnMut(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(k) => key.push(k),
                        None => {
                            return Err(ConfigError::UnbalancedBraces(template.to_string()));
                        }
                    }
                }
                let value = lookup(&key).ok_or_else(|| ConfigError::UnknownPlaceholder {
                    template: template.to_string(),
                    placeholder: key.clone(),
                })?;
                out.push_str(&value);
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(ConfigError::UnbalancedBraces(template.to_string()));
                }
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::models::{Axis, AxisValue};

    fn matrix(axes: Vec<(&str, Vec<&str>)>, blacklist: Vec<Vec<(&str, &str)>>) -> Matrix {
        Matrix {
            axes: axes
                .into_iter()
                .map(|(name, values)| Axis {
                    name: name.to_string(),
                    values: values.into_iter().map(AxisValue::from).collect(),
                })
                .collect(),
            blacklist: blacklist
                .into_iter()
                .map(|pairs| {
                    BlacklistEntry::new(
                        pairs
                            .into_iter()
                            .map(|(k, v)| (k.to_string(), AxisValue::from(v)))
                            .collect(),
                    )
                })
                .collect(),
            image_id: "img-{os}".to_string(),
            image_name: "proj-{ID}".to_string(),
            options: Vec::new(),
        }
    }

    #[test]
    fn test_expand_product_order() {
        let m = matrix(
            vec![("number", vec!["1", "2"]), ("character", vec!["a", "b"])],
            vec![],
        );
        let expansion = MatrixExpander::expand(&m);

        let rendered: Vec<String> = expansion
            .combinations
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "{number=1, character=a}",
                "{number=1, character=b}",
                "{number=2, character=a}",
                "{number=2, character=b}",
            ]
        );
    }

    #[test]
    fn test_expand_count_minus_blacklisted() {
        let m = matrix(
            vec![("os", vec!["a", "b"]), ("py", vec!["2", "3"])],
            vec![vec![("os", "a"), ("py", "3")]],
        );
        let expansion = MatrixExpander::expand(&m);
        assert_eq!(expansion.combinations.len(), 3);
        assert_eq!(expansion.blacklisted.len(), 1);
        assert_eq!(expansion.blacklisted[0].to_string(), "{os=a, py=3}");
    }

    #[test]
    fn test_expand_no_axes_yields_empty_combination() {
        let m = matrix(vec![], vec![]);
        let expansion = MatrixExpander::expand(&m);
        assert_eq!(expansion.combinations.len(), 1);
        assert!(expansion.combinations[0].is_empty());
    }

    #[test]
    fn test_expand_empty_axis_empties_product() {
        let m = matrix(vec![("os", vec!["a"]), ("py", vec![])], vec![]);
        let expansion = MatrixExpander::expand(&m);
        assert!(expansion.combinations.is_empty());
        assert!(expansion.blacklisted.is_empty());
    }

    #[test]
    fn test_image_name_deterministic_and_distinct() {
        let m = matrix(vec![("os", vec!["a", "b"])], vec![]);
        let expansion = MatrixExpander::expand(&m);
        let first = &expansion.combinations[0];
        let second = &expansion.combinations[1];

        let name_a = MatrixExpander::image_name(first, &m).unwrap();
        let name_a_again = MatrixExpander::image_name(first, &m).unwrap();
        let name_b = MatrixExpander::image_name(second, &m).unwrap();

        assert_eq!(name_a, name_a_again);
        assert_ne!(name_a, name_b);
        assert!(name_a.starts_with("proj-"));
        // hex-encoded SHA-256
        assert_eq!(name_a.len(), "proj-".len() + 64);
    }

    #[test]
    fn test_image_name_unknown_axis_fails() {
        let mut m = matrix(vec![("os", vec!["a"])], vec![]);
        m.image_id = "img-{missing}".to_string();
        let expansion = MatrixExpander::expand(&m);
        let err = MatrixExpander::image_name(&expansion.combinations[0], &m).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPlaceholder { .. }));
    }

    #[test]
    fn test_format_template_escapes() {
        let out = format_template("a{{b}}c-{os}", |k| {
            (k == "os").then(|| "jessie".to_string())
        })
        .unwrap();
        assert_eq!(out, "a{b}c-jessie");
    }

    #[test]
    fn test_format_template_unbalanced() {
        assert!(matches!(
            format_template("oops{", |_| None),
            Err(ConfigError::UnbalancedBraces(_))
        ));
        assert!(matches!(
            format_template("oops}", |_| None),
            Err(ConfigError::UnbalancedBraces(_))
        ));
    }
}
