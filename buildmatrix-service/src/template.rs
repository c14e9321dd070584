// Build definition rendering
// Renders the templated build definition for one combination

use thiserror::Error;

use crate::matrix::models::{Combination, OptionValue, ResolvedOption};

/// Error rendering the build-definition template
#[derive(Debug, Error)]
#[error("failed to render build definition: {0}")]
pub struct RenderError(#[from] tera::Error);

/// Render the build-definition template for one combination.
///
/// Axis names become top-level template variables; `options` exposes each
/// resolved option's value — `false`/`true` for flags, the in-context file
/// name for file options.
pub fn render_build_definition(
    source: &str,
    combination: &Combination,
    options: &[ResolvedOption],
) -> Result<String, RenderError> {
    let mut context = tera::Context::new();
    for (axis, value) in combination.iter() {
        context.insert(axis.as_str(), value);
    }

    let mut exposed = serde_json::Map::new();
    for option in options {
        let value = match &option.value {
            OptionValue::Flag(flag) => serde_json::Value::Bool(*flag),
            OptionValue::File { context_name, .. } => {
                serde_json::Value::String(context_name.clone())
            }
        };
        exposed.insert(option.name.clone(), value);
    }
    context.insert("options", &serde_json::Value::Object(exposed));

    Ok(tera::Tera::one_off(source, &context, false)?)
}
