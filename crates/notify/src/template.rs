//! Mail body rendering.
//!
//! Templates are stored in `system_settings` and use Jinja syntax.

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
#[error("Template error: {0}")]
pub struct TemplateError(#[from] minijinja::Error);

/// Render a template source against `context`.
pub fn render<S: Serialize>(source: &str, context: S) -> Result<String, TemplateError> {
    let env = minijinja::Environment::new();
    Ok(env.render_str(source, context)?)
}
