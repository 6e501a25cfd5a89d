//! Formatting of search hits read as JSON lines.

use field_formats::{FieldValue, FormatContext, FormatError, HtmlContentType, Hit, TextContentType};
use serde_json::{Map, Value};

/// Content type selected for the run.
#[derive(Debug, Clone)]
pub enum HitFormatter {
    Html(HtmlContentType),
    Text(TextContentType),
}

impl HitFormatter {
    /// Format every `_source` field of `hit`, keeping source field order.
    pub fn format_hit(&self, hit: &Hit) -> Result<Map<String, Value>, FormatError> {
        let mut out = Map::with_capacity(hit.source.len());
        for (name, raw) in &hit.source {
            let value = FieldValue::from(raw);
            let formatted = match self {
                Self::Html(html) => {
                    let ctx = FormatContext::new().field(name).hit(hit);
                    html.convert(&value, &ctx)
                }
                Self::Text(text) => text.convert(&value),
            }
            .inspect_err(|e| {
                tracing::debug!(field = %name, id = ?hit.id, error = %e, "field conversion failed");
            })?;
            out.insert(name.clone(), Value::String(formatted));
        }
        Ok(out)
    }
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_hit_line(line: &str) -> Result<Option<Hit>, serde_json::Error> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<Hit>(trimmed).map(Some)
}

#[cfg(test)]
#[path = "hits_test.rs"]
mod tests;
