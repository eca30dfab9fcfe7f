//! Template engine adapter.
//!
//! Wraps one long-lived [`Tera`] instance per builder. The adapter adds no
//! caching of its own; whatever compilation reuse Tera performs internally
//! is the only state carried between calls.

use serde_json::{Map, Value};
use tera::{Context, Tera};

use crate::config::TemplateOptions;
use crate::error::BuildError;

/// Long-lived Tera instance plus the options namespace forwarded to it.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(options: &TemplateOptions) -> Self {
        let mut tera = Tera::default();
        // render_str registers its input under "__tera_one_off"; autoescape
        // is keyed on template name suffixes, so opt that name in or out.
        if options.autoescape {
            tera.autoescape_on(vec!["__tera_one_off"]);
        } else {
            tera.autoescape_on(vec![]);
        }
        Self { tera }
    }

    /// Render template source text against the data mapping.
    ///
    /// Absent data renders with an empty context, so templates that never
    /// reference a variable still work without a data file payload.
    pub fn render(
        &mut self,
        source: &str,
        data: Option<&Map<String, Value>>,
    ) -> Result<String, BuildError> {
        let context = match data {
            Some(map) => Context::from_value(Value::Object(map.clone()))?,
            None => Context::new(),
        };
        Ok(self.tera.render_str(source, &context)?)
    }
}
