use crate::error::{FormError, Result};
use handlebars::Handlebars;
use serde_json::json;

const FORM_TEMPLATE: &str = "form";

/// The data-entry page
pub struct FormPage {
    registry: Handlebars<'static>,
}

impl FormPage {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry
            .register_template_string(FORM_TEMPLATE, include_str!("./static/form.html"))
            .map_err(|e| FormError::Config(format!("form template: {}", e)))?;
        Ok(FormPage { registry })
    }

    /// Render the page with `options` filling the country dropdown.
    pub fn render(&self, title: &str, options: &[String]) -> Result<String> {
        self.registry
            .render(
                FORM_TEMPLATE,
                &json!({ "title": title, "countries": options }),
            )
            .map_err(|e| FormError::Config(format!("rendering form: {}", e)))
    }
}
