use nestform_engine::BoundField;
use nestform_engine::posted::is_truthy;

/// Turns bound fields into markup.
///
/// The tree renderer only decides structure (rows, containers, management
/// block); every element that carries a name goes through this trait.
pub trait MarkupRenderer {
    /// A labelled input plus its inline errors.
    fn field(&self, field: &BoundField) -> String;

    fn hidden(&self, name: &str, html_id: &str, value: &str) -> String;

    fn checkbox(&self, name: &str, html_id: &str, label: &str, checked: bool) -> String;

    /// Errors that belong to a row or formset rather than a field.
    fn error_list(&self, messages: &[String]) -> String;

    fn fields(&self, fields: &[BoundField]) -> String {
        fields.iter().map(|f| self.field(f)).collect()
    }
}

/// Plain HTML5 inputs with `errorlist` markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl MarkupRenderer for HtmlRenderer {
    fn field(&self, field: &BoundField) -> String {
        let mut out = format!(r#"<div class="field" id="div_{}">"#, escape(&field.html_id));

        if field.input_type == "checkbox" {
            let checked = field.value.as_deref().is_some_and(is_truthy);
            out.push_str(&self.checkbox(&field.name, &field.html_id, &field.label, checked));
        } else {
            out.push_str(&format!(
                r#"<label for="{}">{}{}</label>"#,
                escape(&field.html_id),
                escape(&field.label),
                if field.required { "*" } else { "" }
            ));
            out.push_str(&format!(
                r#"<input type="{}" name="{}" id="{}" value="{}"{}>"#,
                field.input_type,
                escape(&field.name),
                escape(&field.html_id),
                escape(field.value.as_deref().unwrap_or("")),
                if field.required { " required" } else { "" }
            ));
        }

        out.push_str(&self.error_list(&field.errors));
        out.push_str("</div>");
        out
    }

    fn hidden(&self, name: &str, html_id: &str, value: &str) -> String {
        format!(
            r#"<input type="hidden" name="{}" id="{}" value="{}">"#,
            escape(name),
            escape(html_id),
            escape(value)
        )
    }

    fn checkbox(&self, name: &str, html_id: &str, label: &str, checked: bool) -> String {
        format!(
            r#"<label for="{id}"><input type="checkbox" name="{name}" id="{id}"{checked}> {label}</label>"#,
            id = escape(html_id),
            name = escape(name),
            checked = if checked { " checked" } else { "" },
            label = escape(label)
        )
    }

    fn error_list(&self, messages: &[String]) -> String {
        if messages.is_empty() {
            return String::new();
        }
        let items: String = messages
            .iter()
            .map(|m| format!("<li>{}</li>", escape(m)))
            .collect();
        format!(r#"<ul class="errorlist">{}</ul>"#, items)
    }
}

/// Escapes text for element content and double-quoted attributes.
///
/// Braces are left alone so substitution tokens survive into row templates.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
