use nestform_engine::naming::{self, DELETION_FIELD, ID_FIELD};
use nestform_engine::{
    ChildSpec, FieldForm, FormSpec, FormsetController, ManagementCounters, NestedFormNode,
};

use crate::descriptor::ClientDescriptor;
use crate::html::{HtmlRenderer, MarkupRenderer, escape};
use crate::Result;

/// Element id of the embedded client descriptor
pub const DESCRIPTOR_ELEMENT_ID: &str = "nested-form-descriptor";

/// A reusable row template for one child form type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowTemplate {
    pub form_name: String,
    pub element_id: String,
    pub markup: String,
}

/// Renders a form tree: each node's fields, a container per child formset
/// with its management block, every existing row recursively, one row
/// template per distinct child type and the client descriptor.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer<R = HtmlRenderer> {
    markup: R,
}

impl<R: MarkupRenderer> TemplateRenderer<R> {
    pub fn new(markup: R) -> Self {
        Self { markup }
    }

    /// A complete `<form>` element for the tree rooted at `node`.
    pub fn render_page(&self, node: &NestedFormNode, action: &str) -> Result<String> {
        let mut out = format!(
            r#"<form method="post" action="{}" class="nested-form" data-form="{}">"#,
            escape(action),
            escape(node.form_name())
        );
        out.push_str(&self.render_node(node));

        for template in self.row_templates(node.spec()) {
            out.push_str(&format!(
                r#"<script type="text/html" id="{}">{}</script>"#,
                escape(&template.element_id),
                template.markup
            ));
        }

        let descriptor = ClientDescriptor::from_spec(node.spec());
        out.push_str(&format!(
            r#"<script type="application/json" id="{}">{}</script>"#,
            DESCRIPTOR_ELEMENT_ID,
            descriptor.to_script_json()?
        ));

        out.push_str(r#"<button type="submit">Save</button></form>"#);
        Ok(out)
    }

    /// The node's own fields followed by its children container.
    pub fn render_node(&self, node: &NestedFormNode) -> String {
        let form = node.form();
        let mut out = self.markup.error_list(&form.row_errors());
        out.push_str(&self.markup.fields(&form.bound_fields()));
        if let Some(formset) = node.children() {
            out.push_str(&self.render_formset(formset));
        }
        out
    }

    pub fn render_formset(&self, formset: &FormsetController) -> String {
        let child = formset.spec();
        let mut out = self.container_open(formset.prefix(), child);
        out.push_str(&self.management(formset.prefix(), &formset.management()));
        out.push_str(&self.markup.error_list(formset.non_form_errors()));

        for row in formset.rows() {
            out.push_str(&self.render_row(row, child));
        }

        out.push_str("</div>");
        out
    }

    fn render_row(&self, row: &NestedFormNode, child: &ChildSpec) -> String {
        let mut out = Self::row_open(row.prefix(), row.form_name());

        if let Some(id) = row.instance().id {
            out.push_str(&self.markup.hidden(
                &naming::field_name(row.prefix(), ID_FIELD),
                &naming::field_id(row.prefix(), ID_FIELD),
                &id.to_string(),
            ));
        }
        out.push_str(&self.render_node(row));
        if child.options.can_delete {
            out.push_str(&self.markup.checkbox(
                &naming::field_name(row.prefix(), DELETION_FIELD),
                &naming::field_id(row.prefix(), DELETION_FIELD),
                "Delete",
                row.is_deleted(),
            ));
        }

        out.push_str("</div>");
        out
    }

    /// One template per distinct child form type below `spec`, nearest first.
    pub fn row_templates(&self, spec: &FormSpec) -> Vec<RowTemplate> {
        let mut templates: Vec<RowTemplate> = Vec::new();
        for child in spec.descendants() {
            let form_name = child.form.form_name();
            if templates.iter().any(|t| t.form_name == form_name) {
                continue;
            }
            templates.push(RowTemplate {
                element_id: naming::template_id(&form_name),
                markup: self.row_template(child),
                form_name,
            });
        }
        templates
    }

    /// Markup of a blank row of `child`, named with substitution tokens.
    ///
    /// A nested child level is rendered as an empty container whose
    /// counters start at zero; its rows come from its own template.
    pub fn row_template(&self, child: &ChildSpec) -> String {
        let prefix = naming::template_row_prefix();
        let mut out = Self::row_open(&prefix, &child.form.form_name());

        out.push_str(&self.markup.fields(&FieldForm::template_fields(&child.form.model)));
        if child.options.can_delete {
            out.push_str(&self.markup.checkbox(
                &naming::field_name(&prefix, DELETION_FIELD),
                &naming::field_id(&prefix, DELETION_FIELD),
                "Delete",
                false,
            ));
        }

        if let Some(grandchild) = child.form.child.as_deref() {
            let nested = naming::join_prefix(&prefix, &grandchild.relation);
            out.push_str(&self.container_open(&nested, grandchild));
            out.push_str(&self.management(
                &nested,
                &ManagementCounters {
                    total_forms: 0,
                    initial_forms: 0,
                    min_num_forms: 0,
                    max_num_forms: grandchild.options.max_num,
                },
            ));
            out.push_str("</div>");
        }

        out.push_str("</div>");
        out
    }

    fn management(&self, prefix: &str, counters: &ManagementCounters) -> String {
        [
            (naming::TOTAL_FORMS, counters.total_forms),
            (naming::INITIAL_FORMS, counters.initial_forms),
            (naming::MIN_NUM_FORMS, counters.min_num_forms),
            (naming::MAX_NUM_FORMS, counters.max_num_forms),
        ]
        .iter()
        .map(|(counter, value)| {
            let name = naming::management_key(prefix, counter);
            self.markup
                .hidden(&name, &format!("id_{}", name), &value.to_string())
        })
        .collect()
    }

    fn container_open(&self, prefix: &str, child: &ChildSpec) -> String {
        format!(
            r#"<div class="nested-formset" id="{}" data-prefix="{}" data-child-form="{}" data-relation="{}">"#,
            escape(&naming::children_container(prefix)),
            escape(prefix),
            escape(&child.form.form_name()),
            escape(&child.relation)
        )
    }

    fn row_open(prefix: &str, form_name: &str) -> String {
        format!(
            r#"<div class="nested-row" data-prefix="{}" data-form="{}">"#,
            escape(prefix),
            escape(form_name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestform_engine::{FormsetOptions, PostedData};
    use nestform_index::Database;
    use nestform_types::{Instance, Schema, Store};

    fn spec(root: &str) -> FormSpec {
        FormSpec::from_schema(&Schema::demo(), root, FormsetOptions::default()).unwrap()
    }

    #[test]
    fn test_two_child_levels_emit_two_row_templates() {
        let renderer = TemplateRenderer::new(HtmlRenderer);
        let templates = renderer.row_templates(&spec("Building"));

        let ids: Vec<_> = templates.iter().map(|t| t.element_id.as_str()).collect();
        assert_eq!(ids, vec!["TenantForm-template", "FurnitureForm-template"]);

        for template in &templates {
            assert!(template.markup.contains("{prefix}-{index}-"));
            assert!(!template.markup.contains("-0-"));
        }
    }

    #[test]
    fn test_row_template_embeds_empty_nested_container() {
        let renderer = TemplateRenderer::new(HtmlRenderer);
        let building = spec("Block");
        let child = building.child.as_deref().unwrap();
        let markup = renderer.row_template(child);

        assert!(markup.contains(r#"id="{prefix}-{index}-tenants_children_div""#));
        assert!(markup.contains(r#"name="{prefix}-{index}-tenants-TOTAL_FORMS" id="id_{prefix}-{index}-tenants-TOTAL_FORMS" value="0""#));
        assert!(markup.contains(r#"name="{prefix}-{index}-DELETE""#));
    }

    #[test]
    fn test_page_renders_rows_management_and_descriptor() {
        let db = Database::open_in_memory().unwrap();
        let spec = spec("Block");
        let data = PostedData::from_pairs([
            ("name", "A"),
            ("buildings-TOTAL_FORMS", "1"),
            ("buildings-0-name", ""),
            ("buildings-0-street_name", "Main St"),
        ]);
        let mut root =
            NestedFormNode::bind(&spec, Instance::new(&spec.model), &data, "", &db).unwrap();
        assert!(!root.is_valid());

        let page = TemplateRenderer::new(HtmlRenderer)
            .render_page(&root, "/new/block/")
            .unwrap();

        assert!(page.contains(r#"id="buildings_children_div""#));
        assert!(page.contains(r#"name="buildings-TOTAL_FORMS" id="id_buildings-TOTAL_FORMS" value="1""#));
        assert!(page.contains(r#"name="buildings-0-street_name" id="id_buildings-0-street_name" value="Main St""#));
        assert!(page.contains("<li>This field is required.</li>"));
        assert!(page.contains(r#"<script type="text/html" id="BuildingForm-template">"#));
        assert!(page.contains(r#"<script type="text/html" id="FurnitureForm-template">"#));
        assert!(page.contains(r#""relationName":"buildings""#));
        assert_eq!(page.matches(r#"type="text/html""#).count(), 3);
    }

    #[test]
    fn test_persisted_rows_carry_hidden_id() {
        let db = Database::open_in_memory().unwrap();
        let spec = spec("Block");
        let data = PostedData::from_pairs([
            ("name", "A"),
            ("buildings-TOTAL_FORMS", "1"),
            ("buildings-0-name", "B1"),
        ]);
        let mut root =
            NestedFormNode::bind(&spec, Instance::new(&spec.model), &data, "", &db).unwrap();
        assert!(root.is_valid());
        let saved = root.save(&db, true, true).unwrap();

        let block = saved.instance().unwrap().clone();
        let building = &db.list_children(&spec.descendants()[0].form.model, block.id.unwrap()).unwrap()[0];

        let display = NestedFormNode::new(&spec, block, "", &db).unwrap();
        let html = TemplateRenderer::new(HtmlRenderer).render_node(&display);

        let hidden_id = format!(
            r#"type="hidden" name="buildings-0-id" id="id_buildings-0-id" value="{}""#,
            building.id.unwrap()
        );
        assert!(html.contains(&hidden_id));
        assert!(!html.contains(r#"name="buildings-1-id""#));
        assert!(html.contains(r#"name="buildings-INITIAL_FORMS" id="id_buildings-INITIAL_FORMS" value="1""#));
    }
}
