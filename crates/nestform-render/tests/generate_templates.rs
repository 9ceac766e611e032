use nestform_engine::{FormSpec, FormsetOptions};
use nestform_render::{HtmlRenderer, TemplateGenConfig, TemplateRenderer, generate_templates};
use nestform_types::Schema;
use std::fs;
use tempfile::TempDir;

fn specs(roots: &[&str]) -> Vec<FormSpec> {
    let schema = Schema::demo();
    roots
        .iter()
        .map(|root| FormSpec::from_schema(&schema, root, FormsetOptions::default()).unwrap())
        .collect()
}

#[test]
fn test_one_file_per_child_form_type() {
    let temp = TempDir::new().unwrap();
    let config = TemplateGenConfig::new(temp.path().join("templates"));
    let renderer = TemplateRenderer::new(HtmlRenderer);

    // Overlapping trees must not produce duplicates
    let written = generate_templates(&specs(&["Block", "Building", "Tenant"]), &renderer, &config)
        .unwrap();

    let names: Vec<_> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["BuildingForm.form", "TenantForm.form", "FurnitureForm.form"]
    );

    let furniture = fs::read_to_string(config.path_for("FurnitureForm")).unwrap();
    assert!(furniture.contains(r#"name="{prefix}-{index}-quantity""#));
    assert!(furniture.contains(r#"id="id_{prefix}-{index}-name""#));
    assert!(!furniture.contains("nested-formset"));
}

#[test]
fn test_custom_extension() {
    let temp = TempDir::new().unwrap();
    let config = TemplateGenConfig::new(temp.path()).with_extension("html");
    let renderer = TemplateRenderer::new(HtmlRenderer);

    let written = generate_templates(&specs(&["Tenant"]), &renderer, &config).unwrap();
    assert_eq!(written, vec![temp.path().join("FurnitureForm.html")]);
}

#[test]
fn test_leaf_only_spec_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let config = TemplateGenConfig::new(temp.path());
    let renderer = TemplateRenderer::new(HtmlRenderer);

    let written = generate_templates(&specs(&["Furniture"]), &renderer, &config).unwrap();
    assert!(written.is_empty());
}
