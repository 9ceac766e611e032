use nestform_engine::form::{INVALID_CHOICE, INVALID_INTEGER, REQUIRED};
use nestform_engine::{
    Error, FormSpec, FormsetOptions, NestedFormNode, PostedData, PreconditionError, ReportedError,
};
use nestform_index::Database;
use nestform_types::{Instance, Schema, Store};

fn block_spec() -> FormSpec {
    FormSpec::from_schema(&Schema::demo(), "Block", FormsetOptions::default())
        .expect("demo schema has a Block model")
}

fn posted(pairs: &[(&str, &str)]) -> PostedData {
    PostedData::from_pairs(pairs.iter().copied())
}

fn bind(spec: &FormSpec, data: &PostedData, store: &dyn Store) -> NestedFormNode {
    NestedFormNode::bind(spec, Instance::new(&spec.model), data, "", store).expect("bind")
}

#[test]
fn test_invalid_leaf_invalidates_every_ancestor_without_bleed() {
    let db = Database::open_in_memory().unwrap();
    let spec = block_spec();
    let data = posted(&[
        ("name", "A"),
        ("buildings-TOTAL_FORMS", "2"),
        ("buildings-0-name", "B1"),
        ("buildings-0-tenants-TOTAL_FORMS", "1"),
        ("buildings-0-tenants-0-first_name", "Ada"),
        ("buildings-0-tenants-0-last_name", "Lovelace"),
        ("buildings-0-tenants-0-furniture-TOTAL_FORMS", "2"),
        ("buildings-0-tenants-0-furniture-0-name", "Desk"),
        ("buildings-0-tenants-0-furniture-0-quantity", "lots"),
        ("buildings-0-tenants-0-furniture-1-name", "Chair"),
        ("buildings-1-name", "B2"),
    ]);
    let mut root = bind(&spec, &data, &db);

    assert!(!root.is_valid());
    assert_eq!(
        root.reported_errors(),
        vec![ReportedError {
            name: "buildings-0-tenants-0-furniture-0-quantity".to_string(),
            message: INVALID_INTEGER.to_string(),
        }]
    );

    let buildings = root.children().unwrap();
    assert!(buildings.rows()[1].form().errors().is_empty());

    let tenant = &buildings.rows()[0].children().unwrap().rows()[0];
    assert!(tenant.form().errors().is_empty());
    let furniture = tenant.children().unwrap();
    assert!(!furniture.rows()[0].form().errors().is_empty());
    assert!(furniture.rows()[1].form().errors().is_empty());

    assert_eq!(db.count("Block").unwrap(), 0);
}

#[test]
fn test_every_invalid_row_is_reported() {
    let db = Database::open_in_memory().unwrap();
    let spec = block_spec();
    let data = posted(&[
        ("name", ""),
        ("buildings-TOTAL_FORMS", "3"),
        ("buildings-0-name", ""),
        ("buildings-0-street_name", "Main St"),
        ("buildings-1-name", "B2"),
        ("buildings-2-street_name", "Side St"),
    ]);
    let mut root = bind(&spec, &data, &db);

    assert!(!root.is_valid());
    let names: Vec<_> = root
        .reported_errors()
        .into_iter()
        .map(|e| (e.name, e.message))
        .collect();
    assert_eq!(
        names,
        vec![
            ("name".to_string(), REQUIRED.to_string()),
            ("buildings-0-name".to_string(), REQUIRED.to_string()),
            ("buildings-2-name".to_string(), REQUIRED.to_string()),
        ]
    );

    let err = root.save(&db, true, true).unwrap_err();
    assert!(matches!(
        err,
        Error::Precondition(PreconditionError::SaveInvalid { .. })
    ));
}

#[test]
fn test_stale_total_is_extended_to_posted_rows() {
    let db = Database::open_in_memory().unwrap();
    let spec = block_spec();
    let data = posted(&[
        ("name", "A"),
        ("buildings-TOTAL_FORMS", "1"),
        ("buildings-INITIAL_FORMS", "0"),
        ("buildings-0-name", "B1"),
        ("buildings-1-name", "B2"),
    ]);
    let mut root = bind(&spec, &data, &db);

    let diagnostics = root.diagnostics();
    assert_eq!(diagnostics.mismatch_count(), 1);
    let mismatch = &diagnostics.reconciliation_mismatches[0];
    assert_eq!(mismatch.prefix, "buildings");
    assert_eq!(mismatch.posted_total, 1);
    assert_eq!(mismatch.corrected_total, 2);

    assert!(root.is_valid());
    root.save(&db, true, true).unwrap();
    assert_eq!(db.count("Building").unwrap(), 2);
}

#[test]
fn test_unknown_row_id_is_a_field_error() {
    let db = Database::open_in_memory().unwrap();
    let spec = block_spec();
    let data = posted(&[
        ("name", "A"),
        ("buildings-TOTAL_FORMS", "1"),
        ("buildings-0-id", "999"),
        ("buildings-0-name", "B1"),
    ]);
    let mut root = bind(&spec, &data, &db);

    assert!(!root.is_valid());
    assert_eq!(
        root.reported_errors(),
        vec![ReportedError {
            name: "buildings-0-id".to_string(),
            message: INVALID_CHOICE.to_string(),
        }]
    );
}

#[test]
fn test_row_id_of_another_parent_is_rejected() {
    let db = Database::open_in_memory().unwrap();
    let spec = block_spec();

    let first = posted(&[
        ("name", "A"),
        ("buildings-TOTAL_FORMS", "1"),
        ("buildings-0-name", "B1"),
    ]);
    let mut root = bind(&spec, &first, &db);
    assert!(root.is_valid());
    root.save(&db, true, true).unwrap();
    let building = db.list(&Schema::demo().get("Building").unwrap()).unwrap();
    let foreign_id = building[0].id.unwrap().to_string();

    let second = posted(&[
        ("name", "Other"),
        ("buildings-TOTAL_FORMS", "1"),
        ("buildings-0-id", foreign_id.as_str()),
        ("buildings-0-name", "stolen"),
    ]);
    let mut other = bind(&spec, &second, &db);
    assert!(!other.is_valid());
    assert_eq!(db.count("Block").unwrap(), 1);
}

#[test]
fn test_deleting_row_of_another_parent_is_ignored() {
    let db = Database::open_in_memory().unwrap();
    let spec = block_spec();

    let first = posted(&[
        ("name", "A"),
        ("buildings-TOTAL_FORMS", "1"),
        ("buildings-0-name", "B1"),
    ]);
    let mut root = bind(&spec, &first, &db);
    assert!(root.is_valid());
    root.save(&db, true, true).unwrap();
    let building = db.list(&Schema::demo().get("Building").unwrap()).unwrap();
    let foreign_id = building[0].id.unwrap().to_string();

    let second = posted(&[
        ("name", "Other"),
        ("buildings-TOTAL_FORMS", "2"),
        ("buildings-0-id", foreign_id.as_str()),
        ("buildings-0-name", "B1"),
        ("buildings-0-DELETE", "on"),
        ("buildings-1-id", "999"),
        ("buildings-1-DELETE", "on"),
    ]);
    let mut other = bind(&spec, &second, &db);
    assert!(other.is_valid());
    assert!(other.reported_errors().is_empty());
    other.save(&db, true, true).unwrap();

    assert_eq!(db.count("Block").unwrap(), 2);
    assert_eq!(db.count("Building").unwrap(), 1);
}

#[test]
fn test_tampered_counter_is_rejected() {
    let db = Database::open_in_memory().unwrap();
    let spec = block_spec();
    let data = posted(&[("name", "A"), ("buildings-TOTAL_FORMS", "two")]);

    let err = NestedFormNode::bind(&spec, Instance::new(&spec.model), &data, "", &db).unwrap_err();
    assert!(matches!(
        err,
        Error::Precondition(PreconditionError::MalformedCounter { .. })
    ));
}

#[test]
fn test_validate_max_reports_formset_error() {
    let db = Database::open_in_memory().unwrap();
    let options = FormsetOptions {
        max_num: 1,
        validate_max: true,
        ..FormsetOptions::default()
    };
    let spec = FormSpec::from_schema(&Schema::demo(), "Block", options).unwrap();
    let data = posted(&[
        ("name", "A"),
        ("buildings-TOTAL_FORMS", "2"),
        ("buildings-0-name", "B1"),
        ("buildings-1-name", "B2"),
    ]);
    let mut root = bind(&spec, &data, &db);

    assert!(!root.is_valid());
    assert_eq!(
        root.reported_errors(),
        vec![ReportedError {
            name: "buildings".to_string(),
            message: "Please submit 1 or fewer forms.".to_string(),
        }]
    );
}

#[test]
fn test_removing_row_after_bind() {
    let db = Database::open_in_memory().unwrap();
    let spec = block_spec();
    let data = posted(&[
        ("name", "A"),
        ("buildings-TOTAL_FORMS", "2"),
        ("buildings-0-name", "B1"),
        ("buildings-1-name", ""),
        ("buildings-1-street_name", "typo"),
    ]);
    let mut root = bind(&spec, &data, &db);
    assert!(!root.is_valid());

    root.children_mut().unwrap().remove_row(1).unwrap();
    assert!(root.is_valid());
    root.save(&db, true, true).unwrap();
    assert_eq!(db.count("Building").unwrap(), 1);
    assert_eq!(root.children().unwrap().total_count(), 1);
}
