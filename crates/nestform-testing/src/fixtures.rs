//! Posted bodies for the demo schema.

/// A new block with one building holding one tenant with one furniture row.
pub const FULL_TREE: &str = "name=Block+A\
&buildings-TOTAL_FORMS=1&buildings-INITIAL_FORMS=0\
&buildings-0-name=B1&buildings-0-street_name=Main+St\
&buildings-0-tenants-TOTAL_FORMS=1&buildings-0-tenants-INITIAL_FORMS=0\
&buildings-0-tenants-0-first_name=Ann&buildings-0-tenants-0-last_name=Lee\
&buildings-0-tenants-0-furniture-TOTAL_FORMS=1&buildings-0-tenants-0-furniture-INITIAL_FORMS=0\
&buildings-0-tenants-0-furniture-0-name=Desk&buildings-0-tenants-0-furniture-0-quantity=2";

/// A block whose only building is missing its required name.
pub const MISSING_BUILDING_NAME: &str =
    "name=Block+B&buildings-TOTAL_FORMS=1&buildings-0-street_name=Side+St";

/// The same tree as [`FULL_TREE`] as a JSON object body.
pub fn full_tree_json() -> serde_json::Value {
    serde_json::json!({
        "name": "Block A",
        "buildings-TOTAL_FORMS": "1",
        "buildings-INITIAL_FORMS": "0",
        "buildings-0-name": "B1",
        "buildings-0-street_name": "Main St",
        "buildings-0-tenants-TOTAL_FORMS": "1",
        "buildings-0-tenants-INITIAL_FORMS": "0",
        "buildings-0-tenants-0-first_name": "Ann",
        "buildings-0-tenants-0-last_name": "Lee",
        "buildings-0-tenants-0-furniture-TOTAL_FORMS": "1",
        "buildings-0-tenants-0-furniture-INITIAL_FORMS": "0",
        "buildings-0-tenants-0-furniture-0-name": "Desk",
        "buildings-0-tenants-0-furniture-0-quantity": 2
    })
}
