use nestform_testing::assertions::{assert_error_names, assert_record_count, saved_id};
use nestform_testing::{TestWorld, fixtures};

#[test]
fn test_submit_full_tree_then_list_every_level() {
    let world = TestWorld::new().initialized();

    let (result, json) = world
        .run_json(&["submit", "block", "--form", fixtures::FULL_TREE])
        .unwrap();
    assert!(result.success(), "submit failed: {}", result.stderr());
    saved_id(&json).unwrap();

    for model in ["block", "building", "tenant", "furniture"] {
        let (result, json) = world.run_json(&["list", model]).unwrap();
        assert!(result.success(), "list {} failed: {}", model, result.stderr());
        assert_record_count(&json, 1).unwrap();
    }

    let (_, furniture) = world.run_json(&["list", "furniture"]).unwrap();
    assert_eq!(furniture[0]["fields"]["name"], "Desk");
}

#[test]
fn test_submit_json_body_from_file() {
    let world = TestWorld::new().initialized();
    let body = world
        .write_file("body.json", &fixtures::full_tree_json().to_string())
        .unwrap();

    let (result, json) = world
        .run_json(&["submit", "block", "--data", body.to_str().unwrap()])
        .unwrap();
    assert!(result.success(), "submit failed: {}", result.stderr());
    saved_id(&json).unwrap();

    let (_, tenants) = world.run_json(&["list", "tenant"]).unwrap();
    assert_eq!(tenants[0]["fields"]["last_name"], "Lee");
}

#[test]
fn test_invalid_submit_exits_nonzero_and_saves_nothing() {
    let world = TestWorld::new().initialized();

    let (result, json) = world
        .run_json(&["submit", "block", "--form", fixtures::MISSING_BUILDING_NAME])
        .unwrap();
    assert!(!result.success());
    assert_eq!(json["status"], "invalid");
    assert_error_names(&json, &["buildings-0-name"]).unwrap();
    assert!(result.stderr().contains("invalid"));

    let (_, blocks) = world.run_json(&["list", "block"]).unwrap();
    assert_record_count(&blocks, 0).unwrap();
}

#[test]
fn test_edit_deletes_child_row() {
    let world = TestWorld::new().initialized();
    let (_, json) = world
        .run_json(&["submit", "block", "--form", fixtures::FULL_TREE])
        .unwrap();
    let block_id = saved_id(&json).unwrap();

    let (_, buildings) = world.run_json(&["list", "building"]).unwrap();
    let building_id = buildings[0]["id"].as_i64().unwrap();

    let body = format!(
        "name=Block+A&buildings-TOTAL_FORMS=1&buildings-INITIAL_FORMS=1\
         &buildings-0-id={}&buildings-0-name=B1&buildings-0-DELETE=on",
        building_id
    );
    let block_id = block_id.to_string();
    let (result, _) = world
        .run_json(&["submit", "block", "--id", &block_id, "--form", &body])
        .unwrap();
    assert!(result.success(), "edit failed: {}", result.stderr());

    for model in ["building", "tenant", "furniture"] {
        let (_, json) = world.run_json(&["list", model]).unwrap();
        assert_record_count(&json, 0).unwrap();
    }
    let (_, blocks) = world.run_json(&["list", "block"]).unwrap();
    assert_record_count(&blocks, 1).unwrap();
}

#[test]
fn test_submit_without_init_fails() {
    let world = TestWorld::new();

    let result = world
        .run(&["submit", "block", "--form", fixtures::FULL_TREE])
        .unwrap();
    assert!(!result.success());
    assert!(result.stderr().contains("nestform init"));
}
