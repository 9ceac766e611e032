use nestform_engine::PostedData;
use nestform_runtime::{Config, Request, Response, Router, SubmitOutcome, Workspace};
use tempfile::TempDir;

fn workspace() -> Workspace {
    Workspace::in_memory(Config::default()).expect("in-memory workspace")
}

fn form(body: &str) -> PostedData {
    PostedData::from_urlencoded(body)
}

fn redirect_location(response: Response) -> String {
    match response {
        Response::Redirect { location } => location,
        other => panic!("expected redirect, got {other:?}"),
    }
}

#[test]
fn test_create_then_edit_page_shows_saved_rows() {
    let ws = workspace();
    let router = Router::new(&ws);

    let response = router.handle(&Request::post(
        "/new/block/",
        form("name=Block+A&buildings-TOTAL_FORMS=1&buildings-0-name=B1&buildings-0-street_name=Main+St"),
    ));
    let location = redirect_location(response);
    assert!(location.starts_with("/edit/block/"));

    let page = router.handle(&Request::get(location.clone()));
    let Response::Page { status, body } = page else {
        panic!("expected page");
    };
    assert_eq!(status, 200);
    assert!(body.contains(r#"value="Block A""#));
    assert!(body.contains(r#"name="buildings-0-street_name" id="id_buildings-0-street_name" value="Main St""#));
    assert!(body.contains(&format!(r#"action="{}""#, location)));
}

#[test]
fn test_invalid_submission_rerenders_with_errors() {
    let ws = workspace();
    let router = Router::new(&ws);

    let response = router.handle(&Request::post(
        "/new/block/",
        form("name=&buildings-TOTAL_FORMS=1&buildings-0-street_name=Main+St"),
    ));
    let Response::Page { status, body } = response else {
        panic!("expected page");
    };
    assert_eq!(status, 200);
    assert_eq!(body.matches("This field is required.").count(), 2);
    assert!(body.contains(r#"value="Main St""#));
    assert!(ws.list("block").unwrap().is_empty());
}

#[test]
fn test_list_and_delete() {
    let ws = workspace();
    let router = Router::new(&ws);

    let outcome = ws
        .submit(
            "block",
            None,
            &form("name=A&buildings-TOTAL_FORMS=1&buildings-0-name=B1"),
        )
        .unwrap();
    let SubmitOutcome::Saved { instance, .. } = outcome else {
        panic!("expected saved");
    };
    let id = instance.id.unwrap();

    let Response::Page { body, .. } = router.handle(&Request::get("/block/")) else {
        panic!("expected page");
    };
    assert!(body.contains(&format!(r#"href="/edit/block/{}/""#, id)));

    let location = redirect_location(
        router.handle(&Request::post(format!("/delete/block/{}/", id), PostedData::new())),
    );
    assert_eq!(location, "/block/");
    assert!(ws.list("block").unwrap().is_empty());
    assert!(ws.list("building").unwrap().is_empty());

    let again = router.handle(&Request::post(format!("/delete/block/{}/", id), PostedData::new()));
    assert_eq!(again, Response::NotFound);
}

#[test]
fn test_unknown_paths_and_models_are_not_found() {
    let ws = workspace();
    let router = Router::new(&ws);

    assert_eq!(router.handle(&Request::get("/garage/")), Response::NotFound);
    assert_eq!(router.handle(&Request::get("/edit/block/42/")), Response::NotFound);
    assert_eq!(router.handle(&Request::get("/nowhere")), Response::NotFound);
    assert_eq!(router.handle(&Request::get("/delete/block/1/")), Response::NotFound);

    let Response::Page { body, .. } = router.handle(&Request::get("/")) else {
        panic!("expected index");
    };
    assert!(body.contains(r#"<a href="/furniture/">Furniture</a>"#));
}

#[test]
fn test_tampered_counter_is_a_server_error() {
    let ws = workspace();
    let router = Router::new(&ws);

    let response = router.handle(&Request::post(
        "/new/block/",
        form("name=A&buildings-TOTAL_FORMS=lots"),
    ));
    assert_eq!(response.status(), 500);
}

#[test]
fn test_init_open_and_generate_templates() {
    let temp = TempDir::new().unwrap();
    let data_dir = temp.path().join("data");

    assert!(Workspace::open(&data_dir).is_err());

    let report = Workspace::init(&data_dir).unwrap();
    assert!(report.created_config);
    assert!(report.database_path.exists());
    assert!(!Workspace::init(&data_dir).unwrap().created_config);

    let ws = Workspace::open(&data_dir).unwrap();
    let written = ws.generate_templates(None).unwrap();
    assert_eq!(written.len(), 3);
    assert!(written.iter().all(|p| p.starts_with(data_dir.join("templates"))));
}
