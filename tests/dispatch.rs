//! End-to-end dispatch through the root API, without a transport.

use restful_api::routing::{path_and_method, Outcome};
use restful_api::{ApiResult, Context, Request, Response, RestfulApi};
use serde_json::json;

mod common;

async fn created(_req: Request, mut res: Response) -> ApiResult<Response> {
    res.status(201)?.json(json!({ "message": "User created" }))?;
    Ok(res)
}

fn chained_users() -> RestfulApi {
    let mut root = Context::new();
    root.add_child(path_and_method("/users", "POST"), Context::new())
        .set_action(created);
    RestfulApi::new(root)
}

#[tokio::test]
async fn test_post_users_creates() {
    let api = chained_users();
    let req = Request::new("POST", "/users").with_body(json!({ "name": "ada" }));
    let handling = api.handle(req, Response::new()).await;

    assert_eq!(handling.outcome, Outcome::Handled);
    assert_eq!(handling.response.status_code(), 201);
    assert_eq!(
        handling.response.json_body(),
        Some(&json!({ "message": "User created" }))
    );
}

#[tokio::test]
async fn test_get_users_is_structured_404() {
    let api = chained_users();
    let handling = api.handle(Request::new("GET", "/users"), Response::new()).await;

    assert_eq!(handling.outcome, Outcome::NotFound);
    assert_eq!(handling.response.status_code(), 404);
    let body = handling.response.json_body().unwrap();
    assert_eq!(body["path"], json!("/users"));
    assert_eq!(body["method"], json!("GET"));
}

#[tokio::test]
async fn test_regex_params_reach_action() {
    let api = common::users_api();
    let handling = api
        .handle(Request::new("GET", "/users/42/extra"), Response::new())
        .await;

    assert_eq!(handling.response.status_code(), 200);
    assert_eq!(
        handling.response.json_body(),
        Some(&json!({ "id": "42", "rest": "/extra" }))
    );
}

#[tokio::test]
async fn test_declared_http_error() {
    let api = common::users_api();
    let handling = api.handle(Request::new("GET", "/users/0"), Response::new()).await;

    assert_eq!(handling.outcome, Outcome::Failed);
    assert_eq!(handling.response.status_code(), 404);
    assert_eq!(
        handling.response.json_body(),
        Some(&json!({ "message": "No user with id 0" }))
    );
}

#[tokio::test]
async fn test_invalid_body_is_400() {
    let api = common::users_api();
    let req = Request::new("POST", "/users").with_body(json!({ "name": 7 }));
    let handling = api.handle(req, Response::new()).await;

    assert_eq!(handling.response.status_code(), 400);
    assert_eq!(
        handling.response.json_body(),
        Some(&json!({ "message": "body: name: Not a string, but a number" }))
    );
}

#[tokio::test]
async fn test_concurrent_dispatch_over_shared_tree() {
    let api = std::sync::Arc::new(common::users_api());
    let mut tasks = Vec::new();
    for i in 1..=16 {
        let api = api.clone();
        tasks.push(tokio::spawn(async move {
            let req = Request::new("GET", format!("/users/{}", i));
            let handling = api.handle(req, Response::new()).await;
            handling.response.json_body().cloned()
        }));
    }
    for (i, task) in tasks.into_iter().enumerate() {
        let body = task.await.unwrap().unwrap();
        assert_eq!(body["id"], json!((i + 1).to_string()));
    }
}

#[test]
fn test_info_tree_shape() {
    let info = common::users_api().info();
    let paths: Vec<_> = info.walk().iter().map(|node| node.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            "",
            "/users",
            r"/users/(?P<id>\d+)",
            r"/users/(?P<id>\d+)",
            "/users",
            "/echo",
            "/echo",
        ]
    );
}
