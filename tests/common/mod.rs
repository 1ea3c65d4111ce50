//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use restful_api::types::Property;
use restful_api::{
    ApiOptions, ApiResult, ApiServer, Context, Declaration, HttpError, Request, Response,
    RestfulApi, Shutdown, TypeInfo,
};
use serde_json::json;
use tokio::net::TcpListener;

async fn create_user(_req: Request, mut res: Response) -> ApiResult<Response> {
    res.status(201)?.json(json!({ "message": "User created" }))?;
    Ok(res)
}

async fn get_user(req: Request, mut res: Response) -> ApiResult<Response> {
    let id = req.params.get("id").cloned().unwrap_or_default();
    if id == "0" {
        return Err(HttpError::not_found("No user with id 0").into());
    }
    res.json(json!({ "id": id, "rest": req.path }))?;
    Ok(res)
}

async fn echo(req: Request, mut res: Response) -> ApiResult<Response> {
    res.json(json!({
        "method": req.method,
        "path": req.path,
        "full_path": req.full_path,
        "full_api_path": req.full_api_path,
        "query": req.query,
        "body": req.body,
        "request_id": req.header("x-request-id"),
    }))?;
    Ok(res)
}

/// root → /users → {POST create, /(?P<id>\d+) → GET}, plus /echo for any method.
pub fn users_tree() -> Context {
    let mut root = Context::new();
    root.describe("Users test API");

    let users = root.path("/users");
    if let Ok(one) = users.path_regex(r"/(?P<id>\d+)") {
        one.get(get_user)
            .declare(Declaration::new().param("id", TypeInfo::string()));
    }
    users.post(create_user).declare(Declaration::new().body(TypeInfo::object([(
        "name",
        Property::required(TypeInfo::string()),
    )])));

    root.path("/echo").any(echo);
    root
}

pub fn users_api() -> RestfulApi {
    RestfulApi::with_options(
        users_tree(),
        ApiOptions {
            info_path: Some("/_info".to_string()),
            ..ApiOptions::default()
        },
    )
}

/// Serve `server` on an ephemeral port.
pub async fn spawn_server(server: ApiServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, &server_shutdown).await;
    });
    (addr, shutdown)
}
