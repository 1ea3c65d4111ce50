//! Demo users API served over HTTP.
//!
//! ```text
//! GET    /_info        introspection tree
//! GET    /users        list users, optional ?name= filter
//! POST   /users        create a user
//! GET    /users/{id}   fetch one user
//! DELETE /users/{id}   remove a user; x-user-id must name an admin
//! ```

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

use restful_api::config::{load_config, ApiConfig};
use restful_api::lifecycle::{shutdown_on_signal, Shutdown};
use restful_api::observability::{init_logging, init_metrics};
use restful_api::types::{date_value, Property};
use restful_api::{
    ApiOptions, ApiResult, ApiServer, Context, ConversionRegister, Declaration, HttpError,
    Request, Response, RestfulApi, TypeInfo,
};

#[derive(Parser)]
#[command(name = "restful-api")]
#[command(about = "Demo users API built on the restful-api routing engine", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct User {
    id: u64,
    name: String,
    email: String,
    admin: bool,
    created_at: Value,
}

#[derive(Debug, Deserialize)]
struct NewUser {
    name: String,
    email: String,
    #[serde(default)]
    admin: bool,
}

#[derive(Debug, Default)]
struct Users {
    next_id: u64,
    by_id: BTreeMap<u64, User>,
}

type Store = Arc<RwLock<Users>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ApiConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability.log_level);
    tracing::info!("restful-api v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        mount_path = %config.api.mount_path,
        strict_registry = config.registry.strict,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(err) = init_metrics(addr) {
                    tracing::error!(error = %err, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let register = Arc::new(if config.registry.strict {
        ConversionRegister::strict()
    } else {
        ConversionRegister::new()
    });
    let store = Store::default();
    let api = RestfulApi::with_register(
        users_api(store)?,
        ApiOptions::from(&config.api),
        register,
    )?;
    tracing::info!(
        identifiers = ?api.register().identifiers(),
        "Declared types registered"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = ApiServer::from_config(api, &config);

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));
    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn users_api(store: Store) -> Result<Context, regex::Error> {
    let mut root = Context::new();
    root.describe("Demo users API").set_field("version", env!("CARGO_PKG_VERSION"));

    let users = root.path("/users");
    users.describe("User management");

    {
        let store = store.clone();
        let one = users.path_regex(r"/(?P<id>\d+)")?;
        one.describe("A single user");
        let by_id = || Declaration::new().param("id", TypeInfo::string());
        let fetch = store.clone();
        one.get(move |req, res| get_user(fetch.clone(), req, res))
            .describe("Fetch one user")
            .declare(by_id());
        one.delete(move |req, res| delete_user(store.clone(), req, res))
            .describe("Remove a user")
            .declare(by_id());
    }

    let list = store.clone();
    users
        .get(move |req, res| list_users(list.clone(), req, res))
        .describe("List users")
        .declare(
            Declaration::new()
                .query("name", TypeInfo::or([TypeInfo::any_string(), TypeInfo::undefined()])),
        );

    users
        .post(move |req, res| create_user(store.clone(), req, res))
        .describe("Create a user")
        .declare(Declaration::new().body(TypeInfo::object([
            ("name", Property::required(TypeInfo::string())),
            ("email", Property::required(TypeInfo::string())),
            ("admin", Property::optional(TypeInfo::boolean())),
        ])));

    Ok(root)
}

async fn list_users(store: Store, req: Request, mut res: Response) -> ApiResult<Response> {
    let users = store.read().await;
    let filter = req.query.get("name");
    let listed: Vec<&User> = users
        .by_id
        .values()
        .filter(|user| filter.map_or(true, |name| user.name.contains(name.as_str())))
        .collect();
    res.json(json!({ "users": listed }))?;
    Ok(res)
}

async fn create_user(store: Store, req: Request, mut res: Response) -> ApiResult<Response> {
    let input: NewUser = serde_json::from_value(req.body)
        .map_err(|err| HttpError::bad_request(format!("body: {}", err)))?;

    let mut users = store.write().await;
    if users.by_id.values().any(|user| user.email == input.email) {
        return Err(HttpError::conflict("Email already registered").into());
    }

    users.next_id += 1;
    let id = users.next_id;
    users.by_id.insert(
        id,
        User {
            id,
            name: input.name,
            email: input.email,
            admin: input.admin,
            created_at: date_value(&Utc::now()),
        },
    );
    tracing::info!(user_id = id, "User created");

    res.status(201)?
        .header("location", format!("/users/{}", id))?
        .json(json!({ "message": "User created" }))?;
    Ok(res)
}

async fn get_user(store: Store, req: Request, mut res: Response) -> ApiResult<Response> {
    let id = user_id(&req)?;
    let users = store.read().await;
    let user = users
        .by_id
        .get(&id)
        .ok_or_else(|| HttpError::not_found(format!("No user with id {}", id)))?;
    res.json(user)?;
    Ok(res)
}

async fn delete_user(store: Store, req: Request, mut res: Response) -> ApiResult<Response> {
    let id = user_id(&req)?;
    let mut users = store.write().await;
    require_admin(&users, &req)?;
    if users.by_id.remove(&id).is_none() {
        return Err(HttpError::not_found(format!("No user with id {}", id)).into());
    }
    res.status(204)?;
    Ok(res)
}

fn require_admin(users: &Users, req: &Request) -> Result<(), HttpError> {
    let caller = req
        .header("x-user-id")
        .and_then(|id| id.parse::<u64>().ok())
        .and_then(|id| users.by_id.get(&id))
        .ok_or_else(|| HttpError::unauthorized("x-user-id must name a known user"))?;
    if !caller.admin {
        return Err(HttpError::forbidden("Only admins may remove users"));
    }
    Ok(())
}

fn user_id(req: &Request) -> Result<u64, HttpError> {
    req.params
        .get("id")
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| HttpError::bad_request("params.id: Not a user id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64, admin: bool) -> User {
        User {
            id,
            name: format!("user{}", id),
            email: format!("user{}@example.com", id),
            admin,
            created_at: date_value(&Utc::now()),
        }
    }

    #[test]
    fn test_require_admin() {
        let mut users = Users::default();
        users.by_id.insert(1, user(1, true));
        users.by_id.insert(2, user(2, false));

        let as_caller = |id: &str| Request::new("DELETE", "/users/2").with_header("x-user-id", id);
        assert!(require_admin(&users, &as_caller("1")).is_ok());
        assert_eq!(require_admin(&users, &as_caller("2")).unwrap_err().status, 403);
        assert_eq!(require_admin(&users, &as_caller("9")).unwrap_err().status, 401);
        assert_eq!(
            require_admin(&users, &Request::new("DELETE", "/users/2")).unwrap_err().status,
            401
        );
    }

    #[tokio::test]
    async fn test_delete_needs_admin() {
        let store = Store::default();
        store.write().await.by_id.insert(1, user(1, true));
        store.write().await.by_id.insert(2, user(2, false));
        let api = RestfulApi::new(users_api(store.clone()).unwrap());

        let denied = Request::new("DELETE", "/users/1").with_header("x-user-id", "2");
        let handling = api.handle(denied, Response::new()).await;
        assert_eq!(handling.response.status_code(), 403);

        let allowed = Request::new("DELETE", "/users/2").with_header("x-user-id", "1");
        let handling = api.handle(allowed, Response::new()).await;
        assert_eq!(handling.response.status_code(), 204);
        assert!(!store.read().await.by_id.contains_key(&2));
    }
}
