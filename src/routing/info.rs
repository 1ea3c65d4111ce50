//! Read-only introspection of a context tree.

use serde::Serialize;

use super::context::{Context, Field};
use super::declaration::Declaration;

/// One node of the introspection view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoNode {
    /// Path prefix accumulated from the root.
    pub path: String,
    /// Method required to reach this node, if any condition on the way named one.
    pub method: Option<String>,
    pub description: Vec<String>,
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration: Option<Declaration>,
    /// Whether dispatch can end here.
    pub action: bool,
    /// Children in registration order.
    pub map: Vec<InfoNode>,
}

impl Context {
    /// Project the tree below this context. Never runs an action.
    pub fn info(&self) -> InfoNode {
        self.info_at(String::new(), None)
    }

    fn info_at(&self, path: String, method: Option<String>) -> InfoNode {
        let map = self
            .children()
            .iter()
            .map(|child| {
                let condition = child.condition().describe();
                let child_path = match condition.path {
                    Some(segment) => format!("{}{}", path, segment),
                    None => path.clone(),
                };
                child
                    .context()
                    .info_at(child_path, condition.method.or_else(|| method.clone()))
            })
            .collect();

        InfoNode {
            path,
            method,
            description: self.descriptions().to_vec(),
            fields: self.fields().to_vec(),
            declaration: self.declaration().cloned(),
            action: self.has_action(),
            map,
        }
    }
}

impl InfoNode {
    /// Depth-first iterator over this node and its descendants.
    pub fn walk(&self) -> Vec<&InfoNode> {
        let mut nodes = vec![self];
        for child in &self.map {
            nodes.extend(child.walk());
        }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{ApiResult, Request, Response};
    use crate::types::TypeInfo;
    use serde_json::json;

    async fn ok(_req: Request, res: Response) -> ApiResult<Response> {
        Ok(res)
    }

    #[test]
    fn test_info_projection() {
        let mut root = Context::new();
        root.describe("Example API");
        let users = root.path("/users");
        users.describe("User management").set_field("auth", "token");
        users
            .post(ok)
            .describe("Create a user")
            .declare(Declaration::new().body(TypeInfo::any()));

        let info = root.info();
        assert_eq!(info.path, "");
        assert_eq!(info.method, None);
        assert_eq!(info.description, vec!["Example API"]);

        let users = &info.map[0];
        assert_eq!(users.path, "/users");
        assert!(!users.action);
        assert_eq!(users.fields[0].value, json!("token"));

        let create = &users.map[0];
        assert_eq!(create.path, "/users");
        assert_eq!(create.method.as_deref(), Some("POST"));
        assert!(create.action);
        assert!(create.declaration.is_some());
        assert_eq!(info.walk().len(), 3);
    }

    #[test]
    fn test_info_serializes() {
        let mut root = Context::new();
        root.path("/ping").get(ok);
        let value = serde_json::to_value(root.info()).unwrap();
        assert_eq!(value["map"][0]["path"], json!("/ping"));
        assert_eq!(value["map"][0]["map"][0]["method"], json!("GET"));
        assert_eq!(value["map"][0]["map"][0]["fields"], json!([]));
    }
}
