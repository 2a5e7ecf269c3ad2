use super::endpoints::{self, FINANCE, LOGIN, StaffFamily, UPDATE_ORDER_STATUS};
use crate::application::ports::RemoteGateway;
use crate::domain::entities::{Credentials, Session};
use crate::domain::value_objects::{Collection, Role};
use crate::shared::config::ApiConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Map, Value};
use std::sync::RwLock;
use std::time::Duration;

/// `RemoteGateway` over the POS REST API.
pub struct HttpRemoteGateway {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpRemoteGateway {
    pub fn new(config: &ApiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| AppError::ConfigurationError(err.to_string()))?;
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, AppError> {
        let url = build_url(&self.base_url, path);
        let mut builder = self.client.request(method.clone(), &url);
        if let Some(token) = self.token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        tracing::debug!(target: "gateway::http", %method, path, "sending request");
        let response = builder.send().await.map_err(|err| {
            tracing::warn!(target: "gateway::http", %method, path, error = %err, "request did not reach server");
            AppError::from(err)
        })?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                target: "gateway::http",
                %method,
                path,
                status = status.as_u16(),
                "request rejected"
            );
            return Err(AppError::transport(
                status.as_u16(),
                format!("{method} {path} failed ({status}): {text}"),
            ));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|err| AppError::DeserializationError(err.to_string()))
    }

    async fn fetch_staff(&self) -> Result<Vec<Value>, AppError> {
        let mut staff = Vec::new();
        for family in StaffFamily::ALL {
            let body = self
                .send_json(Method::GET, endpoints::staff_routes(family).fetch, None)
                .await?;
            for mut member in unwrap_list(Collection::Users, body)? {
                if let Value::Object(fields) = &mut member {
                    fields
                        .entry("role")
                        .or_insert_with(|| Value::String(family.role().to_string()));
                }
                staff.push(member);
            }
        }
        Ok(staff)
    }
}

#[async_trait]
impl RemoteGateway for HttpRemoteGateway {
    fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session, AppError> {
        let body = serde_json::to_value(credentials)?;
        let response = self.send_json(Method::POST, LOGIN, Some(&body)).await?;
        let session = parse_session(response)?;
        self.set_token(Some(session.token.clone()));
        Ok(session)
    }

    async fn fetch_all(&self, collection: Collection) -> Result<Vec<Value>, AppError> {
        if collection == Collection::Users {
            return self.fetch_staff().await;
        }
        let routes = endpoints::routes(collection, &Value::Null);
        let body = self.send_json(Method::GET, routes.fetch, None).await?;
        unwrap_list(collection, body)
    }

    async fn fetch_by_owner(
        &self,
        collection: Collection,
        owner_id: &str,
    ) -> Result<Vec<Value>, AppError> {
        let items = self.fetch_all(collection).await?;
        let Some(field) = collection.owner_field() else {
            return Ok(items);
        };
        Ok(items
            .into_iter()
            .filter(|item| item.get(field).and_then(id_to_string).as_deref() == Some(owner_id))
            .collect())
    }

    async fn create(&self, collection: Collection, payload: &Value) -> Result<Value, AppError> {
        let routes = endpoints::routes(collection, payload);
        let body = self
            .send_json(Method::POST, routes.create, Some(payload))
            .await?;
        Ok(unwrap_single(collection, body))
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        payload: &Value,
    ) -> Result<Value, AppError> {
        let routes = endpoints::routes(collection, payload);
        let mut fields = payload.as_object().cloned().unwrap_or_default();
        fields
            .entry(collection.server_id_field())
            .or_insert_with(|| Value::String(id.to_string()));
        let request = Value::Object(fields);

        let body = self
            .send_json(Method::PUT, routes.update, Some(&request))
            .await?;
        Ok(unwrap_single(collection, body))
    }

    async fn delete(
        &self,
        collection: Collection,
        id: &str,
        payload: &Value,
    ) -> Result<(), AppError> {
        let routes = endpoints::routes(collection, payload);
        let path = format!("{}/{}", routes.delete, id);
        self.send_json(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn update_order_status(&self, order_id: &str, status: &str) -> Result<Value, AppError> {
        let mut request = Map::new();
        request.insert(
            Collection::Orders.server_id_field().to_string(),
            Value::String(order_id.to_string()),
        );
        request.insert("status".to_string(), Value::String(status.to_string()));

        let body = self
            .send_json(
                Method::PUT,
                UPDATE_ORDER_STATUS,
                Some(&Value::Object(request)),
            )
            .await?;
        Ok(unwrap_single(Collection::Orders, body))
    }

    async fn fetch_finance(&self) -> Result<Value, AppError> {
        let body = self.send_json(Method::GET, FINANCE, None).await?;
        Ok(match body {
            Value::Object(mut fields) if fields.contains_key("data") => {
                fields.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        })
    }
}

fn build_url(base_url: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    format!("{base_url}/{path}")
}

/// List endpoints answer with a bare array, `{ "data": [...] }` or an object keyed
/// by the collection name.
fn unwrap_list(collection: Collection, body: Value) -> Result<Vec<Value>, AppError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(mut fields) => {
            if let Some(data) = fields.remove("data") {
                return unwrap_list(collection, data);
            }
            if let Some(Value::Array(items)) = fields.remove(collection.store_name()) {
                return Ok(items);
            }
            fields
                .into_iter()
                .find_map(|(_, value)| match value {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .ok_or_else(|| {
                    AppError::DeserializationError(format!(
                        "{} response has no list",
                        collection.store_name()
                    ))
                })
        }
        other => Err(AppError::DeserializationError(format!(
            "{} response is not a list: {other}",
            collection.store_name()
        ))),
    }
}

/// Single-entity responses may be wrapped in `data` or a key named after the entity.
fn unwrap_single(collection: Collection, body: Value) -> Value {
    match body {
        Value::Object(mut fields) => {
            for key in ["data", collection.label(), collection.store_name()] {
                if matches!(fields.get(key), Some(Value::Object(_))) {
                    return fields.remove(key).unwrap_or(Value::Null);
                }
            }
            Value::Object(fields)
        }
        other => other,
    }
}

fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(id_to_string))
        .filter(|s| !s.trim().is_empty())
}

fn parse_session(body: Value) -> Result<Session, AppError> {
    let body = match body {
        Value::Object(mut fields) if matches!(fields.get("data"), Some(Value::Object(_))) => {
            fields.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    let token = string_field(&body, &["token", "accessToken"]).ok_or_else(|| {
        AppError::DeserializationError("Login response has no token".to_string())
    })?;
    let user = ["user", "staff"]
        .into_iter()
        .find_map(|key| body.get(key).filter(|value| value.is_object()))
        .unwrap_or(&body);

    let user_id = string_field(user, &["_id", "id", "userId"]).ok_or_else(|| {
        AppError::DeserializationError("Login response has no user id".to_string())
    })?;
    let role = string_field(user, &["role"])
        .ok_or_else(|| AppError::DeserializationError("Login response has no role".to_string()))
        .and_then(|role| Role::from_value(&role).map_err(AppError::DeserializationError))?;
    let name = string_field(user, &["name", "username", "email"]).unwrap_or_default();

    Ok(Session::new(user_id, name, role, token))
}
