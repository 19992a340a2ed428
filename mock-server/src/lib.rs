//! httpbin-style test server for exercising the request delegate over real
//! HTTP.
//!
//! Echo, status, delay, auth and cookie endpoints reflect what the client
//! sent; `/items` is a small in-memory resource whose failures carry a JSON
//! error body.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

use axum::{
    body::to_bytes,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Token accepted by `/bearer`.
pub const BEARER_TOKEN: &str = "letmein";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub price: u32,
}

#[derive(Deserialize)]
pub struct CreateItem {
    pub name: String,
    #[serde(default)]
    pub price: u32,
}

#[derive(Deserialize)]
pub struct UpdateItem {
    pub name: Option<String>,
    pub price: Option<u32>,
}

/// JSON error body sent with every failure this server produces itself.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub errors: Vec<ErrorEntry>,
    pub success: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEntry {
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ErrorBody {
    pub fn new(kind: &str, msg: impl Into<String>) -> Self {
        Self {
            errors: vec![ErrorEntry {
                msg: msg.into(),
                kind: kind.to_string(),
            }],
            success: false,
        }
    }
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, kind: &str, msg: impl Into<String>) -> ApiError {
    (status, Json(ErrorBody::new(kind, msg)))
}

/// What the server saw of a request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    /// Raw body, lossily decoded. Empty for multipart requests.
    pub data: String,
    pub json: Option<Value>,
    pub form: Vec<(String, String)>,
    pub files: Vec<EchoFile>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EchoFile {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub content: String,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Item>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/anything", any(echo))
        .route("/anything/{*rest}", any(echo))
        .route("/status/{code}", any(status))
        .route("/empty", get(empty))
        .route("/garbage", get(garbage))
        .route("/delay/{ms}", get(delay))
        .route("/bearer", get(bearer))
        .route("/cookies", get(cookies))
        .route("/cookies/set", get(set_cookies))
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).patch(update_item).delete(delete_item),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(request: Request) -> Result<Json<Echo>, ApiError> {
    let (parts, body) = request.into_parts();
    let query = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default();
    let mut echo = Echo {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query,
        headers: header_strings(&parts.headers),
        ..Echo::default()
    };

    let is_multipart = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));
    let request = Request::from_parts(parts, body);

    if is_multipart {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, "multipart", e.body_text()))?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, "multipart", e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, "multipart", e.body_text()))?;
            let content = String::from_utf8_lossy(&data).into_owned();
            if filename.is_some() {
                echo.files.push(EchoFile {
                    name,
                    filename,
                    content_type,
                    content,
                });
            } else {
                echo.form.push((name, content));
            }
        }
    } else {
        let bytes = to_bytes(request.into_body(), usize::MAX)
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, "body", e.to_string()))?;
        echo.json = serde_json::from_slice(&bytes).ok();
        echo.data = String::from_utf8_lossy(&bytes).into_owned();
    }

    tracing::debug!(method = %echo.method, path = %echo.path, "echo");
    Ok(Json(echo))
}

fn header_strings(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

#[derive(Deserialize)]
struct StatusQuery {
    body: Option<String>,
}

/// Respond with `code`. The body is a JSON `ErrorBody` unless `?body=plain`
/// (a non-JSON string) or `?body=empty` is given.
async fn status(Path(code): Path<u16>, Query(query): Query<StatusQuery>) -> Response {
    let Ok(status) = StatusCode::from_u16(code) else {
        return api_error(StatusCode::BAD_REQUEST, "status", format!("invalid status {code}"))
            .into_response();
    };
    match query.body.as_deref() {
        Some("plain") => (status, "something went wrong").into_response(),
        Some("empty") => status.into_response(),
        _ => (status, Json(ErrorBody::new("status", format!("status {code}")))).into_response(),
    }
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

async fn garbage() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html")], "<html>not json</html>")
}

async fn delay(Path(ms): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({ "delayed_ms": ms }))
}

async fn bearer(headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token {
        Some(BEARER_TOKEN) => Ok(Json(serde_json::json!({ "authenticated": true }))),
        _ => Err(api_error(StatusCode::UNAUTHORIZED, "auth", "missing or bad bearer token")),
    }
}

async fn cookies(headers: HeaderMap) -> Json<BTreeMap<String, String>> {
    let jar = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Json(jar)
}

async fn set_cookies(Query(pairs): Query<Vec<(String, String)>>) -> Response {
    let mut response = Json(pairs.iter().cloned().collect::<BTreeMap<_, _>>()).into_response();
    for (name, value) in &pairs {
        if let Ok(cookie) = format!("{name}={value}; Path=/").parse() {
            response.headers_mut().append(header::SET_COOKIE, cookie);
        }
    }
    response
}

async fn list_items(State(db): State<Db>) -> Json<Vec<Item>> {
    let items = db.read().await;
    Json(items.values().cloned().collect())
}

async fn create_item(
    State(db): State<Db>,
    Json(input): Json<CreateItem>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let mut items = db.write().await;
    if items.values().any(|item| item.name == input.name) {
        return Err(api_error(
            StatusCode::CONFLICT,
            "conflict",
            format!("item {} already exists", input.name),
        ));
    }
    let item = Item {
        id: Uuid::new_v4(),
        name: input.name,
        price: input.price,
    };
    items.insert(item.id, item.clone());
    tracing::info!(id = %item.id, name = %item.name, "item created");
    Ok((StatusCode::CREATED, Json(item)))
}

fn not_found(id: Uuid) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", format!("item {id} not found"))
}

async fn get_item(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Item>, ApiError> {
    let items = db.read().await;
    items.get(&id).cloned().map(Json).ok_or_else(|| not_found(id))
}

async fn update_item(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateItem>,
) -> Result<Json<Item>, ApiError> {
    let mut items = db.write().await;
    let item = items.get_mut(&id).ok_or_else(|| not_found(id))?;
    if let Some(name) = input.name {
        item.name = name;
    }
    if let Some(price) = input.price {
        item.price = price;
    }
    Ok(Json(item.clone()))
}

/// Deletes and returns the item, so a successful delete still has a body.
async fn delete_item(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Item>, ApiError> {
    let mut items = db.write().await;
    let item = items.remove(&id).ok_or_else(|| not_found(id))?;
    tracing::info!(id = %item.id, "item deleted");
    Ok(Json(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serializes_to_json() {
        let item = Item {
            id: Uuid::nil(),
            name: "Lamp".to_string(),
            price: 12,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["name"], "Lamp");
        assert_eq!(json["price"], 12);
    }

    #[test]
    fn create_item_defaults_price_to_zero() {
        let input: CreateItem = serde_json::from_str(r#"{"name":"Free"}"#).unwrap();
        assert_eq!(input.name, "Free");
        assert_eq!(input.price, 0);
    }

    #[test]
    fn create_item_rejects_missing_name() {
        let result: Result<CreateItem, _> = serde_json::from_str(r#"{"price":3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn update_item_all_fields_optional() {
        let input: UpdateItem = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.name.is_none());
        assert!(input.price.is_none());
    }

    #[test]
    fn error_body_uses_type_key() {
        let json = serde_json::to_value(ErrorBody::new("not_found", "gone")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"errors": [{"msg": "gone", "type": "not_found"}], "success": false})
        );
    }
}
