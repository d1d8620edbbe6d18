//! HTTP route handlers for the Scientia API.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use crate::chat::core::config::{ConfigUpdate, GenerationConfig};
use crate::chat::core::errors::ChatError;
use crate::chat::core::ids::SessionId;
use crate::chat::core::message::Message;
use crate::chat::personality::{Personality, PersonalityDefinition, PersonalityRegistry};
use crate::chat::rooms::RoomSummary;
use crate::chat::session::ChatSession;
use crate::export::{ExportError, ExportFormat};

use super::sessions::{SharedSession, lock_session};
use super::state::AppState;

/// Header selecting the caller's session. Absent means the shared session.
pub const SESSION_HEADER: &str = "x-scientia-session";

type ApiError = (StatusCode, String);
type ApiResult<T> = Result<Json<T>, ApiError>;

/// Create the API router with all routes.
#[must_use]
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_dir = state.static_dir.clone();
    Router::new()
        .route("/health", get(health_check))
        .route("/api/sessions", post(create_session))
        .route("/api/state", get(session_state))
        .route("/api/chat", post(chat))
        .route("/api/rooms", post(create_room))
        .route("/api/rooms/active", put(switch_room))
        .route("/api/rooms/{name}", delete(delete_room))
        .route("/api/reset", post(reset_room))
        .route("/api/personalities", get(list_personalities))
        .route("/api/personality", put(set_personality))
        .route("/api/config", get(get_config).patch(stage_config))
        .route("/api/config/apply", post(apply_config))
        .route("/api/config/staged", delete(discard_config))
        .route("/api/export", get(export))
        .route("/api/instance", get(instance))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "scientia",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn chat_error(err: ChatError) -> ApiError {
    let status = match &err {
        ChatError::ProtectedRoom(_) => StatusCode::FORBIDDEN,
        ChatError::RoomNotFound(_) => StatusCode::NOT_FOUND,
        ChatError::RoomExists(_) => StatusCode::CONFLICT,
        ChatError::InvalidConfig(_)
        | ChatError::InvalidRoomName(_)
        | ChatError::UnknownPersonality(_)
        | ChatError::SystemMessageAppend
        | ChatError::Url(_) => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string())
}

fn export_error(err: ExportError) -> ApiError {
    let status = match &err {
        ExportError::UnknownFormat(_) => StatusCode::BAD_REQUEST,
        ExportError::Io(_) | ExportError::Pdf(_) | ExportError::Csv(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

/// Resolve the caller's session from [`SESSION_HEADER`].
fn session_for(state: &AppState, headers: &HeaderMap) -> Result<SharedSession, ApiError> {
    let id = match headers.get(SESSION_HEADER) {
        None => SessionId::shared(),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<SessionId>().ok())
            .ok_or_else(|| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("{SESSION_HEADER} must be a UUID"),
                )
            })?,
    };
    Ok(state.sessions.get_or_create(id))
}

/// Run `f` on the blocking pool.
///
/// Every handler that locks a session goes through here: a chat turn holds
/// the lock for the whole completion request.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!("blocking task failed: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal task failure".to_string(),
        )
    })
}

/// Newly created session.
#[derive(Debug, Serialize)]
pub struct SessionCreated {
    /// Value to send in [`SESSION_HEADER`].
    pub session_id: SessionId,
}

async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionCreated>) {
    let session_id = state.sessions.create();
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

/// Snapshot of a session for the UI.
#[derive(Debug, Serialize)]
pub struct SessionView {
    /// Active room name.
    pub active_room: String,
    /// Every room in creation order.
    pub rooms: Vec<RoomSummary>,
    /// Active room's messages, system prompt excluded.
    pub messages: Vec<Message>,
    /// Active room's personality.
    pub personality: PersonalityDefinition,
    /// Token total of the active room, system prompt included.
    pub total_tokens: usize,
    /// Applied settings.
    pub config: GenerationConfig,
    /// Whether staged settings are waiting to be applied.
    pub pending_changes: bool,
}

impl SessionView {
    fn of(session: &ChatSession) -> Self {
        let room = session.active_room();
        Self {
            active_room: room.name().to_string(),
            rooms: session.rooms().summaries(),
            messages: room.state().conversation().to_vec(),
            personality: room.personality().definition(),
            total_tokens: session.total_tokens(),
            config: session.config().clone(),
            pending_changes: session.has_pending_changes(),
        }
    }
}

async fn session_state(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<SessionView> {
    let session = session_for(&state, &headers)?;
    let view = blocking(move || SessionView::of(&lock_session(&session))).await?;
    Ok(Json(view))
}

/// Chat request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if request.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "message must not be empty".to_string(),
        ));
    }
    let session = session_for(&state, &headers)?;
    let client = Arc::clone(&state.client);

    let outcome = blocking(move || {
        lock_session(&session).send_message(client.as_ref(), request.message)
    })
    .await?;

    let status = if outcome.is_reply() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(outcome)).into_response())
}

/// Room creation request.
#[derive(Debug, Default, Deserialize)]
pub struct CreateRoomRequest {
    /// Explicit name; generated when absent.
    #[serde(default)]
    pub name: Option<String>,
}

/// Room switch request.
#[derive(Debug, Deserialize)]
pub struct SwitchRoomRequest {
    /// Room to activate.
    pub name: String,
}

/// Name of the room an operation acted on.
#[derive(Debug, Serialize)]
pub struct RoomResponse {
    /// Room name.
    pub name: String,
}

async fn create_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), ApiError> {
    let session = session_for(&state, &headers)?;
    let name = blocking(move || lock_session(&session).create_room(request.name.as_deref()))
        .await?
        .map_err(chat_error)?;
    Ok((StatusCode::CREATED, Json(RoomResponse { name })))
}

async fn switch_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SwitchRoomRequest>,
) -> ApiResult<RoomResponse> {
    let session = session_for(&state, &headers)?;
    let name = blocking(move || {
        lock_session(&session)
            .switch_room(&request.name)
            .map(|()| request.name)
    })
    .await?
    .map_err(chat_error)?;
    Ok(Json(RoomResponse { name }))
}

async fn delete_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session = session_for(&state, &headers)?;
    blocking(move || lock_session(&session).delete_room(&name))
        .await?
        .map_err(chat_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reset_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<RoomResponse> {
    let session = session_for(&state, &headers)?;
    let name = blocking(move || {
        let mut guard = lock_session(&session);
        guard.reset_room();
        guard.active_room().name().to_string()
    })
    .await?;
    Ok(Json(RoomResponse { name }))
}

async fn list_personalities() -> Json<Vec<PersonalityDefinition>> {
    Json(PersonalityRegistry.list())
}

/// Personality switch request.
#[derive(Debug, Deserialize)]
pub struct PersonalityRequest {
    /// Slug or display name.
    pub personality: String,
}

async fn set_personality(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<PersonalityRequest>,
) -> ApiResult<PersonalityDefinition> {
    let personality = request
        .personality
        .parse::<Personality>()
        .map_err(chat_error)?;
    let session = session_for(&state, &headers)?;
    blocking(move || lock_session(&session).set_personality(personality)).await?;
    Ok(Json(personality.definition()))
}

/// Applied and staged generation settings.
#[derive(Debug, Serialize)]
pub struct ConfigView {
    /// Settings in effect.
    pub applied: GenerationConfig,
    /// Settings waiting to be applied.
    pub staged: Option<GenerationConfig>,
    /// Whether staged settings differ from applied ones.
    pub pending_changes: bool,
}

impl ConfigView {
    fn of(session: &ChatSession) -> Self {
        Self {
            applied: session.config().clone(),
            staged: session.staged_config().cloned(),
            pending_changes: session.has_pending_changes(),
        }
    }
}

async fn get_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<ConfigView> {
    let session = session_for(&state, &headers)?;
    let view = blocking(move || ConfigView::of(&lock_session(&session))).await?;
    Ok(Json(view))
}

async fn stage_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<ConfigUpdate>,
) -> ApiResult<ConfigView> {
    let session = session_for(&state, &headers)?;
    let view = blocking(move || {
        let mut guard = lock_session(&session);
        guard.stage_config(&update)?;
        Ok::<_, ChatError>(ConfigView::of(&guard))
    })
    .await?
    .map_err(chat_error)?;
    Ok(Json(view))
}

async fn apply_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<ConfigView> {
    let session = session_for(&state, &headers)?;
    let view = blocking(move || {
        let mut guard = lock_session(&session);
        guard.apply_config();
        ConfigView::of(&guard)
    })
    .await?;
    Ok(Json(view))
}

async fn discard_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<ConfigView> {
    let session = session_for(&state, &headers)?;
    let view = blocking(move || {
        let mut guard = lock_session(&session);
        guard.discard_staged();
        ConfigView::of(&guard)
    })
    .await?;
    Ok(Json(view))
}

/// Export query string.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// `pdf`, `txt` or `csv`; defaults to `pdf`.
    pub format: Option<String>,
}

async fn export(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = match query.format.as_deref() {
        Some(raw) => raw.parse::<ExportFormat>().map_err(export_error)?,
        None => ExportFormat::default(),
    };
    let session = session_for(&state, &headers)?;

    let file = blocking(move || lock_session(&session).export(format))
        .await?
        .map_err(export_error)?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe(&file.file_name)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(file.mime_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

/// Replace characters that cannot appear in a quoted header parameter.
fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Instance identity response.
#[derive(Debug, Serialize)]
pub struct InstanceResponse {
    /// Instance id or the unavailable placeholder.
    pub instance_id: String,
}

async fn instance(State(state): State<Arc<AppState>>) -> ApiResult<InstanceResponse> {
    let instance_id = blocking(move || state.instance_id().to_string()).await?;
    Ok(Json(InstanceResponse { instance_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::rooms::{DEFAULT_ROOM, GREETING};
    use crate::chat::session::GENERATION_FAILED_NOTICE;
    use crate::chat::state::tests::FlatCounter;
    use crate::instance::{INSTANCE_ID_UNAVAILABLE, InstanceIdentity};
    use crate::llm::completion::CompletionClient;
    use crate::llm::error::CompletionError;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};
    use tower::ServiceExt;

    struct CannedClient(Option<&'static str>);

    impl CompletionClient for CannedClient {
        fn complete(
            &self,
            _history: &[Message],
            _config: &GenerationConfig,
        ) -> Result<String, CompletionError> {
            self.0
                .map(str::to_string)
                .ok_or(CompletionError::NoChoices)
        }
    }

    /// Holds the session lock for a while before replying.
    struct SlowClient(Duration);

    impl CompletionClient for SlowClient {
        fn complete(
            &self,
            _history: &[Message],
            _config: &GenerationConfig,
        ) -> Result<String, CompletionError> {
            std::thread::sleep(self.0);
            Ok("finally".to_string())
        }
    }

    fn app(reply: Option<&'static str>) -> Router {
        app_with(Arc::new(CannedClient(reply)))
    }

    fn app_with(client: Arc<dyn CompletionClient>) -> Router {
        let state = AppState::with_parts(
            client,
            Arc::new(FlatCounter(1)),
            InstanceIdentity::disabled(),
            GenerationConfig::default(),
            8,
            PathBuf::from("static"),
        );
        create_router(state)
    }

    fn request(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder().method(method).uri(uri);
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(None)
            .oneshot(request("GET", "/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_chat_reply_then_state() {
        let app = app(Some("Mitochondria are the powerhouse of the cell."));

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/chat",
                Some(serde_json::json!({ "message": "What do mitochondria do?" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "replied");
        assert_eq!(body["reply"], "Mitochondria are the powerhouse of the cell.");

        let state = json(app.oneshot(request("GET", "/api/state", None)).await.unwrap()).await;
        assert_eq!(state["active_room"], DEFAULT_ROOM);
        let messages = state["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["content"], GREETING);
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
    }

    #[tokio::test]
    async fn test_chat_failure_is_bad_gateway() {
        let app = app(None);

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/chat",
                Some(serde_json::json!({ "message": "hello?" })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json(response).await;
        assert_eq!(body["status"], "failed");
        assert_eq!(body["error"], GENERATION_FAILED_NOTICE);

        let state = json(app.oneshot(request("GET", "/api/state", None)).await.unwrap()).await;
        let messages = state["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["content"], "hello?");
    }

    #[tokio::test]
    async fn test_slow_turn_does_not_stall_runtime() {
        // Single-threaded runtime: any handler that waits on the session
        // lock in place freezes every other request until the turn ends.
        let app = app_with(Arc::new(SlowClient(Duration::from_millis(1500))));

        let turn = tokio::spawn(app.clone().oneshot(request(
            "POST",
            "/api/chat",
            Some(serde_json::json!({ "message": "take your time" })),
        )));
        tokio::time::sleep(Duration::from_millis(200)).await;

        let started = Instant::now();
        let config = tokio::spawn(app.clone().oneshot(request("GET", "/api/config", None)));
        let rename = tokio::spawn(app.clone().oneshot(request(
            "POST",
            "/api/rooms",
            Some(serde_json::json!({ "name": "Later" })),
        )));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let health = app
            .clone()
            .oneshot(request("GET", "/health", None))
            .await
            .unwrap();

        assert_eq!(health.status(), StatusCode::OK);
        assert!(
            started.elapsed() < Duration::from_millis(800),
            "health waited {:?} behind the chat turn",
            started.elapsed()
        );

        assert_eq!(turn.await.unwrap().unwrap().status(), StatusCode::OK);
        assert_eq!(config.await.unwrap().unwrap().status(), StatusCode::OK);
        assert_eq!(rename.await.unwrap().unwrap().status(), StatusCode::CREATED);

        let state = json(app.oneshot(request("GET", "/api/state", None)).await.unwrap()).await;
        assert_eq!(state["active_room"], "Later");
        let main = &state["rooms"][0];
        assert_eq!(main["messages"], 3);
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let response = app(Some("x"))
            .oneshot(request(
                "POST",
                "/api/chat",
                Some(serde_json::json!({ "message": "   " })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_protected_room_is_forbidden() {
        let response = app(None)
            .oneshot(request("DELETE", "/api/rooms/Main%20Chat%20Room", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_room_lifecycle() {
        let app = app(None);

        let created = app
            .clone()
            .oneshot(request("POST", "/api/rooms", Some(serde_json::json!({}))))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        assert_eq!(json(created).await["name"], "Chat Room 1");

        let duplicate = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/rooms",
                Some(serde_json::json!({ "name": "Chat Room 1" })),
            ))
            .await
            .unwrap();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let blank = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/rooms",
                Some(serde_json::json!({ "name": "  " })),
            ))
            .await
            .unwrap();
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);
        let reason = to_bytes(blank.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&reason[..], b"invalid room name: name must not be blank");

        let switched = app
            .clone()
            .oneshot(request(
                "PUT",
                "/api/rooms/active",
                Some(serde_json::json!({ "name": "Nowhere" })),
            ))
            .await
            .unwrap();
        assert_eq!(switched.status(), StatusCode::NOT_FOUND);

        let deleted = app
            .clone()
            .oneshot(request("DELETE", "/api/rooms/Chat%20Room%201", None))
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let state = json(app.oneshot(request("GET", "/api/state", None)).await.unwrap()).await;
        assert_eq!(state["active_room"], DEFAULT_ROOM);
        assert_eq!(state["rooms"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated_by_header() {
        let app = app(None);
        let created = json(
            app.clone()
                .oneshot(request("POST", "/api/sessions", None))
                .await
                .unwrap(),
        )
        .await;
        let id = created["session_id"].as_str().unwrap().to_string();

        let mut create = request("POST", "/api/rooms", Some(serde_json::json!({ "name": "Private" })));
        create
            .headers_mut()
            .insert(SESSION_HEADER, HeaderValue::from_str(&id).unwrap());
        let response = app.clone().oneshot(create).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let shared = json(app.clone().oneshot(request("GET", "/api/state", None)).await.unwrap()).await;
        assert_eq!(shared["rooms"].as_array().unwrap().len(), 1);

        let mut bad = request("GET", "/api/state", None);
        bad.headers_mut()
            .insert(SESSION_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert_eq!(
            app.oneshot(bad).await.unwrap().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_personality_switch() {
        let app = app(None);
        let response = app
            .clone()
            .oneshot(request(
                "PUT",
                "/api/personality",
                Some(serde_json::json!({ "personality": "minimalist" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let state = json(app.clone().oneshot(request("GET", "/api/state", None)).await.unwrap()).await;
        assert_eq!(state["personality"]["slug"], "minimalist");

        let unknown = app
            .oneshot(request(
                "PUT",
                "/api/personality",
                Some(serde_json::json!({ "personality": "grumpy" })),
            ))
            .await
            .unwrap();
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_config_stage_apply_discard() {
        let app = app(None);

        let staged = app
            .clone()
            .oneshot(request(
                "PATCH",
                "/api/config",
                Some(serde_json::json!({ "temperature": 0.2, "max_tokens": 100 })),
            ))
            .await
            .unwrap();
        assert_eq!(staged.status(), StatusCode::OK);
        let body = json(staged).await;
        assert_eq!(body["pending_changes"], true);
        assert_eq!(body["applied"]["max_tokens"], 512);
        assert_eq!(body["staged"]["max_tokens"], 100);

        let invalid = app
            .clone()
            .oneshot(request(
                "PATCH",
                "/api/config",
                Some(serde_json::json!({ "max_tokens": 5 })),
            ))
            .await
            .unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let empty = app
            .clone()
            .oneshot(request("PATCH", "/api/config", Some(serde_json::json!({}))))
            .await
            .unwrap();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let applied = json(
            app.clone()
                .oneshot(request("POST", "/api/config/apply", None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(applied["applied"]["max_tokens"], 100);
        assert_eq!(applied["pending_changes"], false);

        let discarded = json(
            app.oneshot(request("DELETE", "/api/config/staged", None))
                .await
                .unwrap(),
        )
        .await;
        assert!(discarded["staged"].is_null());
    }

    #[tokio::test]
    async fn test_export_txt_download() {
        let response = app(None)
            .oneshot(request("GET", "/api/export?format=txt", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"Scientia-Main Chat Room-"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains(GREETING));
    }

    #[tokio::test]
    async fn test_export_unknown_format() {
        let response = app(None)
            .oneshot(request("GET", "/api/export?format=docx", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_instance_placeholder() {
        let body = json(
            app(None)
                .oneshot(request("GET", "/api/instance", None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["instance_id"], INSTANCE_ID_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_personalities_list() {
        let body = json(
            app(None)
                .oneshot(request("GET", "/api/personalities", None))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_header_safe() {
        assert_eq!(header_safe("Scientia-Ré\"sumé.txt"), "Scientia-R__sum_.txt");
    }
}
