//! HTTP route handlers for the BusTrack server.
//!
//! This module provides the HTTP API endpoints:
//!
//! - `POST /register` - Create a rider account
//! - `POST /login` - Exchange credentials for a session token
//! - `GET /api/bus-stops` - The static stop catalog
//! - `GET /api/profile/{user_id}` - Public account profile
//! - `GET /ws` - WebSocket subscription endpoint for realtime updates
//! - `GET /health` - Health check endpoint
//!
//! # Architecture
//!
//! All routes share application state through [`AppState`]: configuration,
//! the token service, the account directory, the room registry, and the
//! stop catalog. The state is built once at startup and cloned per
//! request.
//!
//! # Example
//!
//! ```rust,no_run
//! use bustrack_server::routes::{create_router, AppState};
//! use bustrack_server::config::Config;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("failed to load config");
//!     let state = AppState::new(config);
//!     let app = create_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::directory::{AccountDirectory, UserProfile, UserView};
use crate::error::ApiError;
use crate::rooms::{ClientId, RoomRegistry, TRACKING_ROOM};
use crate::stops::{stop_catalog, Stop};
use crate::token::TokenService;
use crate::types::{ClientMessage, ServerMessage};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
///
/// Cloned per request; every field is cheaply shareable.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,

    /// Session token issuance and validation.
    pub tokens: TokenService,

    /// Account records.
    pub directory: AccountDirectory,

    /// Subscription groups for realtime clients.
    pub rooms: RoomRegistry,

    /// Static stop catalog, loaded once.
    pub catalog: Arc<Vec<Stop>>,

    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Creates application state from configuration.
    ///
    /// Uses the configured token signing key when present; otherwise an
    /// ephemeral key is generated and tokens will not survive a restart.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let tokens = match config.token_seed {
            Some(seed) => TokenService::from_seed(seed),
            None => {
                warn!("BUSTRACK_TOKEN_KEY not set - using an ephemeral signing key");
                TokenService::ephemeral()
            }
        };

        Self::with_components(config, tokens, AccountDirectory::new(), RoomRegistry::new())
    }

    /// Creates application state with explicit components.
    ///
    /// Useful for tests that need to share a component with the router.
    #[must_use]
    pub fn with_components(
        config: Config,
        tokens: TokenService,
        directory: AccountDirectory,
        rooms: RoomRegistry,
    ) -> Self {
        Self {
            config: Arc::new(config),
            tokens,
            directory,
            rooms,
            catalog: stop_catalog(),
            start_time: Instant::now(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("directory", &self.directory)
            .field("rooms", &self.rooms)
            .field("catalog", &self.catalog.len())
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
///
/// The reference deployment serves browser clients from arbitrary origins,
/// so CORS is permissive.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(post_register))
        .route("/login", post(post_login))
        .route("/api/bus-stops", get(get_bus_stops))
        .route("/api/profile/{user_id}", get(get_profile))
        .route("/ws", get(get_ws))
        .route("/health", get(get_health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// POST /register
// ============================================================================

/// Request body for account registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Response body for successful registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserView,
}

/// POST /register - Create a rider account.
///
/// # Responses
///
/// - `201 Created` - Account created; body carries the public view
/// - `400 Bad Request` - Email already registered
async fn post_register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .directory
        .register(&body.email, &body.password, &body.name)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user,
        }),
    ))
}

// ============================================================================
// POST /login
// ============================================================================

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response body for successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserView,
}

/// POST /login - Exchange credentials for a session token.
///
/// # Responses
///
/// - `200 OK` - Credentials accepted; body carries the token
/// - `400 Bad Request` - Unknown email or wrong password (indistinguishable)
async fn post_login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state.directory.authenticate(&body.email, &body.password)?;
    let token = state.tokens.issue(user.id);

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user,
    }))
}

// ============================================================================
// GET /api/bus-stops
// ============================================================================

/// GET /api/bus-stops - The full stop catalog.
async fn get_bus_stops(State(state): State<AppState>) -> Json<Vec<Stop>> {
    Json(state.catalog.as_ref().clone())
}

// ============================================================================
// GET /api/profile/{user_id}
// ============================================================================

/// GET /api/profile/{user_id} - Public account profile.
///
/// # Responses
///
/// - `200 OK` - Public view including the creation time
/// - `404 Not Found` - No account with that id
async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.directory.find_by_id(user_id)?;
    Ok(Json(profile))
}

// ============================================================================
// GET /ws - Realtime subscription
// ============================================================================

/// Query parameters for the WebSocket endpoint.
#[derive(Debug, Deserialize)]
pub struct WsQueryParams {
    /// Session token issued at login.
    pub token: Option<String>,
}

/// GET /ws - WebSocket subscription endpoint.
///
/// The `token` query parameter must carry a valid session token; the
/// connection is rejected with 401 otherwise. Once upgraded, the client
/// may send a `join-bus-tracking` message to subscribe to location
/// updates.
///
/// Token validation does not re-check that the account still exists; the
/// token's embedded identity is trusted for the lifetime of the
/// connection.
///
/// The upgrade is extracted as a `Result` so the token check runs before
/// any upgrade negotiation: a bad token yields 401 even when the request
/// is not upgradable.
async fn get_ws(
    State(state): State<AppState>,
    Query(params): Query<WsQueryParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let token = match params.token.as_deref() {
        Some(token) if !token.is_empty() => token,
        _ => {
            debug!("Missing token in WebSocket request");
            return ApiError::Unauthorized.into_response();
        }
    };

    let claims = match state.tokens.validate(token) {
        Ok(claims) => claims,
        Err(err) => {
            debug!(error = %err, "Rejected WebSocket token");
            return ApiError::Unauthorized.into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    info!(user_id = claims.user_id, "WebSocket client connecting");

    let rooms = state.rooms.clone();
    ws.on_upgrade(move |socket| handle_websocket(socket, rooms, claims.user_id))
}

/// Handles an established WebSocket connection.
///
/// Outbound room messages flow through an mpsc channel registered with the
/// room registry; a forwarding task drains it onto the socket. The read
/// loop handles join requests until the client disconnects, at which point
/// the connection is removed from every room.
async fn handle_websocket(socket: WebSocket, rooms: RoomRegistry, user_id: u64) {
    let client_id: ClientId = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    info!(client = %client_id, user_id, "WebSocket client connected");

    // Forward room messages to the socket.
    let forward_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match serde_json::to_string(&message) {
                Ok(json) => {
                    if let Err(err) = sender.send(Message::Text(json.into())).await {
                        debug!(error = %err, "Failed to send message to WebSocket client");
                        break;
                    }
                }
                Err(err) => {
                    error!(error = %err, "Failed to serialize server message");
                }
            }
        }
    });

    // Handle client frames until disconnect.
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::JoinBusTracking { user_id: joined_as }) => {
                    rooms.join(TRACKING_ROOM, client_id, tx.clone());
                    info!(client = %client_id, user_id = joined_as, "Client joined bus tracking");
                }
                Err(err) => {
                    debug!(client = %client_id, error = %err, "Ignoring unrecognized client frame");
                }
            },
            Ok(Message::Close(_)) => {
                debug!(client = %client_id, "WebSocket client sent close frame");
                break;
            }
            Ok(Message::Ping(data)) => {
                // axum replies with pong automatically
                trace!(data_len = data.len(), "Received ping");
            }
            Ok(_) => {
                // Ignore binary and pong frames
            }
            Err(err) => {
                debug!(client = %client_id, error = %err, "WebSocket error");
                break;
            }
        }
    }

    // Disconnection removes the client from all groups immediately.
    rooms.remove_client(client_id);
    forward_task.abort();
    info!(client = %client_id, user_id, "WebSocket client disconnected");
}

// ============================================================================
// GET /health
// ============================================================================

/// Response body for the health check endpoint.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Server status (always "ok" if responding).
    pub status: String,

    /// Current members of the tracking room.
    pub connections: usize,

    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

/// GET /health - Health check endpoint. No authentication required.
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        connections: state.rooms.member_count(TRACKING_ROOM),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Tests
// ============================================================================
