use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use autoplan_core::llm::LlmClient;
use autoplan_core::plan::{
    AutoPlanError, AutoPlanOutcome, AutoPlanRequest, DEFAULT_STRATEGY, ManualItem, STRATEGIES,
    create_manual_item, generate_auto_plan, regenerate_item,
};
use autoplan_core::schedule::Month;
use autoplan_core::session::{SessionConfig, token_from_cookie_header, validate_session};
use autoplan_db::models::{CalendarItem, ContentProfile, ProfilePreferences};
use autoplan_db::queries::calendar_items;
use autoplan_db::queries::profiles::{self, ProfileFields};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub llm: Arc<dyn LlmClient>,
    pub sessions: SessionConfig,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// JSON error body `{ "error": <message>, "code": <code> }`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    pub fn unauthenticated() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "UNAUTHENTICATED",
            message: "Sessão inválida ou expirada. Faça login novamente.".to_string(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND",
            message: message.into(),
        }
    }

    pub fn invalid_input(detail: impl std::fmt::Display) -> Self {
        AutoPlanError::InvalidInput(detail.to_string()).into()
    }

    pub fn internal(err: anyhow::Error) -> Self {
        AutoPlanError::Internal(err).into()
    }
}

impl From<AutoPlanError> for AppError {
    fn from(err: AutoPlanError) -> Self {
        if err.is_upstream() {
            error!(code = err.code(), error = %error_chain(&err), "request failed");
        } else {
            debug!(code = err.code(), error = %err, "request rejected");
        }
        Self {
            status: StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            code: err.code(),
            message: err.user_message(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = json!({ "error": self.message, "code": self.code });
        (self.status, Json(body)).into_response()
    }
}

/// Render an error with all of its sources, outermost first.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

// ---------------------------------------------------------------------------
// Session extractor
// ---------------------------------------------------------------------------

/// The authenticated caller, taken from the session cookie.
pub struct SessionUser(pub Uuid);

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(token_from_cookie_header)
            .ok_or_else(AppError::unauthenticated)?;

        let claims = validate_session(&state.sessions, token, Utc::now()).map_err(|e| {
            debug!(error = %e, "rejected session token");
            AppError::unauthenticated()
        })?;
        Ok(SessionUser(claims.user_id))
    }
}

/// Parse an optional JSON body; an empty body yields `T::default()`.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_required_body(body)
}

fn parse_required_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::invalid_input(format!("JSON inválido: {e}")))
}

/// Parse an optional `YYYY-MM` month parameter; blank means absent.
fn parse_month(raw: Option<&str>) -> Result<Option<Month>, AppError> {
    match raw.map(str::trim).filter(|m| !m.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<Month>()
            .map(Some)
            .map_err(|e| AutoPlanError::InvalidMonth(e.to_string()).into()),
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AutoPlanBody {
    #[serde(default)]
    month: Option<String>,
    #[serde(default)]
    script_strategy_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegenerateBody {
    #[serde(default)]
    script_strategy_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileBody {
    #[serde(default)]
    business_name: String,
    #[serde(default)]
    niche: String,
    #[serde(default)]
    audience: String,
    #[serde(default)]
    tone: String,
    #[serde(default)]
    goals: String,
    #[serde(default)]
    platforms: Vec<String>,
    weekly_frequency: i32,
    #[serde(default)]
    preferences: ProfilePreferences,
}

impl ProfileBody {
    fn into_fields(self) -> Result<ProfileFields, AppError> {
        if !(1..=14).contains(&self.weekly_frequency) {
            return Err(AppError::invalid_input(
                "weeklyFrequency deve estar entre 1 e 14",
            ));
        }
        if let Some(day) = self
            .preferences
            .availability_days
            .iter()
            .find(|d| !(0..=6).contains(*d))
        {
            return Err(AppError::invalid_input(format!(
                "dia disponível inválido: {day} (use 0 = domingo a 6 = sábado)"
            )));
        }
        Ok(ProfileFields {
            business_name: self.business_name.trim().to_string(),
            niche: self.niche.trim().to_string(),
            audience: self.audience.trim().to_string(),
            tone: self.tone.trim().to_string(),
            goals: self.goals.trim().to_string(),
            platforms: self
                .platforms
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            weekly_frequency: self.weekly_frequency,
            preferences: self.preferences,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CalendarQuery {
    month: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auto-plan", post(auto_plan))
        .route("/api/strategies", get(list_strategies))
        .route("/api/profile", get(get_profile).put(put_profile))
        .route("/api/calendar", get(list_calendar).post(create_item))
        .route("/api/calendar/{id}", delete(delete_item))
        .route("/api/calendar/{id}/regenerate", post(regenerate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("autoplan serve listening on http://{addr}");
    println!("autoplan serve listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("autoplan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C; shutting down");
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn auto_plan(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    body: Bytes,
) -> Result<Json<AutoPlanOutcome>, AppError> {
    let body: AutoPlanBody = parse_body(&body)?;
    let request = AutoPlanRequest {
        user_id,
        month: parse_month(body.month.as_deref())?,
        strategy_key: body.script_strategy_key,
        today: Utc::now().date_naive(),
    };
    let outcome = generate_auto_plan(&state.pool, state.llm.as_ref(), &request).await?;
    Ok(Json(outcome))
}

async fn list_strategies() -> Json<serde_json::Value> {
    Json(json!({ "default": DEFAULT_STRATEGY, "strategies": STRATEGIES }))
}

async fn get_profile(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
) -> Result<Json<ContentProfile>, AppError> {
    profiles::get_profile(&state.pool, user_id)
        .await
        .map_err(AppError::internal)?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Perfil de conteúdo não encontrado."))
}

async fn put_profile(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    body: Bytes,
) -> Result<Json<ContentProfile>, AppError> {
    let fields = parse_required_body::<ProfileBody>(&body)?.into_fields()?;
    let profile = profiles::upsert_profile(&state.pool, user_id, &fields)
        .await
        .map_err(AppError::internal)?;
    info!(user_id = %user_id, "saved content profile");
    Ok(Json(profile))
}

async fn list_calendar(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Vec<CalendarItem>>, AppError> {
    let month = parse_month(query.month.as_deref())?
        .unwrap_or_else(|| Month::containing(Utc::now().date_naive()));
    let items =
        calendar_items::list_items_in_range(&state.pool, user_id, month.first_day(), month.last_day())
            .await
            .map_err(AppError::internal)?;
    Ok(Json(items))
}

async fn create_item(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    body: Bytes,
) -> Result<(StatusCode, Json<CalendarItem>), AppError> {
    let input: ManualItem = parse_required_body(&body)?;
    let item = create_manual_item(&state.pool, user_id, &input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn delete_item(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = calendar_items::delete_calendar_item(&state.pool, user_id, id)
        .await
        .map_err(AppError::internal)?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AutoPlanError::ItemNotFound(id).into())
    }
}

async fn regenerate(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<CalendarItem>, AppError> {
    let body: RegenerateBody = parse_body(&body)?;
    let item = regenerate_item(
        &state.pool,
        state.llm.as_ref(),
        user_id,
        id,
        body.script_strategy_key.as_deref(),
    )
    .await?;
    Ok(Json(item))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
