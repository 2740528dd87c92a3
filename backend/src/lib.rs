use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use santa_core::{
    canonical_token, encode, now_millis, open_invite, sanitize_names, AssignmentError, Group,
    InviteError, MIN_PARTICIPANTS,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use url::Url;

pub mod config;
pub mod link;
pub mod notes;
pub mod telemetry;

use config::Config;
use link::{invite_link, mode_for};
use notes::{FileNoteStore, NoteStore};

#[derive(Clone)]
pub struct AppState {
    notes: Arc<dyn NoteStore>,
    public_url: String,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            Arc::new(FileNoteStore::in_memory()),
            config::DEFAULT_PUBLIC_URL,
        )
    }
}

impl AppState {
    pub fn new(notes: Arc<dyn NoteStore>, public_url: impl Into<String>) -> Self {
        Self {
            notes,
            public_url: public_url.into(),
        }
    }

    pub async fn from_config(config: &Config) -> Self {
        let notes = match &config.persist_path {
            Some(path) => FileNoteStore::with_persistence(path.clone()).await,
            None => FileNoteStore::in_memory(),
        };
        Self::new(Arc::new(notes), config.public_url.clone())
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/groups", post(create_group))
        .route("/invite", get(get_invite))
        .route("/invite/resolve", post(resolve_link))
        .route("/reveal", post(reveal))
        .route("/notes", get(get_note).put(put_note))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Deserialize)]
struct CreateGroupRequest {
    #[serde(default)]
    title: String,
    /// Free text, one name per line or comma separated.
    names: String,
}

#[derive(Deserialize)]
struct CreateParams {
    seed: Option<u64>,
}

#[derive(Serialize)]
struct CreateGroupResponse {
    token: String,
    invite_url: String,
    #[serde(flatten)]
    group: GroupView,
}

/// Everything about a group except who drew whom.
#[derive(Clone, Debug, Serialize)]
struct GroupView {
    title: String,
    names: Vec<String>,
    created_at: i64,
}

impl From<&Group> for GroupView {
    fn from(group: &Group) -> Self {
        Self {
            title: group.title.clone(),
            names: group.names.clone(),
            created_at: group.created_at,
        }
    }
}

#[derive(Deserialize)]
struct InviteQuery {
    g: Option<String>,
}

#[derive(Deserialize)]
struct ResolveRequest {
    link: String,
}

#[derive(Deserialize)]
struct RevealRequest {
    g: String,
    name: String,
}

#[derive(Serialize)]
struct RevealResponse {
    name: String,
    recipient: String,
    recipient_note: String,
}

#[derive(Deserialize)]
struct NoteQuery {
    g: String,
    name: String,
}

#[derive(Deserialize)]
struct NoteRequest {
    g: String,
    name: String,
    note: String,
}

#[derive(Serialize)]
struct NoteResponse {
    note: String,
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("please enter at least 3 distinct names")]
    TooFewNames,
    #[error("could not generate assignments, try again")]
    GenerationFailed(#[source] AssignmentError),
    #[error("{0}")]
    BadRoster(AssignmentError),
    #[error("invite token required")]
    MissingToken,
    #[error(transparent)]
    Invite(#[from] InviteError),
    #[error("name not in this group")]
    NotInGroup,
    #[error("invalid link")]
    InvalidLink,
    #[error("could not encode group")]
    Encode(#[source] serde_json::Error),
    #[error("could not build invite link")]
    InviteLink(#[source] url::ParseError),
}

impl From<AssignmentError> for ApiError {
    fn from(err: AssignmentError) -> Self {
        if err.is_retryable() {
            ApiError::GenerationFailed(err)
        } else {
            ApiError::BadRoster(err)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotInGroup => StatusCode::NOT_FOUND,
            ApiError::GenerationFailed(err) => {
                warn!(%err, "assignment generation exhausted its attempts");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Encode(err) => {
                error!(%err, "could not encode group");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::InviteLink(err) => {
                error!(%err, "could not build invite link");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}

async fn create_group(
    State(state): State<AppState>,
    Query(params): Query<CreateParams>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let names = sanitize_names(&payload.names);
    if names.len() < MIN_PARTICIPANTS {
        return Err(ApiError::TooFewNames);
    }

    let mut rng = params
        .seed
        .map(ChaCha8Rng::seed_from_u64)
        .unwrap_or_else(ChaCha8Rng::from_entropy);

    let group = santa_core::create_group(&payload.title, names, &mut rng, now_millis())?;
    let token = encode(&group).map_err(ApiError::Encode)?;
    let invite_url = invite_link(&state.public_url, &token).map_err(ApiError::InviteLink)?;

    info!(participants = group.names.len(), "group created");

    Ok((
        StatusCode::CREATED,
        Json(CreateGroupResponse {
            token,
            invite_url: invite_url.into(),
            group: GroupView::from(&group),
        }),
    ))
}

async fn get_invite(Query(query): Query<InviteQuery>) -> Result<impl IntoResponse, ApiError> {
    let token = query
        .g
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::MissingToken)?;
    let group = open_invite(&token)?;
    Ok(Json(GroupView::from(&group)))
}

async fn resolve_link(Json(payload): Json<ResolveRequest>) -> Result<impl IntoResponse, ApiError> {
    let url = Url::parse(payload.link.trim()).map_err(|_| ApiError::InvalidLink)?;
    Ok(Json(mode_for(&url)))
}

async fn reveal(
    State(state): State<AppState>,
    Json(payload): Json<RevealRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (group, key) = participant_group(&payload.g, &payload.name)?;
    let recipient = group
        .recipient_for(&payload.name)
        .ok_or(ApiError::NotInGroup)?;

    let recipient_note = state.notes.get_note(&key, recipient).await;

    Ok(Json(RevealResponse {
        name: payload.name.clone(),
        recipient: recipient.to_string(),
        recipient_note,
    }))
}

async fn get_note(
    State(state): State<AppState>,
    Query(query): Query<NoteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, key) = participant_group(&query.g, &query.name)?;
    let note = state.notes.get_note(&key, &query.name).await;
    Ok(Json(NoteResponse { note }))
}

async fn put_note(
    State(state): State<AppState>,
    Json(payload): Json<NoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, key) = participant_group(&payload.g, &payload.name)?;
    state
        .notes
        .upsert_note(&key, &payload.name, &payload.note)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Open the invite, make sure `name` is one of its participants, and return
/// the canonical token notes for this group are stored under.
fn participant_group(token: &str, name: &str) -> Result<(Group, String), ApiError> {
    let group = open_invite(token)?;
    if !group.has_participant(name) {
        return Err(ApiError::NotInGroup);
    }
    let key = canonical_token(token).ok_or(InviteError::Corrupted)?;
    Ok((group, key))
}
