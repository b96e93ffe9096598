use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::composer::binder::FormView;
use crate::composer::index::{ControlId, RemoveControl};
use crate::composer::{request_suggestion, Command, ComposerStatus, Outcome};
use crate::errors::AppError;
use crate::image::to_data_url;
use crate::models::{Record, Section};
use crate::render::Style;
use crate::state::AppState;
use crate::suggestion::SuggestionStatus;

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub control: ControlId,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ControlRequest {
    pub control: ControlId,
}

#[derive(Debug, Deserialize)]
pub struct StyleRequest {
    pub style: Style,
}

#[derive(Debug, Deserialize)]
pub struct StyleQuery {
    pub style: Option<Style>,
}

#[derive(Debug, Deserialize)]
pub struct GenerationQuery {
    pub generation: u64,
}

/// Every mutating endpoint answers with the pipeline outcome and the
/// freshly rendered preview.
#[derive(Debug, Serialize)]
pub struct MutationResponse {
    #[serde(flatten)]
    pub outcome: Outcome,
    pub preview: String,
}

#[derive(Debug, Serialize)]
pub struct SuggestionEntry {
    pub control: ControlId,
    pub status: SuggestionStatus,
}

async fn apply(state: &AppState, command: Command) -> Result<Json<MutationResponse>, AppError> {
    let mut composer = state.composer.lock().await;
    let outcome = composer.dispatch(command)?;
    Ok(Json(MutationResponse {
        outcome,
        preview: composer.preview().to_string(),
    }))
}

fn parse_section(raw: &str) -> Result<Section, AppError> {
    raw.parse::<Section>()
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// GET /api/v1/form
pub async fn handle_get_form(State(state): State<AppState>) -> Json<FormView> {
    Json(state.composer.lock().await.form())
}

/// GET /api/v1/record
pub async fn handle_get_record(State(state): State<AppState>) -> Json<Record> {
    Json(state.composer.lock().await.record().clone())
}

/// GET /api/v1/preview?style=
pub async fn handle_get_preview(
    State(state): State<AppState>,
    Query(query): Query<StyleQuery>,
) -> Html<String> {
    let composer = state.composer.lock().await;
    match query.style {
        Some(style) => Html(composer.preview_as(style)),
        None => Html(composer.preview().to_string()),
    }
}

/// GET /api/v1/status
pub async fn handle_get_status(State(state): State<AppState>) -> Json<ComposerStatus> {
    Json(state.composer.lock().await.status())
}

/// POST /api/v1/fields
pub async fn handle_edit(
    State(state): State<AppState>,
    Json(req): Json<EditRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(
        &state,
        Command::Edit {
            control: req.control,
            value: req.value,
        },
    )
    .await
}

/// POST /api/v1/sections/:section/entries
pub async fn handle_add_entry(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Result<Json<MutationResponse>, AppError> {
    let section = parse_section(&section)?;
    apply(&state, Command::AddEntry { section }).await
}

/// DELETE /api/v1/sections/:section/entries/:ordinal?generation=
pub async fn handle_remove_entry(
    State(state): State<AppState>,
    Path((section, ordinal)): Path<(String, usize)>,
    Query(query): Query<GenerationQuery>,
) -> Result<Json<MutationResponse>, AppError> {
    let control = RemoveControl {
        section: parse_section(&section)?,
        ordinal,
        generation: query.generation,
    };
    apply(&state, Command::RemoveEntry { control }).await
}

/// PUT /api/v1/style
pub async fn handle_set_style(
    State(state): State<AppState>,
    Json(req): Json<StyleRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(&state, Command::SetStyle { style: req.style }).await
}

/// POST /api/v1/profile-picture (multipart, first file field)
pub async fn handle_profile_picture(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MutationResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.file_name().is_none() && field.name() != Some("image") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        let data_url = to_data_url(&content_type, &data)?;
        return apply(&state, Command::SetProfilePicture { data_url }).await;
    }
    Err(AppError::Validation(
        "Multipart body contains no image file".to_string(),
    ))
}

/// POST /api/v1/reset
pub async fn handle_reset(State(state): State<AppState>) -> Result<Json<MutationResponse>, AppError> {
    apply(&state, Command::Reset).await
}

/// POST /api/v1/reload
pub async fn handle_reload(
    State(state): State<AppState>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(&state, Command::Reload).await
}

/// POST /api/v1/suggestions
pub async fn handle_request_suggestion(
    State(state): State<AppState>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<SuggestionStatus>, AppError> {
    let status = request_suggestion(
        state.composer.clone(),
        state.improver.clone(),
        req.control,
        state.config.suggestion_timeout,
    )
    .await?;
    Ok(Json(status))
}

/// GET /api/v1/suggestions
pub async fn handle_list_suggestions(State(state): State<AppState>) -> Json<Vec<SuggestionEntry>> {
    let composer = state.composer.lock().await;
    Json(
        composer
            .suggestion_statuses()
            .into_iter()
            .map(|(control, status)| SuggestionEntry { control, status })
            .collect(),
    )
}

/// POST /api/v1/suggestions/accept
pub async fn handle_accept_suggestion(
    State(state): State<AppState>,
    Json(req): Json<ControlRequest>,
) -> Result<Json<MutationResponse>, AppError> {
    apply(
        &state,
        Command::AcceptSuggestion {
            control: req.control,
        },
    )
    .await
}

/// POST /api/v1/suggestions/dismiss
pub async fn handle_dismiss_suggestion(
    State(state): State<AppState>,
    Json(req): Json<ControlRequest>,
) -> Json<SuggestionStatus> {
    let mut composer = state.composer.lock().await;
    composer.dismiss_suggestion(&req.control);
    Json(composer.suggestion_status(&req.control))
}

/// POST /api/v1/suggestions/copy — plain-text candidate for the clipboard.
pub async fn handle_copy_suggestion(
    State(state): State<AppState>,
    Json(req): Json<ControlRequest>,
) -> Result<String, AppError> {
    Ok(state.composer.lock().await.copy_suggestion(&req.control)?)
}

/// GET /api/v1/export?style=
pub async fn handle_export(
    State(state): State<AppState>,
    Query(query): Query<StyleQuery>,
) -> Result<Response, AppError> {
    let (markup, style, title) = {
        let composer = state.composer.lock().await;
        let style = query.style.unwrap_or(composer.style());
        (
            composer.preview_as(style),
            style,
            composer.record().personal_details.name.clone(),
        )
    };
    let doc = state.exporter.export(&markup, style, &title)?;
    Ok((
        [
            (header::CONTENT_TYPE, doc.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", doc.filename),
            ),
        ],
        doc.body,
    )
        .into_response())
}
