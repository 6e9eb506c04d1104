//! Insight handlers - document analysis and retrieval

use axum::extract::{Extension, Multipart, Path};
use axum::Json;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use tracing::{error, info, warn};

use super::models::{AnalysisResult, Insight, InsightDetail, InsightSummary, LatestInsightResponse};
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};
use crate::services::ai::AiError;
use crate::services::{pdf, prompt};

/// POST /api/v1/insights/process
/// Runs the analysis pipeline for an uploaded resume and job description,
/// persists the result, and returns the full insight detail
///
/// Multipart fields: `resumeFile` (optional PDF), `jobTitle`, `jobDescription`
pub async fn process_documents(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    mut multipart: Multipart,
) -> Result<Json<InsightDetail>, ApiError> {
    let state = state_lock.read().await.clone();

    let mut resume: Option<(Vec<u8>, String)> = None;
    let mut job_title = String::new();
    let mut job_description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart request: {}", e)))?
    {
        let name = match field.name() {
            Some(n) => n.to_string(),
            None => continue,
        };
        match name.as_str() {
            "resumeFile" => {
                let filename = field.file_name().unwrap_or("resume.pdf").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid resume file".to_string()))?;
                resume = Some((data.to_vec(), filename));
            }
            "jobTitle" => {
                job_title = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid jobTitle field".to_string()))?;
            }
            "jobDescription" => {
                job_description = field.text().await.map_err(|_| {
                    ApiError::BadRequest("Invalid jobDescription field".to_string())
                })?;
            }
            _ => {}
        }
    }

    if job_title.trim().is_empty() {
        return Err(ApiError::BadRequest("jobTitle is required".to_string()));
    }

    let resume_is_empty = resume.as_ref().map_or(true, |(data, _)| data.is_empty());
    if resume_is_empty && job_description.trim().is_empty() {
        warn!(user_id = %authed.id, "Process request with neither resume nor job description");
        return Err(ApiError::BadRequest(
            "Resume file or job description must be provided.".to_string(),
        ));
    }

    info!(
        user_id = %authed.id,
        job_title = %job_title,
        has_resume = !resume_is_empty,
        "Received analysis request"
    );

    // Text extraction is CPU-bound, keep it off the async workers
    let (resume_text, resume_filename) = match resume {
        Some((data, filename)) if !data.is_empty() => {
            let name_for_task = filename.clone();
            let text = tokio::task::spawn_blocking(move || {
                pdf::extract_resume_text(&data, &name_for_task)
            })
            .await
            .map_err(|e| {
                error!(error = %e, "PDF extraction task failed to complete");
                ApiError::InternalServer("Resume processing failed".to_string())
            })?
            .map_err(|e| {
                warn!(error = %e, filename = %filename, "Failed to extract resume text");
                ApiError::BadRequest(format!("Error processing resume file: {}", e))
            })?;
            (text, Some(filename))
        }
        _ => {
            warn!(user_id = %authed.id, "No resume file provided, proceeding without resume text");
            (String::new(), None)
        }
    };

    let analysis_prompt = prompt::build_prompt(&job_title, &job_description, &resume_text);

    let analysis = state.ai_service.analyze(&analysis_prompt).await.map_err(map_ai_error)?;

    info!(
        user_id = %authed.id,
        match_score = ?analysis.match_score,
        ats_score = ?analysis.ats_score,
        "AI analysis complete"
    );

    let row = insert_insight(
        &state.db,
        &authed.id,
        job_title.trim(),
        resume_filename.as_deref(),
        &analysis,
    )
    .await
    .map_err(ApiError::DatabaseError)?;

    info!(user_id = %authed.id, insight_id = %row.id, "Insight saved");

    Ok(Json(InsightDetail {
        id: row.id,
        job_title: row.job_title,
        resume_filename: row.resume_filename,
        created_at: row.created_at,
        match_score: row.match_score,
        ats_score: row.ats_score,
        analysis_result: analysis,
    }))
}

/// GET /api/v1/insights/history
/// Lists the caller's insights, newest first
pub async fn get_insights_history(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Vec<InsightSummary>>, ApiError> {
    let state = state_lock.read().await.clone();

    let rows = fetch_history(&state.db, &authed.id)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(Json(rows.into_iter().map(InsightSummary::from).collect()))
}

/// GET /api/v1/insights/latest
/// Returns the id of the caller's most recent insight, or null
pub async fn get_latest_insight(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<LatestInsightResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let latest = fetch_latest(&state.db, &authed.id)
        .await
        .map_err(ApiError::DatabaseError)?;

    Ok(Json(LatestInsightResponse {
        latest_insight_id: latest.map(|row| row.id),
    }))
}

/// GET /api/v1/insights/:id
/// Returns one insight; 404 when absent or owned by a different user
pub async fn get_insight_by_id(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(id): Path<String>,
) -> Result<Json<InsightDetail>, ApiError> {
    let state = state_lock.read().await.clone();

    let row = fetch_by_id_and_user(&state.db, &id, &authed.id)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| {
            warn!(insight_id = %id, user_id = %authed.id, "Insight not found or not owned by user");
            ApiError::NotFound("Insight not found".to_string())
        })?;

    let analysis: AnalysisResult = serde_json::from_str(&row.analysis_result).map_err(|e| {
        error!(error = %e, insight_id = %row.id, "Stored analysis payload failed to parse");
        ApiError::InternalServer("Stored analysis result is unreadable".to_string())
    })?;

    Ok(Json(InsightDetail {
        id: row.id,
        job_title: row.job_title,
        resume_filename: row.resume_filename,
        created_at: row.created_at,
        match_score: row.match_score,
        ats_score: row.ats_score,
        analysis_result: analysis,
    }))
}

fn map_ai_error(err: AiError) -> ApiError {
    match err {
        AiError::NotConfigured => {
            ApiError::ServiceUnavailable("AI analysis service is not configured".to_string())
        }
        AiError::RequestFailed(msg) => {
            error!(error = %msg, "AI analysis request failed");
            ApiError::InternalServer("AI analysis failed".to_string())
        }
        AiError::InvalidResponse(msg) => {
            error!(error = %msg, "AI analysis response was unusable");
            ApiError::InternalServer(
                "Analysis completed but failed to produce a structured result".to_string(),
            )
        }
    }
}

// ---- Queries ----

pub(crate) async fn insert_insight(
    pool: &SqlitePool,
    user_id: &str,
    job_title: &str,
    resume_filename: Option<&str>,
    analysis: &AnalysisResult,
) -> Result<Insight, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    let payload = serde_json::to_string(analysis).unwrap_or_else(|_| "{}".to_string());

    sqlx::query(
        r#"
        INSERT INTO insights (id, user_id, job_title, resume_filename, match_score, ats_score,
                              analysis_result, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(job_title)
    .bind(resume_filename)
    .bind(analysis.match_score)
    .bind(analysis.ats_score)
    .bind(&payload)
    .bind(&now)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Insight>("SELECT * FROM insights WHERE id = ?")
        .bind(&id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn fetch_history(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<Insight>, sqlx::Error> {
    sqlx::query_as::<_, Insight>(
        "SELECT * FROM insights WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn fetch_latest(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<Insight>, sqlx::Error> {
    sqlx::query_as::<_, Insight>(
        "SELECT * FROM insights WHERE user_id = ? ORDER BY created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn fetch_by_id_and_user(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<Insight>, sqlx::Error> {
    sqlx::query_as::<_, Insight>("SELECT * FROM insights WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}
