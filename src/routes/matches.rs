use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::core::{MatchOptions, MatchPipeline};
use crate::error::MatchError;
use crate::models::{HealthResponse, MatchRequest, UploadQuery};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: MatchPipeline,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/resumes/embed", web::post().to(embed_resume))
        .route("/matches", web::post().to(find_matches))
        .route("/matches/upload", web::post().to(upload_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        index: state.pipeline.index_name().to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Extract, analyse and embed a resume file
///
/// POST /api/v1/resumes/embed?filename=resume.pdf
///
/// Body: raw file bytes
async fn embed_resume(
    state: web::Data<AppState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, MatchError> {
    validate(&*query)?;
    tracing::info!("Embedding resume {} ({} bytes)", query.filename, body.len());

    let response = state.pipeline.embed_document(&query.filename, &body).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Match resume text against the job index
///
/// POST /api/v1/matches
///
/// Request body:
/// ```json
/// {
///   "resume_text": "string",
///   "filename": "resume.pdf",
///   "resume_metadata": { "preferred_location": "Remote" },
///   "top_k": 10,
///   "similarity_threshold": 0.5
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<MatchRequest>,
) -> Result<HttpResponse, MatchError> {
    validate(&*req)?;

    let req = req.into_inner();
    let options = MatchOptions {
        top_k: req.top_k,
        similarity_threshold: req.similarity_threshold,
    };

    let response = state
        .pipeline
        .run_text(
            &req.resume_text,
            req.filename.as_deref(),
            req.format,
            req.resume_metadata,
            options,
        )
        .await?;

    Ok(HttpResponse::Ok().json(response))
}

/// Match an uploaded resume file against the job index
///
/// POST /api/v1/matches/upload?filename=resume.pdf&top_k=10
///
/// Body: raw file bytes
async fn upload_matches(
    state: web::Data<AppState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, MatchError> {
    validate(&*query)?;

    let options = MatchOptions {
        top_k: query.top_k,
        similarity_threshold: query.similarity_threshold,
    };

    let response = state
        .pipeline
        .run_document(&query.filename, &body, options)
        .await?;

    Ok(HttpResponse::Ok().json(response))
}

fn validate<T: Validate>(req: &T) -> Result<(), MatchError> {
    req.validate().map_err(|errors| {
        tracing::info!("Validation failed: field_errors={:?}", errors);
        MatchError::invalid_request(errors.to_string())
    })
}
