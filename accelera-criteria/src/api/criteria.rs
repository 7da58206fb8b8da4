//! Criteria endpoints
//!
//! - GET  /api/criteria?programId=    scoped (or full) list
//! - GET  /api/criteria/:id           one criterion
//! - POST /api/criteria               creation event from the criterion builder
//! - POST /api/criteria/refresh       pull from every feed now

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::sync::RefreshReport;
use crate::AppState;
use accelera_common::{select_for_program, Criterion, CriterionId, ProgramId, RawCriterion};

/// Program selection shared by the list and refresh endpoints
///
/// `programId` arrives as text in a query string; blank means "no program".
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    #[serde(default, rename = "programId", alias = "program_id")]
    pub program_id: Option<String>,
}

impl ScopeQuery {
    pub fn program(&self) -> Option<ProgramId> {
        self.program_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ProgramId::from)
    }
}

/// Scoped criteria list
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CriteriaListResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id: Option<ProgramId>,
    pub total: usize,
    pub criteria: Vec<Criterion>,
}

/// Creation event body
///
/// The builder sends the owning program twice, as text and as a number;
/// either may be missing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCriterionRequest {
    #[serde(default, alias = "program_id")]
    pub program_id: Option<Value>,
    #[serde(default)]
    pub program_id_num: Option<Value>,
    pub criterion: RawCriterion,
}

impl CreateCriterionRequest {
    /// Owning program: `programId`, then `programIdNum`, then the
    /// criterion's own `programId`
    pub fn resolve_program(&self) -> Option<ProgramId> {
        [
            self.program_id.as_ref(),
            self.program_id_num.as_ref(),
            self.criterion.program_id.as_ref(),
        ]
        .into_iter()
        .flatten()
        .find_map(ProgramId::from_value)
    }
}

/// GET /api/criteria?programId=
///
/// Without `programId` every known criterion is returned.
pub async fn list_criteria(
    State(state): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> Json<CriteriaListResponse> {
    let program = query.program();
    let criteria = select_for_program(&state.store.all(), program.as_ref());

    Json(CriteriaListResponse {
        program_id: program,
        total: criteria.len(),
        criteria,
    })
}

/// GET /api/criteria/:id
pub async fn get_criterion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Criterion>> {
    state
        .store
        .get(&CriterionId::from(id.as_str()))
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("Criterion {}", id)))
}

/// POST /api/criteria
///
/// Upserts the criterion, notifies subscribers (SSE clients included) and
/// persists it to the local cache. A cache write failure is logged; the
/// criterion is still live in the store.
pub async fn create_criterion(
    State(state): State<AppState>,
    Json(request): Json<CreateCriterionRequest>,
) -> Result<(StatusCode, Json<Criterion>)> {
    let program = request
        .resolve_program()
        .ok_or_else(|| Error::BadRequest("programId is required".to_string()))?;

    if !request.criterion.has_id() {
        return Err(Error::BadRequest("criterion id is required".to_string()));
    }

    let criterion = state
        .store
        .announce(program.clone(), &request.criterion)
        .ok_or_else(|| Error::Internal("criterion was not accepted".to_string()))?;

    let owner = criterion.program_id.as_ref().unwrap_or(&program);
    if let Err(e) = state.cache.remember(owner, &criterion).await {
        warn!(criterion = %criterion.id, "Failed to cache new criterion: {:#}", e);
    }

    info!(criterion = %criterion.id, program = %owner, "Criterion created");
    Ok((StatusCode::CREATED, Json(criterion)))
}

/// POST /api/criteria/refresh?programId=
pub async fn refresh_criteria(
    State(state): State<AppState>,
    Query(query): Query<ScopeQuery>,
) -> Json<RefreshReport> {
    let program = query.program();
    Json(state.sync.refresh(program.as_ref()).await)
}
