//! Search API endpoints.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::{current_revision, error, success, ApiResult};
use crate::models::JobPosting;
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub job: JobPosting,
    pub score: f32,
}

/// GET /api/search - Search job postings.
pub async fn search_jobs(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let revision_id = current_revision(&state).await;
    let limit = params.limit.min(MAX_SEARCH_LIMIT);

    let hits = match state.search.search(&params.q, limit, params.offset) {
        Ok(hits) => hits,
        Err(e) => return error(e, revision_id),
    };

    // Hits whose job vanished since indexing are dropped.
    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        if let Ok(Some(job)) = state.repo.get_job(&hit.job_id).await {
            results.push(SearchResultItem {
                job,
                score: hit.score,
            });
        }
    }

    success(
        SearchResponse {
            total: results.len(),
            results,
            limit,
            offset: params.offset,
        },
        revision_id,
    )
}
