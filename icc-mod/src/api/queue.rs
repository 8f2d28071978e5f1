//! Review queue endpoint

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use icc_common::api::AdminIdentity;
use serde::{Deserialize, Serialize};

use super::auth::AuthSummary;
use crate::error::ApiError;
use crate::moderation::queue::{clamp_limit, DEFAULT_QUEUE_LIMIT, MAX_QUEUE_LIMIT};
use crate::moderation::{fetch_queue, QueueItem, QueueOptions, QueueSort, StatusFilter};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct QueueParams {
    pub status: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueueFilters {
    pub status: &'static str,
    pub sort: &'static str,
    pub limit: i64,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub ok: bool,
    pub items: Vec<QueueItem>,
    pub filters: QueueFilters,
    pub auth: AuthSummary,
}

/// Parse a numeric query parameter, ignoring garbage
pub(crate) fn parse_limit(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|l| l.trim().parse::<i64>().ok())
}

/// GET /api/admin/moderation/queue?status&sort&limit
pub async fn get_queue(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    params: Result<Query<QueueParams>, QueryRejection>,
) -> Result<Json<QueueResponse>, ApiError> {
    let Query(params) = params?;

    let options = QueueOptions {
        status: StatusFilter::from_param(params.status.as_deref())?,
        sort: QueueSort::from_param(params.sort.as_deref()),
        limit: clamp_limit(
            parse_limit(params.limit.as_deref()),
            DEFAULT_QUEUE_LIMIT,
            MAX_QUEUE_LIMIT,
        ),
    };

    let items = fetch_queue(&state.db, &options).await?;

    Ok(Json(QueueResponse {
        ok: true,
        items,
        filters: QueueFilters {
            status: options.status.as_str(),
            sort: options.sort.as_str(),
            limit: options.limit,
        },
        auth: AuthSummary::from(&admin),
    }))
}
