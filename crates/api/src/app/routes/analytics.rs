//! Trend, breakdown and dashboard summary passthrough.
//!
//! Open to every signed-in profile; the aggregates carry no patient data.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use ipcwatch_infra::analytics::{aggregatable_tables, common_categories};
use ipcwatch_infra::{AnalyticsKind, AnalyticsRequest, DateRange};

use crate::app::{errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", get(catalog))
        .route("/trends", get(trends))
        .route("/breakdown", get(breakdown))
        .route("/summary", get(summary))
}

/// GET /analytics - tables and shared category columns
pub async fn catalog() -> Response {
    Json(json!({
        "tables": aggregatable_tables(),
        "common_categories": common_categories(),
    }))
    .into_response()
}

/// GET /analytics/trends?start_date&end_date&table&column
pub async fn trends(
    Extension(services): Extension<Arc<AppServices>>,
    Query(request): Query<AnalyticsRequest>,
) -> Response {
    run(&services, AnalyticsKind::Trend, &request).await
}

/// GET /analytics/breakdown?start_date&end_date&table&column
pub async fn breakdown(
    Extension(services): Extension<Arc<AppServices>>,
    Query(request): Query<AnalyticsRequest>,
) -> Response {
    run(&services, AnalyticsKind::Breakdown, &request).await
}

/// GET /analytics/summary?start_date&end_date
pub async fn summary(
    Extension(services): Extension<Arc<AppServices>>,
    Query(range): Query<DateRange>,
) -> Response {
    match services.analytics.summary(&range).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => errors::analytics_error(e),
    }
}

async fn run(services: &AppServices, kind: AnalyticsKind, request: &AnalyticsRequest) -> Response {
    match services.analytics.run(kind, request).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => errors::analytics_error(e),
    }
}
