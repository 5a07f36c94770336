use axum::extract::State;
use axum::Json;

use stride_db::AnalyticsSummary;

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// `GET /api/admin/analytics/summary`
pub async fn summary(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> ApiResult<Json<AnalyticsSummary>> {
    Ok(Json(state.db.analytics().summary().await?))
}
