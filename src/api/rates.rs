use std::sync::Arc;

use crate::{api::AppState, api::error::ApiResult};
use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct DifferenceQuery {
    pub symb: Option<String>,
    pub date_one: Option<String>,
    #[serde(alias = "date_two")]
    pub date_second: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DifferenceResponse {
    #[serde(rename = "Название")]
    pub name: String,
    #[serde(rename = "Первый обменный курс")]
    pub first_rate: f64,
    #[serde(rename = "Второй обменный курс")]
    pub second_rate: f64,
    #[serde(rename = "Разница")]
    pub difference: f64,
}

/// All currencies as `[["USD", "Доллар США"], ...]`, in catalog order.
async fn list_currency(State(state): State<Arc<AppState>>) -> Json<Vec<(String, String)>> {
    info!("Listing {} currencies", state.catalog.len());
    Json(state.catalog.list_all())
}

async fn exchange_rate_difference(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DifferenceQuery>,
) -> ApiResult<Json<DifferenceResponse>> {
    info!(?query, "Exchange rate difference requested");

    // Missing parameters fall through to NotFound / MalformedInput
    let result = state
        .resolver
        .difference_for_symbol(
            &state.catalog,
            query.symb.as_deref().unwrap_or_default(),
            query.date_one.as_deref().unwrap_or_default(),
            query.date_second.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(DifferenceResponse {
        name: result.display_name,
        first_rate: result.pair.first_rate,
        second_rate: result.pair.second_rate,
        difference: result.pair.difference,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/list_currency", get(list_currency))
        .route("/api/exchange_rate_difference", get(exchange_rate_difference))
}
