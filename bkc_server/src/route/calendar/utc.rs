use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use bkc_core::{Config, TimestampStyle};

use crate::{
    route::calendar::{handle, QueryParams},
    AppState,
};

fn config(query_params: &QueryParams, state: &AppState) -> Config {
    Config {
        timestamp_style: TimestampStyle::Utc,
        ..query_params.config(state)
    }
}

/// The calendar with every time converted to UTC, for clients without `VTIMEZONE` support.
pub async fn handler(
    State(state): State<Arc<AppState>>,
    Query(query_params): Query<QueryParams>,
) -> Result<Response, (StatusCode, String)> {
    let config = config(&query_params, &state);
    handle(state, config).await
}
