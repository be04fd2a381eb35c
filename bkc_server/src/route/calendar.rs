pub mod utc;

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use bkc_core::{
    chrono::Utc, generate, load_records, Config, LocationFields, SortPolicy, TimestampStyle,
};
use log::{error, info};
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    sort: SortPolicy,
    #[serde(default)]
    include_region: bool,
    #[serde(default)]
    include_country: bool,
    #[serde(default)]
    plain_descriptions: bool,
    #[serde(default)]
    utc: bool,
}

impl From<&QueryParams> for LocationFields {
    fn from(value: &QueryParams) -> Self {
        let mut location_fields = LocationFields::standard();
        if value.include_region {
            location_fields |= LocationFields::Region;
        }
        if value.include_country {
            location_fields |= LocationFields::Country;
        }
        location_fields
    }
}

impl QueryParams {
    fn config(&self, state: &AppState) -> Config {
        Config {
            default_utc_offset: state.default_utc_offset,
            sort_policy: self.sort,
            location_fields: LocationFields::from(self),
            plain_descriptions: self.plain_descriptions,
            timestamp_style: if self.utc {
                TimestampStyle::Utc
            } else {
                TimestampStyle::Local
            },
            ..Config::default()
        }
    }
}

/// Read the records and build the calendar document.
pub async fn calendar(
    state: Arc<AppState>,
    config: Config,
) -> Result<String, (StatusCode, String)> {
    let generated = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let records = load_records(&state.records)?;
        Ok(generate(records, &config, Utc::now())?)
    })
    .await
    .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?
    .map_err(|err| {
        error!("failed to generate the calendar: {err:#}");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    })?;
    info!("serving calendar: {}", generated.diagnostics);
    Ok(generated.document)
}

pub async fn handle(
    state: Arc<AppState>,
    config: Config,
) -> Result<Response, (StatusCode, String)> {
    let document = calendar(state, config).await?;
    let response = ([(CONTENT_TYPE, "text/calendar; charset=utf-8")], document).into_response();
    Ok(response)
}

/// Handle calendar requests.
///
/// All query parameters are optional.
pub async fn handler(
    State(state): State<Arc<AppState>>,
    Query(query_params): Query<QueryParams>,
) -> Result<Response, (StatusCode, String)> {
    let config = query_params.config(&state);
    handle(state, config).await
}
