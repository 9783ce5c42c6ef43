use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::analytics::{
    aggregate, endpoint_slice, enrich_countries, session_summary, with_geo_database,
    AggregateResult, DurationSummary, EndpointSlice, EnrichmentStats, LogFilter, PredictError,
    TrendModel,
};
use crate::logs::LogGenerator;
use crate::models::{format_timestamp, LogTable};
use crate::storage::{write_csv, LoadedTable, LogStore, StorageError, TableCache};

pub struct AppState {
    pub store: LogStore,
    pub cache: TableCache,
    pub generator: Mutex<LogGenerator>,
    pub batch_size: usize,
    pub max_batch_size: usize,
    pub geoip_db: Option<PathBuf>,
    pub split_seed: u64,
}

impl AppState {
    /// Current table; a file with missing columns reads as empty
    fn load(&self) -> Result<Arc<LoadedTable>, ApiError> {
        Ok(self.cache.load_lenient(&self.store)?)
    }
}

/// Run file and GeoIP database work on the blocking pool
async fn blocking<T, F>(state: &Arc<AppState>, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppState) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || work(&state))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("Blocking task failed")))?
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

pub enum ApiError {
    Storage(StorageError),
    Predict(PredictError),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Storage(e)
    }
}

impl From<PredictError> for ApiError {
    fn from(e: PredictError) -> Self {
        ApiError::Predict(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Storage(e @ StorageError::NotFound(_)) => (StatusCode::NOT_FOUND, e.to_string()),
            ApiError::Storage(e) => {
                tracing::error!("Log table failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Predict(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

pub async fn index() -> &'static str {
    "Welcome to the Web Server Log Analysis API!"
}

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn analyze() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "API key authorized.".to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    /// Trim the view to the first `limit` records
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct LogsResponse {
    pub records: LogTable,
    pub total: usize,
    pub loaded_at: String,
}

fn trimmed(loaded: &LoadedTable, limit: Option<usize>) -> LogTable {
    match limit {
        Some(n) => loaded.table.head(n),
        None => loaded.table.clone(),
    }
}

/// Raw log records, optionally trimmed
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let response = blocking(&state, move |state| {
        let loaded = state.load()?;
        Ok(LogsResponse {
            total: loaded.table.len(),
            records: trimmed(&loaded, params.limit),
            loaded_at: format_timestamp(&loaded.loaded_at),
        })
    })
    .await?;
    Ok(Json(response))
}

/// The (optionally trimmed) table as a CSV download
pub async fn export_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogsQuery>,
) -> Result<Response, ApiError> {
    let body = blocking(&state, move |state| {
        let loaded = state.load()?;
        let mut body = Vec::new();
        write_csv(&trimmed(&loaded, params.limit), &mut body)?;
        Ok(body)
    })
    .await?;

    let file_name = if params.limit.is_some() {
        "trimmed_logs.csv"
    } else {
        "web_server_logs.csv"
    };
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    pub count: Option<usize>,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub appended: usize,
    pub message: String,
}

/// Generate a batch of synthetic records and append it to the table
pub async fn generate_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GenerateQuery>,
) -> Result<(StatusCode, Json<GenerateResponse>), ApiError> {
    let count = params.count.unwrap_or(state.batch_size);
    if count == 0 {
        return Err(ApiError::BadRequest("count must be positive".to_string()));
    }
    if count > state.max_batch_size {
        return Err(ApiError::BadRequest(format!(
            "count must not exceed {}",
            state.max_batch_size
        )));
    }

    let appended = blocking(&state, move |state| {
        let batch = {
            let mut generator = state
                .generator
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            generator.generate(count)
        };
        Ok(state.cache.append(&state.store, &batch)?)
    })
    .await?;
    tracing::info!(appended, "Generated and stored synthetic logs");

    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            appended,
            message: "Log files generated successfully.".to_string(),
        }),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct AggregateQuery {
    /// Comma-separated selections; empty means no filter
    pub countries: Option<String>,
    pub sports_activities: Option<String>,
    pub endpoints: Option<String>,
    pub devices: Option<String>,
    pub browsers: Option<String>,
    /// Re-resolve countries from IP addresses before aggregating
    #[serde(default)]
    pub enrich: bool,
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl AggregateQuery {
    fn filter(&self) -> LogFilter {
        LogFilter {
            countries: split_list(self.countries.as_deref()),
            sports_activities: split_list(self.sports_activities.as_deref()),
            endpoints: split_list(self.endpoints.as_deref()),
            devices: split_list(self.devices.as_deref()),
            browsers: split_list(self.browsers.as_deref()),
        }
    }
}

#[derive(Serialize)]
pub struct AggregateResponse {
    #[serde(flatten)]
    pub result: AggregateResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentStats>,
}

/// Grouped counts and duration statistics over the filtered table
pub async fn get_aggregate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AggregateQuery>,
) -> Result<Json<AggregateResponse>, ApiError> {
    if params.enrich && state.geoip_db.is_none() {
        return Err(ApiError::BadRequest(
            "GeoIP database is not configured".to_string(),
        ));
    }

    let response = blocking(&state, move |state| {
        let loaded = state.load()?;
        let mut table = loaded.table.clone();

        let enrichment = match state.geoip_db.as_ref() {
            Some(db_path) if params.enrich => Some(with_geo_database(db_path, |geoip| {
                enrich_countries(&mut table, geoip)
            })?),
            _ => None,
        };

        let filtered = params.filter().apply(&table);
        Ok(AggregateResponse {
            result: aggregate(&filtered),
            enrichment,
        })
    })
    .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct EndpointQuery {
    pub endpoint: String,
}

/// Visit count and sqrt spread for a single endpoint
pub async fn get_endpoint_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EndpointQuery>,
) -> Result<Json<EndpointSlice>, ApiError> {
    let slice = blocking(&state, move |state| {
        let loaded = state.load()?;
        Ok(endpoint_slice(&loaded.table, &params.endpoint))
    })
    .await?;
    Ok(Json(slice))
}

/// Duration summary with durations recomputed per IP session
pub async fn get_session_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DurationSummary>, ApiError> {
    let summary = blocking(&state, |state| {
        let loaded = state.load()?;
        Ok(session_summary(&loaded.table))
    })
    .await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    pub hour: i64,
}

#[derive(Serialize)]
pub struct PredictResponse {
    pub hour: i64,
    pub predicted_duration: f64,
    pub model: TrendModel,
}

/// Fit the trend model on the current table and predict for one hour
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PredictQuery>,
) -> Result<Json<PredictResponse>, ApiError> {
    let hour = params.hour;
    let response = blocking(&state, move |state| {
        let loaded = state.load()?;
        let model = TrendModel::fit_with_seed(&loaded.table, state.split_seed)?;
        let predicted_duration = model.predict(hour)?;
        Ok(PredictResponse {
            hour,
            predicted_duration,
            model,
        })
    })
    .await?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(Some("Chile, Peru,,")),
            vec!["Chile".to_string(), "Peru".to_string()]
        );
        assert!(split_list(None).is_empty());
        assert!(split_list(Some("")).is_empty());
    }
}
