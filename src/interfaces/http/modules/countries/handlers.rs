//! Country lookup handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use tracing::debug;

use super::dto::CountryListResponse;
use crate::domain::CountryDirectory;
use crate::interfaces::http::common::ApiError;
use crate::interfaces::http::middleware::AuthorizedKey;

#[derive(Clone)]
pub struct CountryHandlerState {
    pub directory: Arc<dyn CountryDirectory>,
}

#[utoipa::path(
    get,
    path = "/api/countries/name/{name}",
    tag = "Countries",
    security(("api_key" = [])),
    params(("name" = String, Path, description = "Full or partial country name")),
    responses(
        (status = 200, description = "Matching countries", body = CountryListResponse),
        (status = 401, description = "Missing, unknown, inactive or expired API key"),
        (status = 404, description = "Country not found"),
        (status = 500, description = "Error fetching country data")
    )
)]
pub async fn get_country_by_name(
    State(state): State<CountryHandlerState>,
    Extension(AuthorizedKey(key)): Extension<AuthorizedKey>,
    Path(name): Path<String>,
) -> Result<Json<CountryListResponse>, ApiError> {
    debug!(key_id = key.id, name = %name, "Country lookup");
    let countries = state.directory.find_by_name(&name).await?;
    Ok(Json(CountryListResponse::from(countries)))
}
