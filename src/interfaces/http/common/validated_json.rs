//! JSON body extractor with `validator` checks
//!
//! Bad JSON and failed validation both answer 400 with the usual
//! `ApiResponse` envelope, so clients see one error shape for every
//! malformed request body.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use super::ApiResponse;

/// Like `axum::Json<T>`, but the value has passed `Validate::validate()`.
pub struct ValidatedJson<T>(pub T);

pub enum ValidatedJsonRejection {
    Json(JsonRejection),
    Invalid(ValidationErrors),
}

/// `field: message` pairs, sorted by field so the text is stable.
fn describe(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{}: {}", field, msg),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    messages.sort();

    if messages.is_empty() {
        "Validation failed".to_string()
    } else {
        messages.join("; ")
    }
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        let message = match self {
            Self::Json(rejection) => format!("Invalid JSON: {}", rejection.body_text()),
            Self::Invalid(errors) => describe(&errors),
        };
        (StatusCode::BAD_REQUEST, Json(ApiResponse::<()>::error(message))).into_response()
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::Json)?;

        value.validate().map_err(ValidatedJsonRejection::Invalid)?;

        Ok(ValidatedJson(value))
    }
}
