use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    domain::{ContactForm, NewSubmission, ValidationErrors},
    email_client::RelayError,
    startup::AppState,
};

/// Body of every JSON answer the contact endpoint gives.
#[derive(Serialize, Debug)]
pub struct ContactResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContactResponse {
    fn failure(message: &'static str) -> Self {
        Self {
            success: false,
            message,
            errors: None,
            error: None,
        }
    }
}

#[tracing::instrument(
    name = "Accepting a contact form submission",
    skip(payload, app_state)
)]
pub async fn submit_contact_form(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ContactForm>, JsonRejection>,
) -> Result<impl IntoResponse, ContactFailure> {
    relay_submission(&app_state, payload)
        .await
        .map_err(|error| ContactFailure {
            error,
            expose_details: app_state.expose_error_details,
        })?;

    Ok(Json(ContactResponse {
        success: true,
        message: "Form submitted successfully",
        errors: None,
        error: None,
    }))
}

async fn relay_submission(
    app_state: &AppState,
    payload: Result<Json<ContactForm>, JsonRejection>,
) -> Result<(), ContactError> {
    let Json(form) = payload?;
    tracing::info!(
        submitter_first_name = ?form.first_name,
        submitter_last_name = ?form.last_name,
        submitter_email = ?form.email,
        "Received form submission"
    );

    let submission: NewSubmission = form.try_into().map_err(ContactError::Validation)?;
    app_state.email_client.send_submission(&submission).await?;
    Ok(())
}

/// Empty 200 for CORS preflight, whatever the request carried.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ContactResponse::failure("Method not allowed")),
    )
}

#[derive(thiserror::Error, Debug)]
pub enum ContactError {
    #[error("validation error, {0}")]
    Validation(ValidationErrors),
    #[error("invalid request body, {0}")]
    InvalidBody(#[from] JsonRejection),
    #[error("couldn't relay the submission, {0}")]
    Relay(#[from] RelayError),
}

/// A [`ContactError`] together with whether its detail may reach the client.
#[derive(Debug)]
pub struct ContactFailure {
    pub error: ContactError,
    pub expose_details: bool,
}

impl IntoResponse for ContactFailure {
    fn into_response(self) -> Response {
        let detail = self.expose_details.then(|| self.error.to_string());
        match self.error {
            ContactError::Validation(errors) => {
                tracing::warn!("Rejected contact form submission: {}", errors);
                let body = ContactResponse {
                    errors: Some(errors),
                    ..ContactResponse::failure("Validation error")
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ContactError::InvalidBody(e) => {
                tracing::warn!("Rejected unreadable contact form body: {}", e);
                let body = ContactResponse {
                    error: detail,
                    ..ContactResponse::failure("Invalid request body")
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ContactError::Relay(e) => {
                if e.is_configuration_error() {
                    tracing::error!("Email configuration error: {}", e);
                } else {
                    tracing::error!("Error processing contact form: {}", e);
                }
                let body = ContactResponse {
                    error: detail,
                    ..ContactResponse::failure(
                        "An error occurred while processing your request",
                    )
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
