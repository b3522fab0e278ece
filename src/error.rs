use std::borrow::Cow;

use aide::OperationOutput;
use axum::{
	body::Body,
	extract::rejection::{JsonRejection, PathRejection, QueryRejection},
	http::{Response, StatusCode},
	response::IntoResponse,
	Json,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::{session::SessionError, store::StoreError};

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message {
	/// A human-readable description of what went wrong.
	pub message: Cow<'static, str>,
	/// Per-field problems, for requests that failed validation.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub errors: Vec<FieldError>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct FieldError {
	pub field: Cow<'static, str>,
	pub message: Cow<'static, str>,
}

impl Message {
	pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
		Self {
			message: message.into(),
			errors: Vec::new(),
		}
	}
}

/// Describes how a route-specific error is presented to the client.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	/// The message sent to the client. Defaults to the `Display` output.
	fn message(&self) -> Cow<'static, str> {
		self.to_string().into()
	}
}

/// Failures shared by every route: rejected input and storage errors.
///
/// The Display output is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] JsonRejection),
	#[error("query error: {0}")]
	Query(#[from] QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] PathRejection),
	#[error("store error: {0}")]
	Store(#[from] StoreError),
	#[error("session error: {0}")]
	Session(SessionError),
}

impl From<SessionError> for AppError {
	fn from(error: SessionError) -> Self {
		match error {
			SessionError::Store(error) => Self::Store(error),
			error => Self::Session(error),
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		let (status, message) = match self {
			Self::Validation(errors) => (
				StatusCode::BAD_REQUEST,
				Message {
					message: "invalid request".into(),
					errors: errors
						.field_errors()
						.into_iter()
						.flat_map(|(field, errors)| {
							errors.iter().map(move |error| FieldError {
								field: field.to_string().into(),
								message: error
									.message
									.clone()
									.unwrap_or_else(|| error.code.clone()),
							})
						})
						.collect(),
				},
			),
			// every malformed request is a 400, whichever layer caught it
			Self::Json(rejection) => (StatusCode::BAD_REQUEST, Message::new(rejection.body_text())),
			Self::Query(rejection) => (StatusCode::BAD_REQUEST, Message::new(rejection.body_text())),
			Self::Path(rejection) => (StatusCode::BAD_REQUEST, Message::new(rejection.body_text())),
			Self::Store(StoreError::Conflict(constraint)) => {
				tracing::info!(%constraint, "unhandled unique violation");
				(StatusCode::CONFLICT, Message::new("conflict"))
			}
			Self::Store(StoreError::MissingReference) => {
				(StatusCode::NOT_FOUND, Message::new("not found"))
			}
			Self::Store(StoreError::Database(error)) => {
				tracing::error!(%error, "storage failure");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					Message::new("internal server error"),
				)
			}
			Self::Session(error) => {
				tracing::error!(%error, "failed to start session");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					Message::new("internal server error"),
				)
			}
		};

		(status, Json(message)).into_response()
	}
}

/// Error returned by route handlers: either a shared [`AppError`] or
/// the route group's own error type.
#[derive(Debug)]
pub enum RouteError<T> {
	App(AppError),
	Route(T),
}

impl<T: ErrorShape> From<T> for RouteError<T> {
	fn from(error: T) -> Self {
		Self::Route(error)
	}
}

impl<T> From<AppError> for RouteError<T> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<T> From<StoreError> for RouteError<T> {
	fn from(error: StoreError) -> Self {
		Self::App(AppError::Store(error))
	}
}

impl<T> From<SessionError> for RouteError<T> {
	fn from(error: SessionError) -> Self {
		Self::App(AppError::from(error))
	}
}

impl<T: ErrorShape> IntoResponse for RouteError<T> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::App(error) => error.into_response(),
			Self::Route(error) => {
				let status = error.status();

				if status.is_server_error() {
					tracing::error!(%error, "request failed");
				}

				(status, Json(Message::new(error.message()))).into_response()
			}
		}
	}
}

impl<T> OperationOutput for RouteError<T> {
	type Inner = Message;
}
