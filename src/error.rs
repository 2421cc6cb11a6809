use std::{borrow::Cow, error::Error as StdError};

use aide::OperationOutput;
use axum::{
	body::Body,
	extract::rejection::{PathRejection, QueryRejection},
	http::{Response, StatusCode},
	response::IntoResponse,
};
use axum_jsonschema::JsonSchemaRejection;
use schemars::JsonSchema;
use serde::Serialize;

use crate::{extract::Json, store};

pub type Map = serde_json::Map<String, serde_json::Value>;

/// A single error message sent to the client.
///
/// `content` is a stable, machine-readable code. `field` is set when the
/// error belongs to a specific input field.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message<'a> {
	pub content: Cow<'a, str>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'a, str>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Cow<'a, Map>>,
}

impl<'a> Message<'a> {
	pub fn new(content: impl Into<Cow<'a, str>>) -> Self {
		Self {
			content: content.into(),
			field: None,
			details: None,
		}
	}

	#[must_use]
	pub fn field(mut self, field: impl Into<Cow<'a, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	#[must_use]
	pub fn detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(|| Cow::Owned(Map::new()))
			.to_mut()
			.insert(key.into(), value.into());
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorResponse<'a> {
	pub errors: Vec<Message<'a>>,
}

/// Describes how a route-specific error is presented to the client.
pub trait ErrorShape: StdError {
	fn status(&self) -> StatusCode;
	fn into_errors(self) -> Vec<Message<'static>>;
}

/// Errors shared by every route.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json body was rejected")]
	Json(JsonSchemaRejection),
	#[error("path error: {0}")]
	Path(#[from] PathRejection),
	#[error("query error: {0}")]
	Query(#[from] QueryRejection),
	#[error("rate limited, retry after {wait_time}s")]
	RateLimited { wait_time: u64 },
	#[error("rate limiter failure")]
	RateLimiter,
	#[error("store error: {0}")]
	Store(#[from] store::Error),
}

impl From<JsonSchemaRejection> for AppError {
	fn from(rejection: JsonSchemaRejection) -> Self {
		Self::Json(rejection)
	}
}

impl AppError {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..) | Self::Json(..) => StatusCode::UNPROCESSABLE_ENTITY,
			Self::Path(..) | Self::Query(..) => StatusCode::BAD_REQUEST,
			Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
			Self::RateLimiter | Self::Store(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_errors(self) -> Vec<Message<'static>> {
		match self {
			Self::Validation(errors) => errors
				.field_errors()
				.into_iter()
				.flat_map(|(field, errors)| {
					errors.iter().map(move |error| {
						let mut message = Message::new(error.code.clone()).field(field.clone());

						for (key, value) in &error.params {
							// the rejected value is echoed back by the client anyway
							if key != "value" {
								message = message.detail(key.to_string(), value.clone());
							}
						}

						message
					})
				})
				.collect(),
			Self::Json(rejection) => body_errors(rejection),
			Self::Path(rejection) => Message::new("invalid_path")
				.detail("reason", rejection.body_text())
				.into_vec(),
			Self::Query(rejection) => Message::new("invalid_query")
				.detail("reason", rejection.body_text())
				.into_vec(),
			Self::RateLimited { wait_time } => Message::new("rate_limited")
				.detail("retry_after", wait_time)
				.into_vec(),
			Self::RateLimiter | Self::Store(..) => Vec::new(),
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		let status = self.status();

		if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
		} else {
			tracing::debug!(error = %self, "request rejected");
		}

		(
			status,
			Json(ErrorResponse {
				errors: self.into_errors(),
			}),
		)
			.into_response()
	}
}

/// The last non-empty segment of a path such as `/title` or `post.title`.
fn last_segment(path: &str, separator: char) -> Option<&str> {
	path.rsplit(separator).next().filter(|segment| !segment.is_empty())
}

/// The first substring enclosed by `quote`, such as the field name in a
/// "missing field" error.
fn quoted(text: &str, quote: char) -> Option<String> {
	text.split(quote).nth(1).map(str::to_owned)
}

/// Maps a rejected JSON body to one message per offending field.
///
/// Schema keywords become the message content, with `minLength` and
/// `maxLength` reported as `length` like the validator does.
fn body_errors(rejection: JsonSchemaRejection) -> Vec<Message<'static>> {
	let mut messages = Vec::<Message<'static>>::new();
	let mut push = |content: &str, field: Option<String>, reason: String| {
		let duplicate = messages.iter().any(|message| {
			message.content == content && message.field.as_deref() == field.as_deref()
		});

		if !duplicate {
			let mut message = Message::new(content.to_owned()).detail("reason", reason);
			message.field = field.map(Cow::Owned);
			messages.push(message);
		}
	};

	match rejection {
		JsonSchemaRejection::Json(rejection) => {
			push("invalid_body", None, rejection.body_text());
		}
		JsonSchemaRejection::Serde(error) => {
			let path = error.path().to_string();
			let reason = error.into_inner().to_string();
			let field = last_segment(&path, '.')
				.map(str::to_owned)
				.or_else(|| quoted(&reason, '`'));

			push("invalid_value", field, reason);
		}
		JsonSchemaRejection::Schema(units) => {
			for unit in units {
				let keyword_location = unit.keyword_location().to_string();
				let keyword = match last_segment(&keyword_location, '/') {
					Some("minLength" | "maxLength") => "length",
					Some(keyword) => keyword,
					None => "invalid_body",
				};
				let reason = unit.error_description().to_string();
				// a missing property is reported on the object that lacks it
				let field = last_segment(&unit.instance_location().to_string(), '/')
					.map(str::to_owned)
					.or_else(|| {
						if keyword == "required" {
							quoted(&reason, '"')
						} else {
							None
						}
					});

				push(keyword, field, reason);
			}
		}
	}

	messages
}

/// An error returned from a route, either shared or specific to the route's module.
#[derive(Debug, thiserror::Error)]
pub enum RouteError<T: ErrorShape> {
	#[error(transparent)]
	App(AppError),
	#[error(transparent)]
	Route(T),
}

impl<T: ErrorShape> From<T> for RouteError<T> {
	fn from(error: T) -> Self {
		Self::Route(error)
	}
}

impl<T: ErrorShape> From<AppError> for RouteError<T> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<T: ErrorShape> From<store::Error> for RouteError<T> {
	fn from(error: store::Error) -> Self {
		Self::App(error.into())
	}
}

impl<T: ErrorShape> IntoResponse for RouteError<T> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::App(error) => error.into_response(),
			Self::Route(error) => {
				tracing::debug!(error = %error, "route error");

				(
					error.status(),
					Json(ErrorResponse {
						errors: error.into_errors(),
					}),
				)
					.into_response()
			}
		}
	}
}

/// Error responses are documented once through the default response in `openapi::docs`.
impl<T: ErrorShape> OperationOutput for RouteError<T> {
	type Inner = Self;
}
