use std::str::FromStr;

use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request, StatusCode},
};
use uuid::Uuid;

use crate::{
	error::{self, ErrorShape, RouteError},
	model::User,
	openapi::{SECURITY_SCHEME_API_KEY, SECURITY_SCHEME_SESSION},
	Database,
};

pub const COOKIE_NAME: &str = "session";
pub const AUTHORIZATION_PREFIX: &str = "Bearer ";

/// An error that can occur while resolving the acting user.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("no session cookie or api key")]
	NoSessionCookieOrApiKey,
	#[error("invalid session cookie")]
	InvalidSessionCookie,
	#[error("invalid api key")]
	InvalidApiKey,
}

impl ErrorShape for Error {
	fn status(&self) -> StatusCode {
		StatusCode::UNAUTHORIZED
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		error::Message::new("unauthenticated")
			.detail("reason", self.to_string())
			.into_vec()
	}
}

/// A credential presented by the client.
///
/// Sessions come from the session cookie, API keys from the
/// `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Credential {
	Session(Uuid),
	ApiKey(Uuid),
}

/// Extracts the acting user from the request.
///
/// If neither an API key nor a session cookie is present, a
/// [`Error::NoSessionCookieOrApiKey`] is returned. Unknown or malformed
/// credentials are rejected with [`Error::InvalidApiKey`] or
/// [`Error::InvalidSessionCookie`].
///
/// ```rust
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub user: User,
}

/// Reads the credential from the request headers, preferring an API key over a cookie.
fn credential(parts: &request::Parts) -> Result<Credential, Error> {
	if let Some(api_key) = parts.headers.get(header::AUTHORIZATION) {
		let api_key = api_key
			.to_str()
			.ok()
			.and_then(|value| value.strip_prefix(AUTHORIZATION_PREFIX))
			.and_then(|value| Uuid::from_str(value.trim()).ok())
			.ok_or(Error::InvalidApiKey)?;

		return Ok(Credential::ApiKey(api_key));
	}

	let session_id = parts
		.headers
		.get_all(header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(cookie::Cookie::split_parse)
		.filter_map(Result::ok)
		.find(|cookie| cookie.name() == COOKIE_NAME)
		.ok_or(Error::NoSessionCookieOrApiKey)?;

	Uuid::parse_str(session_id.value())
		.map(Credential::Session)
		.map_err(|_| Error::InvalidSessionCookie)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<Error>;

	/// Extracts the session from the request using a session cookie or API key.
	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let credential = credential(parts)?;

		let database = Database::from_ref(state);
		let user = database
			.resolve_user(credential)
			.await?
			.ok_or(match credential {
				Credential::Session(..) => Error::InvalidSessionCookie,
				Credential::ApiKey(..) => Error::InvalidApiKey,
			})?;

		tracing::debug!(user = %user.id, "resolved acting user");

		Ok(Session { user })
	}
}

impl OperationInput for Session {
	/// Operation input for the session extractor.
	///
	/// This adds a session cookie or API key requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.extend([
			[(SECURITY_SCHEME_SESSION.to_string(), Vec::new())]
				.into_iter()
				.collect(),
			[(SECURITY_SCHEME_API_KEY.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		]);
	}
}
