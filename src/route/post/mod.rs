use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{error, AppState};

pub mod model;
pub mod policy;
pub mod route;
pub mod visibility;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// Also returned for drafts and scheduled posts, which must look missing.
	#[error("unknown post {0}")]
	UnknownPost(Uuid),
	#[error("post {0} belongs to another user")]
	Forbidden(Uuid),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(get_posts, get_posts_docs).post_with(create_post, create_post_docs),
		)
		.api_route(
			"/:id",
			get_with(get_post, get_post_docs)
				.patch_with(update_post, update_post_docs)
				.delete_with(delete_post, delete_post_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) => StatusCode::NOT_FOUND,
			Self::Forbidden(..) => StatusCode::FORBIDDEN,
		}
	}

	fn into_errors(self) -> Vec<error::Message<'static>> {
		match self {
			Self::UnknownPost(post) => error::Message::new("unknown_post")
				.detail("post", post.to_string())
				.into_vec(),
			Self::Forbidden(post) => error::Message::new("forbidden")
				.detail("post", post.to_string())
				.into_vec(),
		}
	}
}
