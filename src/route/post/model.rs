pub use crate::route::model::{IdInput, Page, Paginate};

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{model::User, store::NewPost};

use super::visibility::Status;

/// A single post, created by a user.
#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Post {
	/// The unique identifier of the post.
	pub id: Uuid,
	/// The user that created the post.
	pub user_id: Uuid,
	/// The title of the post.
	pub title: String,
	/// The content of the post.
	pub content: String,
	/// Drafts are never shown to anyone, including their author.
	pub is_draft: bool,
	/// When the post becomes visible. Posts dated in the future are scheduled.
	pub published_at: Option<DateTime<Utc>>,
	/// The creation time of the post.
	pub created_at: DateTime<Utc>,
	/// The last time the post was changed.
	pub updated_at: DateTime<Utc>,
}

/// A post as returned to the client, with its publication state at response time.
#[derive(Debug, Serialize, JsonSchema)]
pub struct PostView {
	#[serde(flatten)]
	pub post: Post,
	pub status: Status,
	/// The author, present when reading published posts.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user: Option<User>,
}

impl PostView {
	pub fn new(post: Post, now: DateTime<Utc>) -> Self {
		Self {
			status: Status::of(&post, now),
			post,
			user: None,
		}
	}

	#[must_use]
	pub fn with_author(mut self, user: Option<User>) -> Self {
		self.user = user;
		self
	}
}

/// A boolean that also accepts `0` and `1`, as numbers or strings, as
/// form-style clients send them.
#[derive(Deserialize, JsonSchema)]
#[serde(untagged)]
enum Flag {
	Bool(bool),
	Int(u8),
	Str(String),
}

impl Flag {
	fn into_bool<E: de::Error>(self) -> Result<bool, E> {
		const EXPECTED: &str = "a boolean, 0 or 1";

		match self {
			Self::Bool(value) => Ok(value),
			Self::Int(0) => Ok(false),
			Self::Int(1) => Ok(true),
			Self::Int(other) => Err(E::invalid_value(
				de::Unexpected::Unsigned(other.into()),
				&EXPECTED,
			)),
			Self::Str(value) => match value.as_str() {
				"0" => Ok(false),
				"1" => Ok(true),
				other => Err(E::invalid_value(de::Unexpected::Str(other), &EXPECTED)),
			},
		}
	}
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
	Flag::deserialize(deserializer)?.into_bool()
}

fn optional_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
	Option::<Flag>::deserialize(deserializer)?
		.map(Flag::into_bool)
		.transpose()
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct CreatePostInput {
	/// The title of the post.
	#[validate(length(min = 1, max = 255))]
	pub title: String,
	/// The content of the post.
	#[validate(length(min = 1))]
	pub content: String,
	/// Whether the post is a draft. Defaults to `false`.
	#[serde(default, deserialize_with = "flag")]
	#[schemars(with = "Flag")]
	pub is_draft: bool,
	/// When the post becomes visible. Defaults to now for posts that are not drafts.
	#[serde(default)]
	pub published_at: Option<DateTime<Utc>>,
}

impl CreatePostInput {
	/// Prepares the post for storage on behalf of its author.
	///
	/// A post that is not a draft and has no publication time is published at `now`.
	pub fn into_new_post(self, user_id: Uuid, now: DateTime<Utc>) -> NewPost {
		let published_at = match self.published_at {
			None if !self.is_draft => Some(now),
			published_at => published_at,
		};

		NewPost {
			user_id,
			title: self.title,
			content: self.content,
			is_draft: self.is_draft,
			published_at,
		}
	}
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct UpdatePostInput {
	/// The title of the post.
	#[validate(length(min = 1, max = 255))]
	pub title: Option<String>,
	/// The content of the post.
	#[validate(length(min = 1))]
	pub content: Option<String>,
	/// Whether the post is a draft.
	#[serde(default, deserialize_with = "optional_flag")]
	#[schemars(with = "Option<Flag>")]
	pub is_draft: Option<bool>,
	/// When the post becomes visible.
	#[serde(default)]
	pub published_at: Option<DateTime<Utc>>,
}

impl UpdatePostInput {
	/// Applies the provided fields to the post.
	///
	/// A post that has never had a publication time and ends up not being a
	/// draft is published at `now`, unless the input dates it explicitly.
	pub fn apply(self, post: &mut Post, now: DateTime<Utc>) {
		if let Some(title) = self.title {
			post.title = title;
		}

		if let Some(content) = self.content {
			post.content = content;
		}

		if let Some(is_draft) = self.is_draft {
			post.is_draft = is_draft;
		}

		post.published_at = match (post.published_at, self.published_at) {
			(_, Some(at)) => Some(at),
			(None, None) if !post.is_draft => Some(now),
			(current, None) => current,
		};
	}
}

/// Confirmation that a post was deleted.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Deleted {
	pub message: &'static str,
}

impl Default for Deleted {
	fn default() -> Self {
		Self { message: "deleted" }
	}
}
