mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{extract::Credential, model::User, route::post::model::Post};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("migration error: {0}")]
	Migrate(#[from] sqlx::migrate::MigrateError),
}

/// The fields of a post that are chosen before it is stored.
#[derive(Debug, Clone)]
pub struct NewPost {
	pub user_id: Uuid,
	pub title: String,
	pub content: String,
	pub is_draft: bool,
	pub published_at: Option<DateTime<Utc>>,
}

/// A page of listed posts, each with its author, and the number of listable posts overall.
#[derive(Debug, Default)]
pub struct Listing {
	pub posts: Vec<(Post, User)>,
	pub total: i64,
}

/// Persistence for users, credentials and posts.
///
/// Every method is a single unit of work; callers do not hold
/// anything across calls.
#[axum::async_trait]
pub trait Store: Send + Sync {
	/// Returns the user owning the credential, if the credential is known.
	async fn resolve_user(&self, credential: Credential) -> Result<Option<User>, Error>;

	async fn find_user(&self, id: Uuid) -> Result<Option<User>, Error>;

	/// Lists the posts that are active at `now`, newest publication first.
	async fn list_active_posts(
		&self,
		now: DateTime<Utc>,
		limit: i64,
		offset: i64,
	) -> Result<Listing, Error>;

	async fn find_post(&self, id: Uuid) -> Result<Option<Post>, Error>;

	async fn insert_post(&self, post: NewPost) -> Result<Post, Error>;

	/// Overwrites the mutable fields of a stored post, returning `None` if it no longer exists.
	async fn update_post(&self, post: &Post) -> Result<Option<Post>, Error>;

	/// Hard-deletes a post, returning whether it existed.
	async fn delete_post(&self, id: Uuid) -> Result<bool, Error>;
}
