use std::{cmp::Reverse, collections::HashMap};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
	extract::Credential,
	model::User,
	route::post::{model::Post, visibility},
};

use super::{Error, Listing, NewPost, Store};

#[derive(Default)]
struct Inner {
	users: HashMap<Uuid, User>,
	/// Session and API key ids mapped to their owner.
	credentials: HashMap<Credential, Uuid>,
	posts: HashMap<Uuid, Post>,
}

/// A [`Store`] that keeps everything in process memory.
///
/// Used by the test suite and when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
	inner: RwLock<Inner>,
}

impl MemoryStore {
	pub async fn insert_user(&self, username: &str) -> User {
		let user = User {
			id: Uuid::new_v4(),
			username: username.to_owned(),
			created_at: Utc::now(),
		};

		self.inner
			.write()
			.await
			.users
			.insert(user.id, user.clone());

		user
	}

	pub async fn insert_session(&self, user_id: Uuid) -> Uuid {
		self.insert_credential(Credential::Session, user_id).await
	}

	pub async fn insert_api_key(&self, user_id: Uuid) -> Uuid {
		self.insert_credential(Credential::ApiKey, user_id).await
	}

	async fn insert_credential(&self, kind: fn(Uuid) -> Credential, user_id: Uuid) -> Uuid {
		let id = Uuid::new_v4();

		self.inner
			.write()
			.await
			.credentials
			.insert(kind(id), user_id);

		id
	}
}

#[axum::async_trait]
impl Store for MemoryStore {
	async fn resolve_user(&self, credential: Credential) -> Result<Option<User>, Error> {
		let inner = self.inner.read().await;

		Ok(inner
			.credentials
			.get(&credential)
			.and_then(|user_id| inner.users.get(user_id))
			.cloned())
	}

	async fn find_user(&self, id: Uuid) -> Result<Option<User>, Error> {
		Ok(self.inner.read().await.users.get(&id).cloned())
	}

	async fn list_active_posts(
		&self,
		now: DateTime<Utc>,
		limit: i64,
		offset: i64,
	) -> Result<Listing, Error> {
		let inner = self.inner.read().await;

		let mut posts = inner
			.posts
			.values()
			.filter(|post| visibility::is_active(post, now))
			.filter_map(|post| Some((post.clone(), inner.users.get(&post.user_id)?.clone())))
			.collect::<Vec<_>>();

		// `None` sorts below `Some`, so undated posts end up last like `NULLS LAST`
		posts.sort_by_key(|(post, _)| Reverse((post.published_at, post.created_at)));

		let total = i64::try_from(posts.len()).unwrap_or(i64::MAX);
		let posts = posts
			.into_iter()
			.skip(usize::try_from(offset).unwrap_or(0))
			.take(usize::try_from(limit).unwrap_or(0))
			.collect();

		Ok(Listing { posts, total })
	}

	async fn find_post(&self, id: Uuid) -> Result<Option<Post>, Error> {
		Ok(self.inner.read().await.posts.get(&id).cloned())
	}

	async fn insert_post(&self, post: NewPost) -> Result<Post, Error> {
		let now = Utc::now();
		let post = Post {
			id: Uuid::new_v4(),
			user_id: post.user_id,
			title: post.title,
			content: post.content,
			is_draft: post.is_draft,
			published_at: post.published_at,
			created_at: now,
			updated_at: now,
		};

		self.inner
			.write()
			.await
			.posts
			.insert(post.id, post.clone());

		Ok(post)
	}

	async fn update_post(&self, post: &Post) -> Result<Option<Post>, Error> {
		let mut inner = self.inner.write().await;

		let Some(stored) = inner.posts.get_mut(&post.id) else {
			return Ok(None);
		};

		stored.title.clone_from(&post.title);
		stored.content.clone_from(&post.content);
		stored.is_draft = post.is_draft;
		stored.published_at = post.published_at;
		stored.updated_at = Utc::now();

		Ok(Some(stored.clone()))
	}

	async fn delete_post(&self, id: Uuid) -> Result<bool, Error> {
		Ok(self.inner.write().await.posts.remove(&id).is_some())
	}
}
