use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::{extract::Credential, model::User, route::post::model::Post};

use super::{Error, Listing, NewPost, Store};

/// The public columns of a user.
const USER: &str = r#"SELECT id, username, created_at FROM "user""#;

/// The active filter, matching `post::visibility::is_active`.
const ACTIVE: &str = "NOT p.is_draft AND (p.published_at IS NULL OR p.published_at <= $1)";

#[derive(sqlx::FromRow)]
struct ListedRow {
	#[sqlx(flatten)]
	post: Post,
	author_username: String,
	author_created_at: DateTime<Utc>,
}

impl From<ListedRow> for (Post, User) {
	fn from(row: ListedRow) -> Self {
		let user = User {
			id: row.post.user_id,
			username: row.author_username,
			created_at: row.author_created_at,
		};

		(row.post, user)
	}
}

/// A [`Store`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
	pool: PgPool,
}

impl PgStore {
	/// Connects to the database and applies pending migrations.
	pub async fn connect(url: &str) -> Result<Self, Error> {
		let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;

		sqlx::migrate!().run(&pool).await?;
		tracing::info!("database migrations applied");

		Ok(Self { pool })
	}
}

#[axum::async_trait]
impl Store for PgStore {
	async fn resolve_user(&self, credential: Credential) -> Result<Option<User>, Error> {
		let (table, id) = match credential {
			Credential::Session(id) => ("session", id),
			Credential::ApiKey(id) => ("api_key", id),
		};

		Ok(sqlx::query_as::<_, User>(&format!(
			"{USER} WHERE id = (SELECT user_id FROM {table} WHERE id = $1)"
		))
		.bind(id)
		.fetch_optional(&self.pool)
		.await?)
	}

	async fn find_user(&self, id: Uuid) -> Result<Option<User>, Error> {
		Ok(
			sqlx::query_as::<_, User>(&format!("{USER} WHERE id = $1"))
				.bind(id)
				.fetch_optional(&self.pool)
				.await?,
		)
	}

	async fn list_active_posts(
		&self,
		now: DateTime<Utc>,
		limit: i64,
		offset: i64,
	) -> Result<Listing, Error> {
		let rows = sqlx::query_as::<_, ListedRow>(&format!(
			r#"
				SELECT
					p.*,
					u.username AS author_username,
					u.created_at AS author_created_at
				FROM post p
				JOIN "user" u ON u.id = p.user_id
				WHERE {ACTIVE}
				ORDER BY p.published_at DESC NULLS LAST, p.created_at DESC
				LIMIT $2 OFFSET $3
			"#
		))
		.bind(now)
		.bind(limit)
		.bind(offset)
		.fetch_all(&self.pool)
		.await?;

		let total = sqlx::query_scalar::<_, i64>(&format!(
			r#"SELECT COUNT(*) FROM post p WHERE {ACTIVE}"#
		))
		.bind(now)
		.fetch_one(&self.pool)
		.await?;

		Ok(Listing {
			posts: rows.into_iter().map(Into::into).collect(),
			total,
		})
	}

	async fn find_post(&self, id: Uuid) -> Result<Option<Post>, Error> {
		Ok(sqlx::query_as::<_, Post>("SELECT * FROM post WHERE id = $1")
			.bind(id)
			.fetch_optional(&self.pool)
			.await?)
	}

	async fn insert_post(&self, post: NewPost) -> Result<Post, Error> {
		Ok(sqlx::query_as::<_, Post>(
			r#"
				INSERT INTO post (user_id, title, content, is_draft, published_at)
				VALUES ($1, $2, $3, $4, $5)
				RETURNING *
			"#,
		)
		.bind(post.user_id)
		.bind(post.title)
		.bind(post.content)
		.bind(post.is_draft)
		.bind(post.published_at)
		.fetch_one(&self.pool)
		.await?)
	}

	async fn update_post(&self, post: &Post) -> Result<Option<Post>, Error> {
		Ok(sqlx::query_as::<_, Post>(
			r#"
				UPDATE post
				SET title = $2, content = $3, is_draft = $4, published_at = $5, updated_at = now()
				WHERE id = $1
				RETURNING *
			"#,
		)
		.bind(post.id)
		.bind(&post.title)
		.bind(&post.content)
		.bind(post.is_draft)
		.bind(post.published_at)
		.fetch_optional(&self.pool)
		.await?)
	}

	async fn delete_post(&self, id: Uuid) -> Result<bool, Error> {
		let status = sqlx::query("DELETE FROM post WHERE id = $1")
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(status.rows_affected() > 0)
	}
}
