use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;

/// A single user, as shown next to the posts they wrote.
///
/// Users are managed outside of this service; it only reads them.
#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
pub struct User {
	/// The unique identifier of the user.
	pub id: Uuid,
	/// The username that is displayed to the public.
	pub username: String,
	/// The creation time of the user.
	pub created_at: chrono::DateTime<chrono::Utc>,
}
