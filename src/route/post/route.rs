use aide::axum::IntoApiResponse;
use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use macros::route;

use crate::{
	extract::{Json, Path, Query, Session},
	openapi::tag,
	Database,
};

use super::{
	model,
	policy::{self, Access},
	visibility, Error, RouteError,
};

const PATH: &str = "/posts";

/// Loads a post and checks that the acting user may modify it.
async fn load_owned(
	database: &Database,
	session: &Session,
	id: uuid::Uuid,
) -> Result<model::Post, RouteError> {
	let post = database
		.find_post(id)
		.await?
		.ok_or(Error::UnknownPost(id))?;

	match policy::can_modify(&session.user, &post) {
		Access::Allowed => Ok(post),
		Access::Forbidden => {
			tracing::warn!(post = %post.id, user = %session.user.id, "rejected change by non-author");
			Err(Error::Forbidden(post.id).into())
		}
	}
}

/// Get all posts
/// Returns a paginated response of published posts with their authors, newest first.
#[route(
	tag = tag::POST,
	error(status = 400, description = "The page is not a number."),
	error(status = 422, description = "The page is not a positive number.")
)]
pub async fn get_posts(
	State(database): State<Database>,
	Query(paginate): Query<model::Paginate>,
) -> Result<Json<model::Page<model::PostView>>, RouteError> {
	let now = Utc::now();
	let listing = database
		.list_active_posts(now, paginate.limit(), paginate.offset())
		.await?;

	let posts = listing
		.posts
		.into_iter()
		.map(|(post, user)| model::PostView::new(post, now).with_author(Some(user)))
		.collect();

	Ok(Json(model::Page::new(PATH, &paginate, listing.total, posts)))
}

/// Get single post
/// Returns a single published post by its unique id. Drafts and scheduled posts are not found.
#[route(
	tag = tag::POST,
	error(status = 400, description = "The id is not a UUID."),
	error(status = 404, description = "The post does not exist or is not published.")
)]
pub async fn get_post(
	State(database): State<Database>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::PostView>, RouteError> {
	let now = Utc::now();
	let post = database
		.find_post(path.id)
		.await?
		.filter(|post| !visibility::is_hidden(post, now))
		.ok_or(Error::UnknownPost(path.id))?;

	let user = database.find_user(post.user_id).await?;

	Ok(Json(model::PostView::new(post, now).with_author(user)))
}

/// Create post
/// Creates a new post. Posts that are not drafts and have no publication time are published immediately.
#[route(
	tag = tag::POST,
	response(status = 201, description = "The post was created.", shape = "Json<model::PostView>"),
	error(status = 401, description = "No valid session cookie or API key."),
	error(status = 422, description = "The post is invalid.")
)]
pub async fn create_post(
	State(database): State<Database>,
	session: Session,
	Json(input): Json<model::CreatePostInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let now = Utc::now();
	let post = database
		.insert_post(input.into_new_post(session.user.id, now))
		.await?;

	tracing::info!(post = %post.id, user = %session.user.id, draft = post.is_draft, "created post");

	Ok((StatusCode::CREATED, Json(model::PostView::new(post, now))))
}

/// Update post
/// Updates an existing post by its unique id. Only the author may update a post.
#[route(
	tag = tag::POST,
	error(status = 401, description = "No valid session cookie or API key."),
	error(status = 403, description = "The post belongs to another user."),
	error(status = 404, description = "The post does not exist."),
	error(status = 422, description = "The changes are invalid.")
)]
pub async fn update_post(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::IdInput>,
	Json(input): Json<model::UpdatePostInput>,
) -> Result<Json<model::PostView>, RouteError> {
	let mut post = load_owned(&database, &session, path.id).await?;
	let now = Utc::now();

	input.apply(&mut post, now);

	let post = database
		.update_post(&post)
		.await?
		.ok_or(Error::UnknownPost(path.id))?;

	tracing::info!(post = %post.id, user = %session.user.id, "updated post");

	Ok(Json(model::PostView::new(post, now)))
}

/// Delete post
/// Deletes an existing post by its unique id. Only the author may delete a post.
#[route(
	tag = tag::POST,
	error(status = 401, description = "No valid session cookie or API key."),
	error(status = 403, description = "The post belongs to another user."),
	error(status = 404, description = "The post does not exist.")
)]
pub async fn delete_post(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::Deleted>, RouteError> {
	let post = load_owned(&database, &session, path.id).await?;

	if !database.delete_post(post.id).await? {
		return Err(Error::UnknownPost(post.id).into());
	}

	tracing::info!(post = %post.id, user = %session.user.id, "deleted post");

	Ok(Json(model::Deleted::default()))
}

#[cfg(test)]
mod test {
	use chrono::{DateTime, Duration, Utc};

	use crate::{store::NewPost, test::*};

	fn new_post(
		user_id: uuid::Uuid,
		is_draft: bool,
		published_at: Option<DateTime<Utc>>,
	) -> NewPost {
		NewPost {
			user_id,
			title: "Title".into(),
			content: "Content".into(),
			is_draft,
			published_at,
		}
	}

	#[tokio::test]
	async fn test_list_excludes_drafts_and_scheduled() {
		let app = app();
		let user = app.user("alice").await;
		let now = Utc::now();

		let published = app
			.store
			.insert_post(new_post(user.id, false, Some(now - Duration::hours(1))))
			.await
			.unwrap();
		app.store
			.insert_post(new_post(user.id, true, None))
			.await
			.unwrap();
		app.store
			.insert_post(new_post(user.id, false, Some(now + Duration::days(1))))
			.await
			.unwrap();

		let response = app.server.get("/posts").await;

		assert_eq!(response.status_code(), 200);

		let body = response.json::<Value>();
		let data = body["data"].as_array().unwrap();

		assert_eq!(data.len(), 1);
		assert_eq!(data[0]["id"], json!(published.id));
		assert_eq!(data[0]["status"], "published");
		assert_eq!(data[0]["user"]["username"], "alice");
		assert!(body["links"].is_object());
		assert_eq!(body["meta"]["total"], 1);
		assert_eq!(body["meta"]["per_page"], 20);
	}

	#[tokio::test]
	async fn test_list_is_the_same_for_every_caller() {
		let app = app();
		let user = app.user("alice").await;
		let now = Utc::now();

		app.store
			.insert_post(new_post(user.id, false, Some(now - Duration::hours(1))))
			.await
			.unwrap();
		app.store
			.insert_post(new_post(user.id, true, None))
			.await
			.unwrap();

		let anonymous = app.server.get("/posts").await.json::<Value>();
		let author = app
			.server
			.get("/posts")
			.add_header(AUTHORIZATION, bearer(user.api_key))
			.await
			.json::<Value>();

		assert_eq!(anonymous["data"], author["data"]);
		assert_eq!(anonymous["data"].as_array().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn test_list_paginates_by_twenty() {
		let app = app();
		let user = app.user("alice").await;
		let now = Utc::now();

		for minutes in 1..=25 {
			app.store
				.insert_post(new_post(
					user.id,
					false,
					Some(now - Duration::minutes(minutes)),
				))
				.await
				.unwrap();
		}

		let first = app.server.get("/posts").await.json::<Value>();
		let second = app
			.server
			.get("/posts")
			.add_query_param("page", 2)
			.await
			.json::<Value>();

		assert_eq!(first["data"].as_array().unwrap().len(), 20);
		assert_eq!(second["data"].as_array().unwrap().len(), 5);
		assert_eq!(first["meta"]["last_page"], 2);
		assert_eq!(first["links"]["next"], "/posts?page=2");

		// newest first
		let date = |value: &Value| serde_json::from_value::<DateTime<Utc>>(value.clone()).unwrap();
		assert!(date(&first["data"][0]["published_at"]) > date(&first["data"][19]["published_at"]));
		assert!(date(&first["data"][19]["published_at"]) > date(&second["data"][0]["published_at"]));

		let response = app.server.get("/posts").add_query_param("page", 0).await;
		assert_eq!(response.status_code(), 422);
	}

	#[tokio::test]
	async fn test_show_published_post() {
		let app = app();
		let user = app.user("alice").await;

		let published = app
			.store
			.insert_post(new_post(
				user.id,
				false,
				Some(Utc::now() - Duration::hours(1)),
			))
			.await
			.unwrap();
		let undated = app
			.store
			.insert_post(new_post(user.id, false, None))
			.await
			.unwrap();

		let response = app.server.get(&format!("/posts/{}", published.id)).await;

		assert_eq!(response.status_code(), 200);

		let body = response.json::<Value>();

		assert_eq!(body["id"], json!(published.id));
		assert_eq!(body["user"]["id"], json!(user.id));

		let response = app.server.get(&format!("/posts/{}", undated.id)).await;

		assert_eq!(response.status_code(), 200);
	}

	#[tokio::test]
	async fn test_show_draft_scheduled_or_missing_returns_404() {
		let app = app();
		let user = app.user("alice").await;

		let draft = app
			.store
			.insert_post(new_post(user.id, true, None))
			.await
			.unwrap();
		let scheduled = app
			.store
			.insert_post(new_post(
				user.id,
				false,
				Some(Utc::now() + Duration::days(1)),
			))
			.await
			.unwrap();

		for id in [draft.id, scheduled.id, uuid::Uuid::new_v4()] {
			// the author gets no preview either
			let response = app
				.server
				.get(&format!("/posts/{id}"))
				.add_header(AUTHORIZATION, bearer(user.api_key))
				.await;

			assert_eq!(response.status_code(), 404);
			assert_eq!(
				response.json::<Value>()["errors"][0]["content"],
				"unknown_post"
			);
		}
	}

	#[tokio::test]
	async fn test_show_malformed_id() {
		let app = app();

		let response = app.server.get("/posts/not-a-uuid").await;

		assert_eq!(response.status_code(), 400);
	}

	#[tokio::test]
	async fn test_store_requires_auth_and_valid_data() {
		let app = app();
		let user = app.user("alice").await;

		let response = app.server.post("/posts").json(&json!({})).await;
		assert_eq!(response.status_code(), 401);

		let response = app
			.server
			.post("/posts")
			.add_header(AUTHORIZATION, bearer(uuid::Uuid::new_v4()))
			.json(&json!({ "title": "Hello", "content": "Body body" }))
			.await;
		assert_eq!(response.status_code(), 401);

		let response = app
			.server
			.post("/posts")
			.add_header(AUTHORIZATION, bearer(user.api_key))
			.json(&json!({ "title": "" }))
			.await;
		assert_eq!(response.status_code(), 422);

		let response = app
			.server
			.post("/posts")
			.add_header(AUTHORIZATION, bearer(user.api_key))
			.json(&json!({ "title": "", "content": "Body body" }))
			.await;
		assert_eq!(response.status_code(), 422);
		assert_eq!(response.json::<Value>()["errors"][0]["field"], "title");
		assert_eq!(response.json::<Value>()["errors"][0]["content"], "length");
	}

	/// The `content` code reported for `field`, if any error names it.
	fn error_for(body: &Value, field: &str) -> Option<String> {
		body["errors"]
			.as_array()?
			.iter()
			.find(|error| error["field"] == field)
			.and_then(|error| error["content"].as_str())
			.map(str::to_owned)
	}

	#[tokio::test]
	async fn test_store_reports_field_errors() {
		let app = app();
		let user = app.user("alice").await;

		let cases = [
			(json!({ "title": "Hello" }), "content", "required"),
			(json!({ "content": "Body" }), "title", "required"),
			(json!({ "title": "", "content": "Body" }), "title", "length"),
			(json!({ "title": "x".repeat(256), "content": "Body" }), "title", "length"),
			(json!({ "title": "Hello", "content": "" }), "content", "length"),
			(json!({ "title": "Hello", "content": 5 }), "content", "type"),
			(json!({ "title": "Hello", "content": "Body", "is_draft": [] }), "is_draft", "type"),
			(
				json!({ "title": "Hello", "content": "Body", "is_draft": "yes" }),
				"is_draft",
				"invalid_value",
			),
			(
				json!({ "title": "Hello", "content": "Body", "is_draft": 2 }),
				"is_draft",
				"invalid_value",
			),
		];

		for (input, field, content) in cases {
			let response = app
				.server
				.post("/posts")
				.add_header(AUTHORIZATION, bearer(user.api_key))
				.json(&input)
				.await;

			assert_eq!(response.status_code(), 422, "{input}");
			assert_eq!(
				error_for(&response.json::<Value>(), field).as_deref(),
				Some(content),
				"{input}"
			);
		}

		let list = app.server.get("/posts").await.json::<Value>();
		assert_eq!(list["meta"]["total"], 0);
	}

	#[tokio::test]
	async fn test_store_accepts_string_flags() {
		let app = app();
		let user = app.user("alice").await;

		let response = app
			.server
			.post("/posts")
			.add_header(AUTHORIZATION, bearer(user.api_key))
			.json(&json!({ "title": "Hello", "content": "Body", "is_draft": "1" }))
			.await;

		assert_eq!(response.status_code(), 201);
		assert_eq!(response.json::<Value>()["status"], "draft");
	}

	#[tokio::test]
	async fn test_update_reports_field_errors() {
		let app = app();
		let user = app.user("alice").await;

		let post = app
			.store
			.insert_post(new_post(user.id, true, None))
			.await
			.unwrap();

		let cases = [
			(json!({ "title": "" }), "title", "length"),
			(json!({ "content": "" }), "content", "length"),
			(json!({ "content": 5 }), "content", "type"),
			(json!({ "is_draft": {} }), "is_draft", "type"),
			(json!({ "is_draft": "no" }), "is_draft", "invalid_value"),
		];

		for (input, field, content) in cases {
			let response = app
				.server
				.patch(&format!("/posts/{}", post.id))
				.add_header(AUTHORIZATION, bearer(user.api_key))
				.json(&input)
				.await;

			assert_eq!(response.status_code(), 422, "{input}");
			assert_eq!(
				error_for(&response.json::<Value>(), field).as_deref(),
				Some(content),
				"{input}"
			);
		}

		let stored = app.store.find_post(post.id).await.unwrap().unwrap();
		assert_eq!(stored.title, "Title");
		assert!(stored.is_draft);
	}

	#[tokio::test]
	async fn test_store_draft_is_hidden_even_from_author() {
		let app = app();
		let user = app.user("alice").await;

		let response = app
			.server
			.post("/posts")
			.add_header(AUTHORIZATION, bearer(user.api_key))
			.json(&json!({ "title": "Hello", "content": "Body body", "is_draft": 1 }))
			.await;

		assert_eq!(response.status_code(), 201);

		let body = response.json::<Value>();

		assert_eq!(body["title"], "Hello");
		assert_eq!(body["user_id"], json!(user.id));
		assert_eq!(body["is_draft"], true);
		assert!(body["published_at"].is_null());
		assert_eq!(body["status"], "draft");

		let id = body["id"].as_str().unwrap();
		let response = app
			.server
			.get(&format!("/posts/{id}"))
			.add_header(AUTHORIZATION, bearer(user.api_key))
			.await;
		assert_eq!(response.status_code(), 404);

		let list = app.server.get("/posts").await.json::<Value>();
		assert!(list["data"].as_array().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_store_published_now_is_listed() {
		let app = app();
		let user = app.user("alice").await;
		let before = Utc::now();

		let response = app
			.server
			.post("/posts")
			.add_header(COOKIE, session_cookie(user.session))
			.json(&json!({ "title": "T", "content": "C", "is_draft": 0 }))
			.await;

		assert_eq!(response.status_code(), 201);

		let body = response.json::<Value>();
		let published_at = serde_json::from_value::<DateTime<Utc>>(
			body["published_at"].clone(),
		)
		.unwrap();

		assert!(published_at >= before);
		assert!(published_at <= Utc::now());

		let list = app.server.get("/posts").await.json::<Value>();

		assert_eq!(list["data"].as_array().unwrap().len(), 1);
		assert_eq!(list["data"][0]["id"], body["id"]);
	}

	#[tokio::test]
	async fn test_update_only_author_can_update() {
		let app = app();
		let user = app.user("alice").await;
		let other = app.user("bob").await;

		let post = app
			.store
			.insert_post(NewPost {
				title: "Original".into(),
				..new_post(user.id, true, None)
			})
			.await
			.unwrap();

		let response = app
			.server
			.patch(&format!("/posts/{}", post.id))
			.add_header(AUTHORIZATION, bearer(other.api_key))
			.json(&json!({ "title": "Hacked", "content": "Body body", "is_draft": 0 }))
			.await;

		assert_eq!(response.status_code(), 403);

		let stored = app.store.find_post(post.id).await.unwrap().unwrap();
		assert_eq!(stored.title, "Original");

		let response = app
			.server
			.patch(&format!("/posts/{}", post.id))
			.add_header(AUTHORIZATION, bearer(user.api_key))
			.json(&json!({ "title": "Updated", "is_draft": 0 }))
			.await;

		assert_eq!(response.status_code(), 200);

		let body = response.json::<Value>();

		assert_eq!(body["title"], "Updated");
		assert_eq!(body["content"], "Content");
		// first move out of draft without a date stamps the publication time
		assert!(body["published_at"].is_string());
	}

	#[tokio::test]
	async fn test_update_validates_and_requires_existing_post() {
		let app = app();
		let user = app.user("alice").await;

		let post = app
			.store
			.insert_post(new_post(user.id, true, None))
			.await
			.unwrap();

		let response = app
			.server
			.patch(&format!("/posts/{}", post.id))
			.add_header(AUTHORIZATION, bearer(user.api_key))
			.json(&json!({ "title": "" }))
			.await;
		assert_eq!(response.status_code(), 422);

		let response = app
			.server
			.patch(&format!("/posts/{}", uuid::Uuid::new_v4()))
			.add_header(AUTHORIZATION, bearer(user.api_key))
			.json(&json!({ "title": "New" }))
			.await;
		assert_eq!(response.status_code(), 404);

		let response = app
			.server
			.patch(&format!("/posts/{}", post.id))
			.json(&json!({ "title": "New" }))
			.await;
		assert_eq!(response.status_code(), 401);
	}

	#[tokio::test]
	async fn test_update_publishes_draft() {
		let app = app();
		let user = app.user("alice").await;

		let post = app
			.store
			.insert_post(new_post(user.id, true, None))
			.await
			.unwrap();

		let response = app
			.server
			.patch(&format!("/posts/{}", post.id))
			.add_header(AUTHORIZATION, bearer(user.api_key))
			.json(&json!({ "is_draft": false }))
			.await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>()["status"], "published");

		let response = app.server.get(&format!("/posts/{}", post.id)).await;
		assert_eq!(response.status_code(), 200);
	}

	#[tokio::test]
	async fn test_delete_only_author_can_delete() {
		let app = app();
		let user = app.user("alice").await;
		let other = app.user("bob").await;

		let post = app
			.store
			.insert_post(new_post(
				user.id,
				false,
				Some(Utc::now() - Duration::hours(1)),
			))
			.await
			.unwrap();

		let response = app
			.server
			.delete(&format!("/posts/{}", post.id))
			.add_header(AUTHORIZATION, bearer(other.api_key))
			.await;
		assert_eq!(response.status_code(), 403);
		assert!(app.store.find_post(post.id).await.unwrap().is_some());

		let response = app
			.server
			.delete(&format!("/posts/{}", post.id))
			.add_header(AUTHORIZATION, bearer(user.api_key))
			.await;
		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>(), json!({ "message": "deleted" }));
		assert!(app.store.find_post(post.id).await.unwrap().is_none());

		let response = app.server.get(&format!("/posts/{}", post.id)).await;
		assert_eq!(response.status_code(), 404);

		let response = app
			.server
			.delete(&format!("/posts/{}", post.id))
			.add_header(AUTHORIZATION, bearer(user.api_key))
			.await;
		assert_eq!(response.status_code(), 404);
	}
}
