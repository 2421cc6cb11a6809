use std::borrow::Cow;

use aide::{
	openapi::{ApiKeyLocation, SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{
	error,
	extract::{Json, COOKIE_NAME},
};

pub const SECURITY_SCHEME_API_KEY: &str = "API Key";
pub const SECURITY_SCHEME_SESSION: &str = "Session";

pub mod tag {
	pub const POST: &str = "Post";
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Post API")
		.summary("Blog posts with drafts and scheduled publishing")
		.description(include_str!("../README.md"))
		.tag(Tag {
			name: tag::POST.into(),
			description: Some("Post publishing and management".into()),
			..Default::default()
		})
		.security_scheme(
			SECURITY_SCHEME_API_KEY,
			SecurityScheme::ApiKey {
				location: ApiKeyLocation::Header,
				name: "Authorization".into(),
				description: Some("An API key, sent as `Bearer <key>`".into()),
				extensions: Default::default(),
			},
		)
		.security_scheme(
			SECURITY_SCHEME_SESSION,
			SecurityScheme::ApiKey {
				location: ApiKeyLocation::Cookie,
				name: COOKIE_NAME.into(),
				description: Some("A user session cookie".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<error::ErrorResponse>, _>(|res| {
			res.example(error::ErrorResponse {
				errors: vec![error::Message {
					content: "error_code".into(),
					field: Some("optional field".into()),
					details: Some(Cow::Owned({
						let mut map = error::Map::new();
						map.insert("key".into(), serde_json::json!("value"));
						map
					})),
				}],
			})
		})
}
