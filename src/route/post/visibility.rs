//! Publication state of a post.
//!
//! Nothing here is stored: every answer is computed from the post's
//! `is_draft` and `published_at` fields at the instant `now` the caller
//! passes in, so a scheduled post becomes published without being written.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;

use super::model::Post;

pub fn is_draft(post: &Post) -> bool {
	post.is_draft
}

/// A non-draft post whose publication time has not passed yet.
pub fn is_scheduled(post: &Post, now: DateTime<Utc>) -> bool {
	!post.is_draft && post.published_at.is_some_and(|at| at >= now)
}

/// A non-draft post whose publication time has passed.
///
/// Posts without a publication time are neither published nor scheduled
/// here, even though [`is_active`] lists them.
pub fn is_published(post: &Post, now: DateTime<Utc>) -> bool {
	!post.is_draft && post.published_at.is_some_and(|at| at <= now)
}

/// Whether the post belongs in the public listing.
pub fn is_active(post: &Post, now: DateTime<Utc>) -> bool {
	!post.is_draft && post.published_at.map_or(true, |at| at <= now)
}

/// Whether fetching the post by id must behave as if it did not exist.
pub fn is_hidden(post: &Post, now: DateTime<Utc>) -> bool {
	is_draft(post) || is_scheduled(post, now)
}

/// The publication state of a post at a given instant.
///
/// Exactly one state holds for any post. A post without a publication time
/// counts as published immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Status {
	Draft,
	Scheduled,
	Published,
}

impl Status {
	pub fn of(post: &Post, now: DateTime<Utc>) -> Self {
		if is_draft(post) {
			Self::Draft
		} else if post.published_at.is_none() || is_published(post, now) {
			Self::Published
		} else {
			Self::Scheduled
		}
	}
}
