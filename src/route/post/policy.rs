use crate::model::User;

use super::model::Post;

/// The outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
	Allowed,
	Forbidden,
}

/// Only the author of a post may change or delete it.
pub fn can_modify(actor: &User, post: &Post) -> Access {
	if actor.id == post.user_id {
		Access::Allowed
	} else {
		Access::Forbidden
	}
}

#[cfg(test)]
mod test {
	use chrono::Utc;
	use uuid::Uuid;

	use super::*;

	fn user() -> User {
		User {
			id: Uuid::new_v4(),
			username: "a".into(),
			created_at: Utc::now(),
		}
	}

	#[test]
	fn test_only_author_can_modify() {
		let author = user();
		let other = user();
		let now = Utc::now();
		let post = Post {
			id: Uuid::new_v4(),
			user_id: author.id,
			title: "title".into(),
			content: "content".into(),
			is_draft: false,
			published_at: Some(now),
			created_at: now,
			updated_at: now,
		};

		assert_eq!(can_modify(&author, &post), Access::Allowed);
		assert_eq!(can_modify(&other, &post), Access::Forbidden);
	}
}
