use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// The number of items on every page of a listing.
pub const PAGE_SIZE: i64 = 20;

/// These can be removed when [`serde`] supports
/// literal defaults: <https://github.com/serde-rs/serde/issues/368>
#[inline]
fn one() -> i64 {
	1
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct Paginate {
	/// The page number to return (1-indexed).
	#[validate(range(min = 1))]
	#[serde(default = "one")]
	pub page: i64,
}

impl Paginate {
	pub fn offset(&self) -> i64 {
		(self.page - 1).saturating_mul(PAGE_SIZE)
	}

	pub fn limit(&self) -> i64 {
		PAGE_SIZE
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct IdInput {
	pub id: Uuid,
}

/// Links to neighbouring pages of a listing.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Links {
	pub first: String,
	pub last: String,
	pub prev: Option<String>,
	pub next: Option<String>,
}

/// Position of a page within the whole listing.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Meta {
	pub current_page: i64,
	pub per_page: i64,
	pub total: i64,
	pub last_page: i64,
	/// The 1-indexed position of the first item on this page, if any.
	pub from: Option<i64>,
	/// The 1-indexed position of the last item on this page, if any.
	pub to: Option<i64>,
	pub path: String,
}

/// A single page of a listing.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Page<T> {
	pub data: Vec<T>,
	pub links: Links,
	pub meta: Meta,
}

impl<T> Page<T> {
	pub fn new(path: &str, paginate: &Paginate, total: i64, data: Vec<T>) -> Self {
		let last_page = ((total + PAGE_SIZE - 1) / PAGE_SIZE).max(1);
		let current_page = paginate.page;
		let count = i64::try_from(data.len()).unwrap_or(i64::MAX);
		let url = |page: i64| format!("{path}?page={page}");

		let (from, to) = if count == 0 {
			(None, None)
		} else {
			(Some(paginate.offset() + 1), Some(paginate.offset() + count))
		};

		Self {
			data,
			links: Links {
				first: url(1),
				last: url(last_page),
				prev: (current_page > 1).then(|| url((current_page - 1).min(last_page))),
				next: (current_page < last_page).then(|| url(current_page + 1)),
			},
			meta: Meta {
				current_page,
				per_page: PAGE_SIZE,
				total,
				last_page,
				from,
				to,
				path: path.to_owned(),
			},
		}
	}
}
