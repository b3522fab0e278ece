use chrono::{DateTime, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::query::Listable;

/// A single comment, left on a post.
#[model]
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
	/// The unique identifier of the comment.
	#[serde(skip_deserializing)]
	pub id: i64,
	/// The post the comment belongs to.
	#[serde(skip_deserializing)]
	pub post_id: i64,
	/// The text of the comment.
	#[validate(length(min = 1, max = 1000))]
	pub content: String,
	/// The creation time of the comment, set by the server.
	#[serde(skip_deserializing)]
	pub date: DateTime<Utc>,
}

impl Listable for Comment {
	fn id(&self) -> i64 {
		self.id
	}

	fn content(&self) -> &str {
		&self.content
	}

	fn date(&self) -> DateTime<Utc> {
		self.date
	}

	fn post_id(&self) -> Option<i64> {
		Some(self.post_id)
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct PostIdInput {
	/// The unique identifier of the post.
	#[serde(rename = "id")]
	pub post_id: i64,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct CommentIdInput {
	/// The unique identifier of the post.
	#[serde(rename = "id")]
	pub post_id: i64,
	/// The unique identifier of the comment.
	pub comment_id: i64,
}
