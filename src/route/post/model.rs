use chrono::{DateTime, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::query::Listable;

/// A single post.
#[model]
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
pub struct Post {
	/// The unique identifier of the post.
	#[serde(skip_deserializing)]
	pub id: i64,
	/// The text of the post.
	#[validate(length(min = 1, max = 1000))]
	pub content: String,
	/// The creation time of the post, set by the server.
	#[serde(skip_deserializing)]
	pub date: DateTime<Utc>,
}

impl Listable for Post {
	fn id(&self) -> i64 {
		self.id
	}

	fn content(&self) -> &str {
		&self.content
	}

	fn date(&self) -> DateTime<Utc> {
		self.date
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct IdInput {
	/// The unique identifier of the post.
	pub id: i64,
}
