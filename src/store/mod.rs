//! Storage seams for users, sessions, posts and comments.
//!
//! Handlers only ever see these traits; the concrete store is picked once in
//! `main` and injected through the application state.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
	query::{ListQuery, Page},
	route::{auth::model::User, comment::model::Comment, post::model::Post},
	session::SessionRow,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("unique constraint {0} violated")]
	Conflict(String),
	#[error("referenced row does not exist")]
	MissingReference,
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
	/// Inserts a user. A taken username is a [`StoreError::Conflict`],
	/// decided atomically with the insert.
	async fn create_user(
		&self,
		name: &str,
		username: &str,
		password_hash: &str,
	) -> Result<User, StoreError>;

	async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
	/// Persists a session. Fails with [`StoreError::MissingReference`]
	/// when the user does not exist.
	async fn insert_session(&self, session: &SessionRow) -> Result<(), StoreError>;

	async fn find_session(&self, id: Uuid) -> Result<Option<SessionRow>, StoreError>;

	/// Returns whether a session was removed.
	async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError>;

	async fn delete_expired_sessions(
		&self,
		now: chrono::DateTime<chrono::Utc>,
	) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
	async fn list_posts(&self, query: &ListQuery) -> Result<Page<Post>, StoreError>;

	async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError>;

	async fn create_post(&self, content: &str) -> Result<Post, StoreError>;

	/// Returns `None`, without writing anything, when the post does not exist.
	async fn update_post(&self, id: i64, content: Option<&str>)
		-> Result<Option<Post>, StoreError>;

	/// Deletes a post along with all of its comments, returning the post as it was.
	async fn delete_post(&self, id: i64) -> Result<Option<Post>, StoreError>;
}

/// Comments are always addressed through their post.
#[async_trait]
pub trait CommentStore: Send + Sync {
	async fn list_comments(
		&self,
		post_id: i64,
		query: &ListQuery,
	) -> Result<Page<Comment>, StoreError>;

	async fn find_comment(&self, post_id: i64, id: i64) -> Result<Option<Comment>, StoreError>;

	/// Returns `None` when the post does not exist.
	async fn create_comment(
		&self,
		post_id: i64,
		content: &str,
	) -> Result<Option<Comment>, StoreError>;

	async fn update_comment(
		&self,
		post_id: i64,
		id: i64,
		content: Option<&str>,
	) -> Result<Option<Comment>, StoreError>;

	async fn delete_comment(&self, post_id: i64, id: i64) -> Result<Option<Comment>, StoreError>;
}
