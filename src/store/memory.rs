use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CommentStore, PostStore, SessionStore, StoreError, UserStore};
use crate::{
	query::{ListQuery, Page},
	route::{auth::model::User, comment::model::Comment, post::model::Post},
	session::SessionRow,
};

/// Single-node store kept in process memory.
///
/// Every mutation happens under one write lock, which gives the same
/// per-row atomicity the Postgres store gets from its constraints.
#[derive(Debug, Default)]
pub struct MemoryStore {
	inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
	users: BTreeMap<i64, User>,
	usernames: HashMap<String, i64>,
	sessions: HashMap<Uuid, SessionRow>,
	posts: BTreeMap<i64, Post>,
	comments: BTreeMap<i64, Comment>,
	last_user_id: i64,
	last_post_id: i64,
	last_comment_id: i64,
}

#[async_trait]
impl UserStore for MemoryStore {
	async fn create_user(
		&self,
		name: &str,
		username: &str,
		password_hash: &str,
	) -> Result<User, StoreError> {
		let mut inner = self.inner.write().await;

		if inner.usernames.contains_key(username) {
			return Err(StoreError::Conflict("user_username_key".into()));
		}

		inner.last_user_id += 1;

		let user = User {
			id: inner.last_user_id,
			name: name.to_owned(),
			username: username.to_owned(),
			password_hash: password_hash.to_owned(),
		};

		inner.usernames.insert(user.username.clone(), user.id);
		inner.users.insert(user.id, user.clone());

		Ok(user)
	}

	async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
		let inner = self.inner.read().await;

		Ok(inner
			.usernames
			.get(username)
			.and_then(|id| inner.users.get(id))
			.cloned())
	}
}

#[async_trait]
impl SessionStore for MemoryStore {
	async fn insert_session(&self, session: &SessionRow) -> Result<(), StoreError> {
		let mut inner = self.inner.write().await;

		if !inner.users.contains_key(&session.user_id) {
			return Err(StoreError::MissingReference);
		}

		inner.sessions.insert(session.id, session.clone());

		Ok(())
	}

	async fn find_session(&self, id: Uuid) -> Result<Option<SessionRow>, StoreError> {
		Ok(self.inner.read().await.sessions.get(&id).cloned())
	}

	async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError> {
		Ok(self.inner.write().await.sessions.remove(&id).is_some())
	}

	async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
		let mut inner = self.inner.write().await;
		let before = inner.sessions.len();

		inner.sessions.retain(|_, session| session.expires_at > now);

		Ok((before - inner.sessions.len()) as u64)
	}
}

#[async_trait]
impl PostStore for MemoryStore {
	async fn list_posts(&self, query: &ListQuery) -> Result<Page<Post>, StoreError> {
		let inner = self.inner.read().await;

		Ok(query.apply(&query.filter(None), inner.posts.values()))
	}

	async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
		Ok(self.inner.read().await.posts.get(&id).cloned())
	}

	async fn create_post(&self, content: &str) -> Result<Post, StoreError> {
		let mut inner = self.inner.write().await;

		inner.last_post_id += 1;

		let post = Post {
			id: inner.last_post_id,
			content: content.to_owned(),
			date: Utc::now(),
		};

		inner.posts.insert(post.id, post.clone());

		Ok(post)
	}

	async fn update_post(
		&self,
		id: i64,
		content: Option<&str>,
	) -> Result<Option<Post>, StoreError> {
		let mut inner = self.inner.write().await;
		let Some(post) = inner.posts.get_mut(&id) else {
			return Ok(None);
		};

		if let Some(content) = content {
			content.clone_into(&mut post.content);
		}

		Ok(Some(post.clone()))
	}

	async fn delete_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
		let mut inner = self.inner.write().await;
		let post = inner.posts.remove(&id);

		if post.is_some() {
			inner.comments.retain(|_, comment| comment.post_id != id);
		}

		Ok(post)
	}
}

#[async_trait]
impl CommentStore for MemoryStore {
	async fn list_comments(
		&self,
		post_id: i64,
		query: &ListQuery,
	) -> Result<Page<Comment>, StoreError> {
		let inner = self.inner.read().await;

		Ok(query.apply(&query.filter(Some(post_id)), inner.comments.values()))
	}

	async fn find_comment(&self, post_id: i64, id: i64) -> Result<Option<Comment>, StoreError> {
		Ok(self
			.inner
			.read()
			.await
			.comments
			.get(&id)
			.filter(|comment| comment.post_id == post_id)
			.cloned())
	}

	async fn create_comment(
		&self,
		post_id: i64,
		content: &str,
	) -> Result<Option<Comment>, StoreError> {
		let mut inner = self.inner.write().await;

		if !inner.posts.contains_key(&post_id) {
			return Ok(None);
		}

		inner.last_comment_id += 1;

		let comment = Comment {
			id: inner.last_comment_id,
			post_id,
			content: content.to_owned(),
			date: Utc::now(),
		};

		inner.comments.insert(comment.id, comment.clone());

		Ok(Some(comment))
	}

	async fn update_comment(
		&self,
		post_id: i64,
		id: i64,
		content: Option<&str>,
	) -> Result<Option<Comment>, StoreError> {
		let mut inner = self.inner.write().await;
		let Some(comment) = inner
			.comments
			.get_mut(&id)
			.filter(|comment| comment.post_id == post_id)
		else {
			return Ok(None);
		};

		if let Some(content) = content {
			content.clone_into(&mut comment.content);
		}

		Ok(Some(comment.clone()))
	}

	async fn delete_comment(&self, post_id: i64, id: i64) -> Result<Option<Comment>, StoreError> {
		let mut inner = self.inner.write().await;

		if !inner
			.comments
			.get(&id)
			.is_some_and(|comment| comment.post_id == post_id)
		{
			return Ok(None);
		}

		Ok(inner.comments.remove(&id))
	}
}
