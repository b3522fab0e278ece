use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{CommentStore, PostStore, SessionStore, StoreError, UserStore};
use crate::{
	query::{Filter, ListQuery, Page},
	route::{auth::model::User, comment::model::Comment, post::model::Post},
	session::SessionRow,
};

const POST_COLUMNS: &str = "id, content, date";
const COMMENT_COLUMNS: &str = "id, post_id, content, date";

/// Store backed by a Postgres connection pool.
#[derive(Clone, Debug)]
pub struct PgStore {
	pool: PgPool,
}

impl PgStore {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	/// Connects and brings the schema up to date.
	pub async fn connect(url: &str) -> Result<Self, StoreError> {
		let pool = PgPool::connect(url).await?;

		sqlx::migrate!("./migrations")
			.run(&pool)
			.await
			.map_err(sqlx::Error::from)?;

		Ok(Self::new(pool))
	}

	/// Runs the page query and the count query built from the same filter.
	///
	/// The two run on separate pooled connections, so a write landing between
	/// them can make `total` disagree with `data` by that write.
	async fn list<T>(
		&self,
		table: &'static str,
		columns: &'static str,
		filter: &Filter,
		query: &ListQuery,
	) -> Result<Page<T>, StoreError>
	where
		T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
	{
		let data = async {
			let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {columns} FROM {table}"));

			filter.push_where(&mut builder);
			query.push_window(&mut builder);

			builder.build_query_as::<T>().fetch_all(&self.pool).await
		};

		let total = async {
			let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {table}"));

			filter.push_where(&mut builder);

			builder
				.build_query_as::<(i64,)>()
				.fetch_one(&self.pool)
				.await
		};

		let (data, (total,)) = tokio::try_join!(data, total)?;

		Ok(query.page(data, total))
	}
}

fn constraint_error(error: sqlx::Error) -> StoreError {
	if let sqlx::Error::Database(ref database) = error {
		if database.is_unique_violation() {
			return StoreError::Conflict(database.constraint().unwrap_or_default().to_owned());
		}

		if database.is_foreign_key_violation() {
			return StoreError::MissingReference;
		}
	}

	StoreError::Database(error)
}

#[async_trait]
impl UserStore for PgStore {
	async fn create_user(
		&self,
		name: &str,
		username: &str,
		password_hash: &str,
	) -> Result<User, StoreError> {
		sqlx::query_as::<_, User>(
			r#"
				INSERT INTO "user" (name, username, password_hash) VALUES ($1, $2, $3)
				RETURNING id, name, username, password_hash
			"#,
		)
		.bind(name)
		.bind(username)
		.bind(password_hash)
		.fetch_one(&self.pool)
		.await
		.map_err(constraint_error)
	}

	async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
		Ok(sqlx::query_as::<_, User>(
			r#"SELECT id, name, username, password_hash FROM "user" WHERE username = $1"#,
		)
		.bind(username)
		.fetch_optional(&self.pool)
		.await?)
	}
}

#[async_trait]
impl SessionStore for PgStore {
	async fn insert_session(&self, session: &SessionRow) -> Result<(), StoreError> {
		sqlx::query("INSERT INTO session (id, user_id, expires_at) VALUES ($1, $2, $3)")
			.bind(session.id)
			.bind(session.user_id)
			.bind(session.expires_at)
			.execute(&self.pool)
			.await
			.map_err(constraint_error)?;

		Ok(())
	}

	async fn find_session(&self, id: Uuid) -> Result<Option<SessionRow>, StoreError> {
		Ok(
			sqlx::query_as::<_, SessionRow>("SELECT id, user_id, expires_at FROM session WHERE id = $1")
				.bind(id)
				.fetch_optional(&self.pool)
				.await?,
		)
	}

	async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError> {
		let status = sqlx::query("DELETE FROM session WHERE id = $1")
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(status.rows_affected() > 0)
	}

	async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
		let status = sqlx::query("DELETE FROM session WHERE expires_at <= $1")
			.bind(now)
			.execute(&self.pool)
			.await?;

		Ok(status.rows_affected())
	}
}

#[async_trait]
impl PostStore for PgStore {
	async fn list_posts(&self, query: &ListQuery) -> Result<Page<Post>, StoreError> {
		self.list("post", POST_COLUMNS, &query.filter(None), query)
			.await
	}

	async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
		Ok(
			sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLUMNS} FROM post WHERE id = $1"))
				.bind(id)
				.fetch_optional(&self.pool)
				.await?,
		)
	}

	async fn create_post(&self, content: &str) -> Result<Post, StoreError> {
		Ok(sqlx::query_as::<_, Post>(&format!(
			"INSERT INTO post (content) VALUES ($1) RETURNING {POST_COLUMNS}"
		))
		.bind(content)
		.fetch_one(&self.pool)
		.await?)
	}

	async fn update_post(
		&self,
		id: i64,
		content: Option<&str>,
	) -> Result<Option<Post>, StoreError> {
		Ok(sqlx::query_as::<_, Post>(&format!(
			"UPDATE post SET content = COALESCE($1, content) WHERE id = $2 RETURNING {POST_COLUMNS}"
		))
		.bind(content)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?)
	}

	async fn delete_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
		// comments go with it through ON DELETE CASCADE
		Ok(sqlx::query_as::<_, Post>(&format!(
			"DELETE FROM post WHERE id = $1 RETURNING {POST_COLUMNS}"
		))
		.bind(id)
		.fetch_optional(&self.pool)
		.await?)
	}
}

#[async_trait]
impl CommentStore for PgStore {
	async fn list_comments(
		&self,
		post_id: i64,
		query: &ListQuery,
	) -> Result<Page<Comment>, StoreError> {
		self.list("comment", COMMENT_COLUMNS, &query.filter(Some(post_id)), query)
			.await
	}

	async fn find_comment(&self, post_id: i64, id: i64) -> Result<Option<Comment>, StoreError> {
		Ok(sqlx::query_as::<_, Comment>(&format!(
			"SELECT {COMMENT_COLUMNS} FROM comment WHERE post_id = $1 AND id = $2"
		))
		.bind(post_id)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?)
	}

	async fn create_comment(
		&self,
		post_id: i64,
		content: &str,
	) -> Result<Option<Comment>, StoreError> {
		let comment = sqlx::query_as::<_, Comment>(&format!(
			r"
				INSERT INTO comment (post_id, content)
				SELECT id, $2 FROM post WHERE id = $1
				RETURNING {COMMENT_COLUMNS}
			"
		))
		.bind(post_id)
		.bind(content)
		.fetch_optional(&self.pool)
		.await
		.map_err(constraint_error);

		match comment {
			// the post was deleted between the select and the insert
			Err(StoreError::MissingReference) => Ok(None),
			comment => comment,
		}
	}

	async fn update_comment(
		&self,
		post_id: i64,
		id: i64,
		content: Option<&str>,
	) -> Result<Option<Comment>, StoreError> {
		Ok(sqlx::query_as::<_, Comment>(&format!(
			r"
				UPDATE comment SET content = COALESCE($3, content)
				WHERE post_id = $1 AND id = $2
				RETURNING {COMMENT_COLUMNS}
			"
		))
		.bind(post_id)
		.bind(id)
		.bind(content)
		.fetch_optional(&self.pool)
		.await?)
	}

	async fn delete_comment(&self, post_id: i64, id: i64) -> Result<Option<Comment>, StoreError> {
		Ok(sqlx::query_as::<_, Comment>(&format!(
			"DELETE FROM comment WHERE post_id = $1 AND id = $2 RETURNING {COMMENT_COLUMNS}"
		))
		.bind(post_id)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?)
	}
}
