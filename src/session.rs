use std::{sync::Arc, time::Duration};

use chrono::{TimeDelta, Utc};
use cookie::SameSite;
use uuid::Uuid;

use crate::{
	cookie::{Attributes, CookieCodec, Rfc6265},
	store::{SessionStore, StoreError},
};

/// The longest session lifetime the configuration accepts, ten years.
pub const MAX_TTL_SECONDS: i64 = 60 * 60 * 24 * 365 * 10;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
	#[error("session lifetime of {0} seconds is out of range")]
	TtlOutOfRange(i64),
	#[error(transparent)]
	Store(#[from] StoreError),
}

/// A persisted session, bound to a user until it expires or is invalidated.
#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct SessionRow {
	pub id: Uuid,
	pub user_id: i64,
	pub expires_at: chrono::DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
	pub cookie_name: String,
	/// Fixed lifetime of a session from sign-in.
	pub ttl_seconds: i64,
	/// How often expired sessions are purged from the store.
	pub cleanup_seconds: u64,
	pub secure: bool,
	pub same_site: SameSite,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			cookie_name: "session".into(),
			ttl_seconds: 60 * 60 * 24 * 30,
			cleanup_seconds: 60 * 60,
			secure: true,
			same_site: SameSite::Lax,
		}
	}
}

/// Creates, validates and invalidates session tokens.
///
/// Tokens are random v4 UUIDs. Every session row is keyed by its own token,
/// so concurrent sign-ins and sign-outs for one user never contend.
#[derive(Clone)]
pub struct SessionManager {
	store: Arc<dyn SessionStore>,
	codec: Arc<dyn CookieCodec>,
	config: SessionConfig,
}

impl SessionManager {
	pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
		Self::with_codec(store, Arc::new(Rfc6265), config)
	}

	pub fn with_codec(
		store: Arc<dyn SessionStore>,
		codec: Arc<dyn CookieCodec>,
		config: SessionConfig,
	) -> Self {
		Self {
			store,
			codec,
			config,
		}
	}

	/// Starts a session for the user, returning its token and a
	/// `Set-Cookie` value carrying it.
	pub async fn create(&self, user_id: i64) -> Result<(Uuid, String), SessionError> {
		let ttl = self.config.ttl_seconds;
		let expires_at = TimeDelta::try_seconds(ttl)
			.and_then(|ttl| Utc::now().checked_add_signed(ttl))
			.ok_or(SessionError::TtlOutOfRange(ttl))?;

		let session = SessionRow {
			id: Uuid::new_v4(),
			user_id,
			expires_at,
		};

		self.store.insert_session(&session).await?;

		let cookie = self.codec.encode(
			&self.config.cookie_name,
			&session.id.to_string(),
			&Attributes {
				max_age: Some(cookie::time::Duration::seconds(ttl)),
				expired: false,
				..self.attributes()
			},
		);

		Ok((session.id, cookie))
	}

	/// Reads the session token out of a raw `Cookie` header.
	///
	/// A missing header, a missing cookie or a value that is not a token
	/// all yield `None`.
	pub fn token(&self, header: Option<&str>) -> Option<Uuid> {
		let cookies = self.codec.decode(header?);
		let value = cookies.get(&self.config.cookie_name)?;

		Uuid::parse_str(value).ok()
	}

	/// Resolves a raw `Cookie` header to the active session it carries.
	///
	/// Sessions past their expiry are deleted on sight.
	pub async fn validate(&self, header: Option<&str>) -> Result<Option<SessionRow>, StoreError> {
		let Some(token) = self.token(header) else {
			return Ok(None);
		};

		let Some(session) = self.store.find_session(token).await? else {
			return Ok(None);
		};

		if session.expires_at <= Utc::now() {
			self.store.delete_session(token).await?;
			return Ok(None);
		}

		Ok(Some(session))
	}

	/// Ends a session. Unknown or already-ended tokens are not an error.
	pub async fn invalidate(&self, token: Uuid) -> Result<(), StoreError> {
		if !self.store.delete_session(token).await? {
			tracing::debug!(%token, "session was already gone");
		}

		Ok(())
	}

	/// A `Set-Cookie` value that clears the session cookie.
	pub fn blank_cookie(&self) -> String {
		self.codec.encode(
			&self.config.cookie_name,
			"",
			&Attributes {
				max_age: Some(cookie::time::Duration::ZERO),
				expired: true,
				..self.attributes()
			},
		)
	}

	/// Removes every expired session, returning how many were removed.
	pub async fn purge_expired(&self) -> Result<u64, StoreError> {
		self.store.delete_expired_sessions(Utc::now()).await
	}

	fn attributes(&self) -> Attributes {
		Attributes {
			path: "/",
			http_only: true,
			secure: self.config.secure,
			same_site: self.config.same_site,
			max_age: None,
			expired: false,
		}
	}
}

/// Periodically purges expired sessions in the background.
pub fn spawn_cleanup(sessions: SessionManager) -> tokio::task::JoinHandle<()> {
	let period = Duration::from_secs(sessions.config.cleanup_seconds.max(1));

	tokio::spawn(async move {
		let mut interval = tokio::time::interval(period);

		loop {
			interval.tick().await;

			match sessions.purge_expired().await {
				Ok(removed) => tracing::debug!(removed, "purged expired sessions"),
				Err(error) => tracing::error!(%error, "failed to purge expired sessions"),
			}
		}
	})
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::store::{MemoryStore, UserStore};

	async fn manager(ttl_seconds: i64) -> (SessionManager, i64) {
		let store = Arc::new(MemoryStore::default());
		let user = store.create_user("John", "john", "hash").await.unwrap();

		let manager = SessionManager::new(
			store,
			SessionConfig {
				ttl_seconds,
				..SessionConfig::default()
			},
		);

		(manager, user.id)
	}

	fn header(token: Uuid) -> String {
		format!("theme=dark; session={token}")
	}

	#[tokio::test]
	async fn test_create_then_validate() {
		let (manager, user_id) = manager(60).await;
		let (token, cookie) = manager.create(user_id).await.unwrap();

		assert!(cookie.starts_with(&format!("session={token}")));
		assert!(cookie.contains("HttpOnly"));
		assert!(cookie.contains("Path=/"));
		assert!(cookie.contains("SameSite=Lax"));
		assert!(cookie.contains("Max-Age=60"));

		let session = manager.validate(Some(&header(token))).await.unwrap();

		assert_eq!(session.map(|s| s.user_id), Some(user_id));
	}

	#[tokio::test]
	async fn test_tokens_are_unique() {
		let (manager, user_id) = manager(60).await;
		let (first, _) = manager.create(user_id).await.unwrap();
		let (second, _) = manager.create(user_id).await.unwrap();

		assert_ne!(first, second);
		assert!(manager.validate(Some(&header(first))).await.unwrap().is_some());
		assert!(manager.validate(Some(&header(second))).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn test_create_for_unknown_user() {
		let (manager, user_id) = manager(60).await;

		assert!(matches!(
			manager.create(user_id + 1).await,
			Err(SessionError::Store(StoreError::MissingReference))
		));
	}

	#[tokio::test]
	async fn test_create_with_overflowing_ttl() {
		for ttl in [i64::MAX, 100_000_000_000_000_000] {
			let (manager, user_id) = manager(ttl).await;

			assert!(matches!(
				manager.create(user_id).await,
				Err(SessionError::TtlOutOfRange(..))
			));
		}
	}

	#[tokio::test]
	async fn test_validate_tolerates_bad_headers() {
		let (manager, _) = manager(60).await;

		for header in [
			None,
			Some(""),
			Some("session"),
			Some("session="),
			Some("session=not-a-uuid"),
			Some("other=1"),
		] {
			assert_eq!(manager.validate(header).await.unwrap(), None);
		}

		let unknown = header(Uuid::new_v4());
		assert_eq!(manager.validate(Some(&unknown)).await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_invalidate_is_idempotent() {
		let (manager, user_id) = manager(60).await;
		let (token, _) = manager.create(user_id).await.unwrap();

		manager.invalidate(token).await.unwrap();
		assert_eq!(manager.validate(Some(&header(token))).await.unwrap(), None);

		manager.invalidate(token).await.unwrap();
		assert_eq!(manager.validate(Some(&header(token))).await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_expired_session_is_invalid() {
		let (manager, user_id) = manager(-1).await;
		let (token, _) = manager.create(user_id).await.unwrap();

		assert_eq!(manager.validate(Some(&header(token))).await.unwrap(), None);
	}

	#[tokio::test]
	async fn test_purge_expired() {
		let (manager, user_id) = manager(-1).await;

		manager.create(user_id).await.unwrap();
		manager.create(user_id).await.unwrap();

		assert_eq!(manager.purge_expired().await.unwrap(), 2);
		assert_eq!(manager.purge_expired().await.unwrap(), 0);
	}

	#[test]
	fn test_blank_cookie() {
		let manager = SessionManager::new(
			Arc::new(MemoryStore::default()),
			SessionConfig::default(),
		);
		let cookie = manager.blank_cookie();

		assert!(cookie.starts_with("session=;"));
		assert!(cookie.contains("Max-Age=0"));
		assert!(cookie.contains("HttpOnly"));
		assert!(cookie.contains("Expires="));
	}
}
