use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request},
};
use uuid::Uuid;

use crate::{error::RouteError, openapi::SECURITY_SCHEME_SESSION, route::auth, session::SessionManager};

/// Extracts the active session from the request's cookies.
///
/// A missing, malformed, unknown or expired session cookie is rejected
/// with [`auth::Error::Unauthenticated`].
///
/// ```rust
/// async fn route(session: Session) {
///   println!("{}", session.user_id);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub id: Uuid,
	pub user_id: i64,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	SessionManager: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		// browsers send one header, but http/2 clients may split it
		let cookies = parts
			.headers
			.get_all(header::COOKIE)
			.into_iter()
			.filter_map(|value| value.to_str().ok())
			.collect::<Vec<_>>()
			.join("; ");

		let sessions = SessionManager::from_ref(state);
		let session = sessions
			.validate(Some(&cookies))
			.await?
			.ok_or(auth::Error::Unauthenticated)?;

		Ok(Self {
			id: session.id,
			user_id: session.user_id,
		})
	}
}

impl OperationInput for Session {
	/// Adds a session cookie requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.push(
			[(SECURITY_SCHEME_SESSION.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		);
	}
}
