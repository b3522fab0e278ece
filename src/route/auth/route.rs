use aide::axum::IntoApiResponse;
use axum::{
	extract::State,
	http::{header, StatusCode},
};
use macros::route;

use crate::{
	extract::{Json, Session},
	openapi::tag,
	session::SessionManager,
	store::StoreError,
	AppState,
};

use super::{model, Error, RouteError};

/// Sign up
/// Creates an account and signs in to it, returning an associated session cookie.
#[route(tag = tag::AUTH, response(status = 201, description = "Signed up successfully.", shape = "Json<model::AuthResponse>"))]
pub async fn sign_up(
	State(state): State<AppState>,
	Json(input): Json<model::SignUpInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let hash = state.hasher.hash(&input.password).map_err(Error::Hash)?;

	let user = state
		.users
		.create_user(&input.name, &input.username, &hash)
		.await
		.map_err(|e| match e {
			StoreError::Conflict(..) => Error::UsernameTaken.into(),
			e => RouteError::from(e),
		})?;

	let (_, cookie) = state.sessions.create(user.id).await?;

	tracing::info!(user_id = user.id, "user signed up");

	Ok((
		StatusCode::CREATED,
		[(header::SET_COOKIE, cookie)],
		Json(model::AuthResponse {
			message: "You have been signed up!".into(),
			user,
		}),
	))
}

/// Sign in
/// Signs in to an account, returning an associated session cookie.
#[route(tag = tag::AUTH, response(status = 200, description = "Signed in successfully.", shape = "Json<model::AuthResponse>"))]
pub async fn sign_in(
	State(state): State<AppState>,
	Json(input): Json<model::SignInInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let user = state.users.find_user_by_username(&input.username).await?;

	// an unknown username costs as much as a wrong password
	let verified = match &user {
		Some(user) => state.hasher.verify(&user.password_hash, &input.password),
		None => state.hasher.verify_absent(&input.password),
	};

	let (Some(user), true) = (user, verified) else {
		tracing::info!("rejected sign-in");
		return Err(Error::InvalidUsernameOrPassword.into());
	};

	let (_, cookie) = state.sessions.create(user.id).await?;

	tracing::info!(user_id = user.id, "user signed in");

	Ok((
		[(header::SET_COOKIE, cookie)],
		Json(model::AuthResponse {
			message: "You have been signed in!".into(),
			user,
		}),
	))
}

/// Sign out
/// Ends the current session and clears the session cookie.
#[route(tag = tag::AUTH, response(status = 200, description = "Signed out successfully.", shape = "Json<model::MessageResponse>"))]
pub async fn sign_out(
	State(sessions): State<SessionManager>,
	session: Session,
) -> Result<impl IntoApiResponse, RouteError> {
	sessions.invalidate(session.id).await?;

	tracing::info!(user_id = session.user_id, "user signed out");

	Ok((
		[(header::SET_COOKIE, sessions.blank_cookie())],
		Json(model::MessageResponse {
			message: "You have been signed out!".into(),
		}),
	))
}
