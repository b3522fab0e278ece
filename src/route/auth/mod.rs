use std::borrow::Cow;

use aide::axum::{routing::post_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information. In particular, an unknown username and a wrong password
/// share one variant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid username or password")]
	InvalidUsernameOrPassword,
	#[error("You need to sign in first")]
	Unauthenticated,
	#[error("Username already taken")]
	UsernameTaken,
	#[error("password hashing failed: {0}")]
	Hash(argon2::password_hash::Error),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/sign-up", post_with(sign_up, sign_up_docs))
		.api_route("/sign-in", post_with(sign_in, sign_in_docs))
		.api_route("/sign-out", post_with(sign_out, sign_out_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::InvalidUsernameOrPassword | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
			Self::UsernameTaken => StatusCode::CONFLICT,
			Self::Hash(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn message(&self) -> Cow<'static, str> {
		match self {
			Self::Hash(..) => "internal server error".into(),
			_ => self.to_string().into(),
		}
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_signup_flow() {
		let app = app();

		let response = sign_up(&app, "john", "hunter2hunter").await;

		assert_eq!(response.status_code(), StatusCode::CREATED);
		assert!(response
			.header("set-cookie")
			.to_str()
			.unwrap()
			.contains("session="));

		let body = response.json::<Value>();
		let id = body["user"]["id"].clone();

		assert_eq!(body["message"], "You have been signed up!");
		assert_eq!(body["user"]["name"], "John Smith");
		assert_eq!(body["user"]["username"], "john");
		assert!(body["user"].get("password_hash").is_none());
		assert!(body["user"].get("password").is_none());

		let response = sign_in(&app, "john", "hunter2hunter").await;

		assert_eq!(response.status_code(), StatusCode::OK);
		assert!(response
			.header("set-cookie")
			.to_str()
			.unwrap()
			.contains("session="));

		let body = response.json::<Value>();

		assert_eq!(body["message"], "You have been signed in!");
		assert_eq!(body["user"]["id"], id);
		assert_eq!(body["user"]["username"], "john");
	}

	#[tokio::test]
	async fn test_signup_conflict() {
		let app = app();

		sign_up(&app, "john", "hunter2hunter").await;

		let response = sign_up(&app, "john", "a different password").await;

		assert_eq!(response.status_code(), StatusCode::CONFLICT);
		assert_eq!(response.json::<Value>()["message"], "Username already taken");
		assert!(response.headers().get("set-cookie").is_none());
	}

	#[tokio::test]
	async fn test_signup_validation() {
		let app = app();

		for body in [
			json!({ "name": "", "username": "john", "password": "hunter2hunter" }),
			json!({ "name": "John", "username": "jo", "password": "hunter2hunter" }),
			json!({ "name": "John", "username": "john!", "password": "hunter2hunter" }),
			json!({ "name": "John", "username": "john", "password": "short" }),
			json!({ "username": "john", "password": "hunter2hunter" }),
			json!({ "name": 5, "username": "john", "password": "hunter2hunter" }),
		] {
			let response = app.post("/sign-up").json(&body).await;

			assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
			assert!(response.json::<Value>()["message"].is_string());
		}
	}

	#[tokio::test]
	async fn test_signin_does_not_enumerate_users() {
		let app = app();

		sign_up(&app, "john", "hunter2hunter").await;

		let wrong_password = sign_in(&app, "john", "hunter3hunter").await;
		let unknown_user = sign_in(&app, "jane", "hunter2hunter").await;

		assert_eq!(wrong_password.status_code(), StatusCode::UNAUTHORIZED);
		assert_eq!(unknown_user.status_code(), StatusCode::UNAUTHORIZED);
		assert_eq!(
			wrong_password.json::<Value>(),
			unknown_user.json::<Value>()
		);
		assert!(wrong_password.headers().get("set-cookie").is_none());
		assert!(unknown_user.headers().get("set-cookie").is_none());
	}

	#[tokio::test]
	async fn test_signout_flow() {
		let app = app();

		let cookie = session_cookie(&sign_up(&app, "john", "hunter2hunter").await);

		let response = app
			.post("/sign-out")
			.add_header(header::COOKIE, cookie.clone())
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);
		assert_eq!(
			response.json::<Value>()["message"],
			"You have been signed out!"
		);

		let cleared = response.header("set-cookie");
		let cleared = cleared.to_str().unwrap();

		assert!(cleared.starts_with("session=;"));
		assert!(cleared.contains("Max-Age=0"));

		// the session is gone, so the same cookie no longer signs out
		let response = app
			.post("/sign-out")
			.add_header(header::COOKIE, cookie)
			.await;

		assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
	}

	#[tokio::test]
	async fn test_signout_requires_session() {
		let app = app();

		let missing = app.post("/sign-out").await;
		let garbage = app
			.post("/sign-out")
			.add_header(header::COOKIE, HeaderValue::from_static("session=garbage"))
			.await;
		let unknown = app
			.post("/sign-out")
			.add_header(
				header::COOKIE,
				HeaderValue::from_static("session=8c5a3e9e-6f0b-4f7e-9a51-0d3c1b2a4e6f"),
			)
			.await;

		for response in [missing, garbage, unknown] {
			assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
			assert_eq!(
				response.json::<Value>()["message"],
				"You need to sign in first"
			);
		}
	}

	#[tokio::test]
	async fn test_sessions_are_independent() {
		let app = app();

		let first = session_cookie(&sign_up(&app, "john", "hunter2hunter").await);
		let second = session_cookie(&sign_in(&app, "john", "hunter2hunter").await);

		assert_ne!(first, second);

		let response = app
			.post("/sign-out")
			.add_header(header::COOKIE, first)
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let response = app
			.post("/sign-out")
			.add_header(header::COOKIE, second)
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);
	}
}
