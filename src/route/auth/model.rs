use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

fn validate_username(username: &str) -> Result<(), ValidationError> {
	if username.chars().any(|c| !c.is_ascii_alphanumeric()) {
		return Err(ValidationError::new("username must be alphanumeric"));
	}

	Ok(())
}

/// A single user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, JsonSchema, sqlx::FromRow)]
pub struct User {
	/// The unique identifier of the user.
	pub id: i64,
	/// The user's display name.
	pub name: String,
	/// The unique name used to sign in.
	pub username: String,
	/// The Argon2id PHC string. Never leaves the server.
	#[serde(skip)]
	#[schemars(skip)]
	pub password_hash: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct SignUpInput {
	#[validate(length(min = 1, max = 64))]
	pub name: String,
	/// The unique name used to sign in.
	#[validate(length(min = 3, max = 16), custom(function = "validate_username"))]
	pub username: String,
	#[validate(length(min = 8, max = 128))]
	pub password: String,
}

/// Only the shape is checked here, so a malformed username and a wrong one
/// are rejected the same way further down.
#[derive(Deserialize, Validate, JsonSchema)]
pub struct SignInInput {
	#[validate(length(min = 1, max = 16))]
	pub username: String,
	#[validate(length(min = 1, max = 128))]
	pub password: String,
}

#[derive(Serialize, JsonSchema)]
pub struct AuthResponse {
	pub message: String,
	pub user: User,
}

#[derive(Serialize, JsonSchema)]
pub struct MessageResponse {
	pub message: String,
}
