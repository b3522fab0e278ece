use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Post not found")]
	UnknownPost(i64),
	/// Also used when the comment exists but under another post.
	#[error("Comment not found")]
	UnknownComment,
}

pub type RouteError = error::RouteError<Error>;

/// Mounted under `/posts`.
pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/:id/comments",
			get_with(get_comments, get_comments_docs).post_with(create_comment, create_comment_docs),
		)
		.api_route(
			"/:id/comments/:comment_id",
			get_with(get_comment, get_comment_docs)
				.patch_with(update_comment, update_comment_docs)
				.delete_with(delete_comment, delete_comment_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) | Self::UnknownComment => StatusCode::NOT_FOUND,
		}
	}
}
