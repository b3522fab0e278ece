use axum::extract::State;
use macros::route;

use crate::{
	extract::{Json, Path, Query},
	openapi::tag,
	query::{ListQuery, Page},
	Comments,
};

use super::{model, Error, RouteError};

/// Get comments
/// Returns a page of the comments on a post. The content can be searched,
/// and the comments sorted by date.
#[route(tag = tag::COMMENT)]
pub async fn get_comments(
	State(comments): State<Comments>,
	Path(path): Path<model::PostIdInput>,
	Query(query): Query<ListQuery>,
) -> Result<Json<Page<model::Comment>>, RouteError> {
	Ok(Json(comments.list_comments(path.post_id, &query).await?))
}

/// Get single comment
/// Returns a single comment by its unique id, if it belongs to the post.
#[route(tag = tag::COMMENT)]
pub async fn get_comment(
	State(comments): State<Comments>,
	Path(path): Path<model::CommentIdInput>,
) -> Result<Json<model::Comment>, RouteError> {
	let comment = comments.find_comment(path.post_id, path.comment_id).await?;

	Ok(Json(comment.ok_or(Error::UnknownComment)?))
}

/// Create comment
/// Leaves a new comment on a post, dated now.
#[route(tag = tag::COMMENT)]
pub async fn create_comment(
	State(comments): State<Comments>,
	Path(path): Path<model::PostIdInput>,
	Json(input): Json<model::CreateCommentInput>,
) -> Result<Json<model::Comment>, RouteError> {
	let comment = comments
		.create_comment(path.post_id, &input.content)
		.await?
		.ok_or(Error::UnknownPost(path.post_id))?;

	tracing::debug!(post_id = path.post_id, comment_id = comment.id, "comment created");

	Ok(Json(comment))
}

/// Update comment
/// Updates the content of an existing comment, returning the updated comment.
#[route(tag = tag::COMMENT)]
pub async fn update_comment(
	State(comments): State<Comments>,
	Path(path): Path<model::CommentIdInput>,
	Json(input): Json<model::UpdateCommentInput>,
) -> Result<Json<model::Comment>, RouteError> {
	let comment = comments
		.update_comment(path.post_id, path.comment_id, input.content.as_deref())
		.await?;

	Ok(Json(comment.ok_or(Error::UnknownComment)?))
}

/// Delete comment
/// Deletes an existing comment, returning it as it was.
#[route(tag = tag::COMMENT)]
pub async fn delete_comment(
	State(comments): State<Comments>,
	Path(path): Path<model::CommentIdInput>,
) -> Result<Json<model::Comment>, RouteError> {
	let comment = comments
		.delete_comment(path.post_id, path.comment_id)
		.await?;

	Ok(Json(comment.ok_or(Error::UnknownComment)?))
}
