use axum::extract::State;
use macros::route;

use crate::{
	extract::{Json, Path, Query},
	openapi::tag,
	query::{ListQuery, Page},
	Posts,
};

use super::{model, Error, RouteError};

/// Get all posts
/// Returns a page of posts. The content can be searched, and the posts sorted by date.
#[route(tag = tag::POST)]
pub async fn get_posts(
	State(posts): State<Posts>,
	Query(query): Query<ListQuery>,
) -> Result<Json<Page<model::Post>>, RouteError> {
	Ok(Json(posts.list_posts(&query).await?))
}

/// Get single post
/// Returns a single post by its unique id.
#[route(tag = tag::POST)]
pub async fn get_post(
	State(posts): State<Posts>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::Post>, RouteError> {
	let post = posts.find_post(path.id).await?;

	Ok(Json(post.ok_or(Error::UnknownPost(path.id))?))
}

/// Create post
/// Creates a new post, dated now.
#[route(tag = tag::POST)]
pub async fn create_post(
	State(posts): State<Posts>,
	Json(input): Json<model::CreatePostInput>,
) -> Result<Json<model::Post>, RouteError> {
	let post = posts.create_post(&input.content).await?;

	tracing::debug!(post_id = post.id, "post created");

	Ok(Json(post))
}

/// Update post
/// Updates the content of an existing post, returning the updated post.
#[route(tag = tag::POST)]
pub async fn update_post(
	State(posts): State<Posts>,
	Path(path): Path<model::IdInput>,
	Json(input): Json<model::UpdatePostInput>,
) -> Result<Json<model::Post>, RouteError> {
	let post = posts
		.update_post(path.id, input.content.as_deref())
		.await?;

	Ok(Json(post.ok_or(Error::UnknownPost(path.id))?))
}

/// Delete post
/// Deletes an existing post and its comments, returning the post as it was.
#[route(tag = tag::POST)]
pub async fn delete_post(
	State(posts): State<Posts>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::Post>, RouteError> {
	let post = posts.delete_post(path.id).await?;

	Ok(Json(post.ok_or(Error::UnknownPost(path.id))?))
}
