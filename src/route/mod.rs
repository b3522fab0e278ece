use aide::axum::ApiRouter;

use crate::AppState;

pub mod auth;
pub mod comment;
pub mod docs;
pub mod post;

pub fn routes() -> ApiRouter<AppState> {
	ApiRouter::new()
		.merge(auth::routes())
		.nest("/posts", post::routes().merge(comment::routes()))
		.nest("/docs", docs::routes())
}
