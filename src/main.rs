#![warn(clippy::pedantic)]

mod config;
mod cookie;
mod error;
mod extract;
mod openapi;
mod password;
mod query;
mod route;
mod session;
mod store;
mod trace;

use std::{process::ExitCode, sync::Arc};

use aide::openapi::OpenApi;
use axum::{
	body::Body,
	extract::FromRef,
	http::Request,
	Extension, Router,
};
use tower::ServiceBuilder;
use tower_http::{
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};
use tracing::Span;

use crate::{
	config::Config,
	password::Hasher,
	session::SessionManager,
	store::{CommentStore, MemoryStore, PgStore, PostStore, SessionStore, UserStore},
};

pub type Users = Arc<dyn UserStore>;
pub type Posts = Arc<dyn PostStore>;
pub type Comments = Arc<dyn CommentStore>;
pub type AppState = State;

/// The shared application state.
///
/// Every store is a trait object, so the same handlers run against Postgres
/// in production and against memory in tests.
#[derive(Clone, FromRef)]
pub struct State {
	pub users: Users,
	pub posts: Posts,
	pub comments: Comments,
	pub sessions: SessionManager,
	pub hasher: Hasher,
}

impl State {
	/// Builds the state around a single store that backs every resource.
	pub fn new<S>(store: Arc<S>, config: &Config) -> Result<Self, argon2::Error>
	where
		S: UserStore + SessionStore + PostStore + CommentStore + 'static,
	{
		Ok(Self {
			users: store.clone(),
			posts: store.clone(),
			comments: store.clone(),
			sessions: SessionManager::new(store, config.session.clone()),
			hasher: Hasher::new(&config.hash)?,
		})
	}
}

/// Builds the full application, with its OpenAPI document served at `/docs/api.json`.
pub fn app(state: AppState) -> Router {
	let mut api = OpenApi::default();

	route::routes()
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.layer(
			ServiceBuilder::new()
				.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
				.layer(TraceLayer::new_for_http().make_span_with(make_span))
				.layer(PropagateRequestIdLayer::x_request_id()),
		)
		.with_state(state)
}

/// Headers are left out, since they carry session cookies.
fn make_span(request: &Request<Body>) -> Span {
	let request_id = request
		.headers()
		.get("x-request-id")
		.and_then(|value| value.to_str().ok())
		.unwrap_or("none");

	tracing::info_span!(
		"request",
		method = %request.method(),
		path = request.uri().path(),
		request_id,
	)
}

async fn shutdown_signal() {
	if let Err(error) = tokio::signal::ctrl_c().await {
		tracing::error!(%error, "failed to listen for ctrl-c");
	}

	tracing::info!("shutting down");
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
	let state = match &config.database_url {
		Some(url) => State::new(Arc::new(PgStore::connect(url).await?), &config)?,
		None => {
			tracing::warn!("DATABASE_URL is not set, data only lives as long as the process");
			State::new(Arc::new(MemoryStore::default()), &config)?
		}
	};

	session::spawn_cleanup(state.sessions.clone());

	let listener = tokio::net::TcpListener::bind((config.host, config.port)).await?;

	tracing::info!("listening on {}", listener.local_addr()?);

	axum::serve(listener, app(state))
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
	let config = match Config::from_env() {
		Ok(config) => config,
		Err(error) => {
			eprintln!("invalid configuration: {error}");
			return ExitCode::FAILURE;
		}
	};

	let _guard = match trace::init_tracing_subscriber(config.otlp) {
		Ok(guard) => guard,
		Err(error) => {
			eprintln!("failed to set up tracing: {error}");
			return ExitCode::FAILURE;
		}
	};

	match run(config).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(error) => {
			tracing::error!(%error, "server stopped");
			ExitCode::FAILURE
		}
	}
}
