#![warn(clippy::pedantic)]

mod config;
mod error;
mod extract;
mod model;
mod openapi;
mod ratelimit;
mod route;
mod store;
mod trace;


use std::{net::SocketAddr, sync::Arc};

use axum::{extract::Request, ServiceExt};
use tower::Layer;
use tower_governor::GovernorLayer;
use tower_http::normalize_path::NormalizePathLayer;

use crate::{
	config::Config,
	store::{MemoryStore, PgStore},
};

pub type Database = Arc<dyn store::Store>;
pub type AppState = State;

/// The shared application state.
///
/// Handlers only reach persistence through the [`store::Store`] trait, so the
/// same routes run against PostgreSQL or the in-memory store.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
}

/// Opens the configured store. Without a database URL, an in-memory store is
/// used and optionally seeded with a demo user.
async fn connect(config: &Config) -> Result<Database, store::Error> {
	if let Some(url) = &config.database_url {
		return Ok(Arc::new(PgStore::connect(url).await?));
	}

	tracing::warn!("DATABASE_URL is not set, posts are kept in memory");

	let store = MemoryStore::default();

	if let Some(username) = &config.demo_user {
		let user = store.insert_user(username).await;
		let api_key = store.insert_api_key(user.id).await;
		let session = store.insert_session(user.id).await;

		tracing::info!(user = %user.id, %api_key, %session, "seeded demo user {username}");
	}

	Ok(Arc::new(store))
}

#[tokio::main]
async fn main() {
	let config = Config::from_env().expect("invalid configuration");
	let _guard =
		trace::init_tracing_subscriber(&config).expect("failed to initialize tracing");

	let state = State {
		database: connect(&config)
			.await
			.expect("failed to connect to database"),
	};

	let governor = ratelimit::default().expect("invalid rate limit configuration");
	ratelimit::cleanup_old_limits(&[&governor]);

	let app = route::app(state).layer(GovernorLayer { config: governor });
	let app = NormalizePathLayer::trim_trailing_slash().layer(app);

	let listener = tokio::net::TcpListener::bind((config.host, config.port))
		.await
		.expect("failed to bind to port");

	tracing::info!("listening on {}:{}", config.host, config.port);

	axum::serve(
		listener,
		ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
	)
	.await
	.expect("server error");
}
