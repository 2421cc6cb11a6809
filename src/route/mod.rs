use std::{sync::Arc, time::Duration};

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{http::Response, Extension, Router};
use tower::ServiceBuilder;
use tower_http::{
	compression::CompressionLayer,
	cors::CorsLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::{Level, Span};

use crate::{openapi, AppState};

pub mod docs;
pub mod model;
pub mod post;

/// Records request latency as a histogram picked up by the metrics layer.
fn on_response<B>(response: &Response<B>, latency: Duration, _span: &Span) {
	tracing::info!(
		histogram.latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
		status = response.status().as_u16(),
		"finished request"
	);
}

/// Builds the application with its documentation and middleware.
pub fn app(state: AppState) -> Router {
	aide::gen::extract_schemas(true);

	let mut api = OpenApi::default();

	ApiRouter::new()
		.nest_api_service("/docs", docs::routes())
		.nest_api_service("/posts", post::routes().with_state(state))
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.layer(
			ServiceBuilder::new()
				.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
				.layer(
					TraceLayer::new_for_http()
						.make_span_with(DefaultMakeSpan::new().level(Level::INFO))
						.on_response(on_response),
				)
				.layer(PropagateRequestIdLayer::x_request_id())
				.layer(CompressionLayer::new())
				.layer(CorsLayer::permissive()),
		)
}
