use tower::layer::util::{Identity, Stack};
use tower::ServiceBuilder;
use tower_http::map_response_body::MapResponseBodyLayer;
use tower_http::trace::HttpMakeClassifier;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

pub fn init_tracing(cfg: &Config) {
    let registry = tracing_subscriber::registry().with(EnvFilter::from_default_env());
    if cfg.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

pub fn stack(
    body_limit: usize,
) -> ServiceBuilder<
    Stack<
        RequestBodyLimitLayer,
        Stack<
            MapResponseBodyLayer<BoxResponseBody>,
            Stack<CorsLayer, Stack<TraceLayer<HttpMakeClassifier>, Identity>>,
        >,
    >,
> {
    let trace = TraceLayer::new_for_http();
    let cors = CorsLayer::permissive();
    let limit = RequestBodyLimitLayer::new(body_limit);

    // Erases the limit layer's response body type so `Cors` (which needs a
    // `Default` body) type-checks; no behavioral effect.
    let boxed = MapResponseBodyLayer::new(axum::body::Body::new as BoxResponseBody);

    ServiceBuilder::new().layer(trace).layer(cors).layer(boxed).layer(limit)
}

type BoxResponseBody =
    fn(tower_http::limit::ResponseBody<axum::body::Body>) -> axum::body::Body;
