use tower_http::cors::{Any, CorsLayer};
use http::{
    Method,
    header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, AUTHORIZATION, ACCEPT}
};

pub fn create_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT, ACCESS_CONTROL_ALLOW_ORIGIN])
}
