//! Request logging and the CORS policy for the JSON API.

use actix_cors::Cors;
use actix_web::middleware::Logger;

/// remote-ip "request-line" status-code response-size and the time taken.
pub fn standard_middleware() -> Logger {
    Logger::new(r#"%a "%r" %s %b %Dms"#)
}

/// The `/api` routes are read by the map script, which may be served from
/// another origin. Mutating calls still need the session cookie.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST"])
        .max_age(3600)
}
