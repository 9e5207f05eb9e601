use actix_web::web;
use log::debug;

use crate::errors::ServerError;

/// JSON body extraction that reports malformed bodies as `{"error": ...}` with a 400 status, like every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        debug!("💻️ Malformed request body for {}. {err}", req.path());
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

/// Path extraction with the same error format as [`json_config`].
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, req| {
        debug!("💻️ Malformed request path {}. {err}", req.path());
        ServerError::ValidationError(format!("Invalid request path: {err}")).into()
    })
}
