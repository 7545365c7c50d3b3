use crate::error::ApiError;
use crate::middleware::AdminSessionValidation;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Deserializer, Serialize};

pub mod admin;
pub mod auth;
pub mod public;
pub mod reports;

/// JSON body limit for every endpoint.
const MAX_JSON_BYTES: usize = 64 * 1024;

#[derive(Serialize)]
struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

/// `{"success": true, ...body}`. `body` must serialize as a map.
pub(crate) fn success<T: Serialize>(body: T) -> HttpResponse {
    HttpResponse::Ok().json(Success { success: true, body })
}

/// Accepts either `["a", "b"]` or the comma separated `"a,b"`.
pub(crate) fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrVec {
        String(String),
        Vec(Vec<String>),
    }

    match StringOrVec::deserialize(deserializer)? {
        StringOrVec::String(s) => Ok(s
            .split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect()),
        StringOrVec::Vec(v) => Ok(v),
    }
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_JSON_BYTES)
        .error_handler(|err, _req| {
            log::warn!("Rejected request body: {}", err);
            ApiError::BadRequest(format!("Invalid request body: {}", err)).into()
        })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("Invalid query string: {}", err)).into()
    })
}

pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).app_data(query_config()).service(
        web::scope("/api")
            .configure(public::config_api)
            .configure(auth::config_api)
            .configure(reports::config_api)
            .service(
                web::scope("/admin")
                    .wrap(AdminSessionValidation)
                    .configure(admin::config_api),
            ),
    );
}
