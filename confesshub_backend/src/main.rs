use actix_cors::Cors;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    cookie::Key,
    http::header,
    middleware::{DefaultHeaders, Logger},
    web, App, HttpServer,
};
use clap::Parser;
use confesshub_backend::{config::Config, routes, AppState};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "confesshub_server", author, version, about = "Starts the ConfessHub API server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

fn fatal(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("FATAL: {}: {}", context, err))
}

fn build_cors(allowed_origins: &str) -> Cors {
    let cors = if allowed_origins.trim() == "*" {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file).map_err(|e| fatal("Failed to load or parse configuration", e))?;

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    let state = AppState::open(Path::new(&config.database_path), config.app_settings())
        .map_err(|e| fatal("Failed to open databases", e))?;
    let app_state = web::Data::new(state);
    log::info!(
        "Databases ready at '{}' and '{}'",
        config.accounts_db_path().display(),
        config.posts_db_path().display()
    );

    let session_key_bytes =
        hex::decode(&config.session_secret_key).map_err(|e| fatal("SESSION_SECRET_KEY is not a valid hex string", e))?;
    let session_key =
        Key::try_from(session_key_bytes.as_slice()).map_err(|e| fatal("SESSION_SECRET_KEY is too short (64 bytes required)", e))?;

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("Server starting at http://{}", server_address);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
            .cookie_secure(config.use_secure_cookies)
            .cookie_http_only(true)
            .cookie_same_site(actix_web::cookie::SameSite::Lax)
            .build();

        App::new()
            .wrap(session_mw)
            .wrap(build_cors(&config.allowed_origins))
            .wrap(Logger::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block")),
            )
            .app_data(app_state.clone())
            .configure(routes::config_api)
    })
    .bind(server_address)?
    .run()
    .await
}
