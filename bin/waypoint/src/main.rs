//! # Waypoint Binary
//!
//! The entry point that assembles the application based on compile-time features.

mod config;

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use wp_api::{configure_routes, middleware, AppState};
use wp_core::traits::{AuthProvider, MediaStore};
use wp_services::Services;

#[cfg(feature = "db-sqlite")]
use wp_db_sqlite::SqliteStore;

#[cfg(feature = "storage-local")]
use wp_storage_local::LocalMediaStore;

#[cfg(feature = "auth-simple")]
use wp_auth_simple::SimpleAuthProvider;

#[cfg(not(all(feature = "db-sqlite", feature = "storage-local", feature = "auth-simple")))]
compile_error!("waypoint needs one database, one storage and one auth plugin enabled");

use config::AppConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env();

    // 1. Database
    #[cfg(feature = "db-sqlite")]
    let db = Arc::new(
        SqliteStore::new(&config.database_url)
            .await
            .with_context(|| format!("failed to open {}", config.database_url))?,
    );

    // 2. Photo storage
    #[cfg(feature = "storage-local")]
    let store: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::new(config.upload_dir.clone()));

    // 3. Passwords and sessions
    #[cfg(feature = "auth-simple")]
    let auth: Arc<dyn AuthProvider> = Arc::new(SimpleAuthProvider::new(&config.session_secret)?);

    let state = web::Data::new(AppState {
        services: Services::new(db.clone(), db.clone(), db, auth.clone()),
        store,
        auth,
    });

    std::fs::create_dir_all(&config.upload_dir)
        .with_context(|| format!("failed to create {}", config.upload_dir.display()))?;
    let upload_dir = config.upload_dir.clone();

    log::info!("Waypoint listening on http://{}", config.bind);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::standard_middleware())
            .app_data(state.clone())
            .service(actix_files::Files::new("/uploads", &upload_dir))
            .configure(configure_routes)
    })
    .bind(&config.bind)
    .with_context(|| format!("failed to bind {}", config.bind))?
    .run()
    .await?;

    Ok(())
}
