use actix_web::{middleware::Compress, web, App, HttpServer};
use actix_cors::Cors;
use utoipa_swagger_ui::SwaggerUi;

use pmthreads::auth::JwtSecret;
use pmthreads::config::AppConfig;
use pmthreads::openapi::ApiDoc;
use pmthreads::rate_limit::{InMemoryRateLimiter, RateLimiterFacade};
use pmthreads::repo::Repo;
use pmthreads::{config, AppState};
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = AppConfig::from_env()?;
    info!(bind = %cfg.bind_addr, frontend = %cfg.frontend_url, "bootstrapping pmthreads");

    let repo = build_repo(&cfg).await?;
    let rate_limiter = RateLimiterFacade::new(
        InMemoryRateLimiter::new(cfg.rate_limit_enabled),
        cfg.rate_limit.clone(),
    );
    let state = AppState { repo, rate_limiter: Some(rate_limiter) };
    let secret = JwtSecret::new(cfg.jwt_secret.clone());
    let openapi = ApiDoc::openapi();
    let frontend_url = cfg.frontend_url.clone();

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:5173")
            .allow_any_header()
            .allowed_methods(["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(secret.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(cfg.bind_addr.as_str())?;

    info!("listening on http://{}", cfg.bind_addr);
    server.run().await?;
    Ok(())
}

#[cfg(not(any(feature = "inmem-store", feature = "postgres-store")))]
compile_error!("enable a repository backend: `inmem-store` or `postgres-store`");

#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
async fn build_repo(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Repo>> {
    info!(data_dir = %cfg.data_dir.display(), "using in-memory repository backend");
    let repo = pmthreads::repo::inmem::InMemRepo::with_data_dir(cfg.data_dir.clone())?;
    Ok(Arc::new(repo))
}

#[cfg(feature = "postgres-store")]
async fn build_repo(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Repo>> {
    use sqlx::postgres::PgPoolOptions;
    let db_url = cfg
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set for postgres-store"))?;
    let pool = PgPoolOptions::new().max_connections(5).connect(db_url).await?;
    let repo = pmthreads::repo::pg::PgRepo::new(pool);
    repo.migrate().await?;
    info!("using Postgres repository backend");
    Ok(Arc::new(repo))
}
