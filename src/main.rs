use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Compress, web, App, HttpServer};
use anyhow::Context;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use agora::auth::TokenIssuer;
use agora::openapi::ApiDoc;
use agora::repo::Repo;
use agora::{config, AppConfig, AppState, SecurityHeaders};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds; production sets the environment externally.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = AppConfig::from_env()?;
    info!("Bootstrapping agora forum server");
    info!(frontend = %cfg.frontend_url, hsts = cfg.enable_hsts, admins = cfg.bootstrap_admins.len(), "configuration loaded");

    let repo = build_repo(&cfg).await?;
    let state = AppState::new(repo, TokenIssuer::new(cfg.jwt_secret.clone(), cfg.jwt_ttl_hours), cfg.bootstrap_admins.clone());
    state.services.shared.ensure_sentinel().await
        .map_err(|e| anyhow::anyhow!("failed to create the DELETED member: {e}"))?;

    let openapi = ApiDoc::openapi();
    let bind_addr = cfg.bind_addr.clone();

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cfg.frontend_url)
            .allow_any_header()
            .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(SecurityHeaders::from_config(&cfg))
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(&bind_addr)
    .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!("Listening on http://{bind_addr}");
    server.run().await?;
    Ok(())
}

#[cfg(feature = "postgres-store")]
async fn build_repo(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Repo>> {
    use sqlx::postgres::PgPoolOptions;
    let db_url = cfg.database_url.as_deref()
        .context("DATABASE_URL must be set for postgres-store")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("failed to connect to Postgres")?;
    sqlx::migrate!("./migrations").run(&pool).await.context("migrations failed")?;
    info!("Using Postgres repository backend");
    Ok(Arc::new(agora::repo::pg::PgRepo::new(pool)))
}

#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
async fn build_repo(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Repo>> {
    let path = cfg.snapshot_path();
    info!(snapshot = %path.display(), "Using in-memory repository backend");
    Ok(Arc::new(agora::repo::inmem::InMemRepo::open(path)))
}
