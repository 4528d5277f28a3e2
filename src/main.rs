//! Folio - A lightweight social reading platform API

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxAuthTokenRepository, SqlxAuthorRepository, SqlxBookRepository,
            SqlxCommentRepository, SqlxFollowRepository, SqlxNotificationRepository,
            SqlxPasswordResetRepository, SqlxPostRepository, SqlxUserRepository,
        },
    },
    services::{
        AccountService, CatalogService, CommentService, FollowService, Mailer,
        NotificationService, PostService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Folio...");

    // Load configuration
    let config = Config::load(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let token_repo = SqlxAuthTokenRepository::boxed(pool.clone());
    let reset_repo = SqlxPasswordResetRepository::boxed(pool.clone());
    let author_repo = SqlxAuthorRepository::boxed(pool.clone());
    let book_repo = SqlxBookRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());
    let follow_repo = SqlxFollowRepository::boxed(pool.clone());
    let notification_repo = SqlxNotificationRepository::boxed(pool.clone());

    // Initialize services
    let account_service = Arc::new(AccountService::new(
        user_repo.clone(),
        token_repo,
        reset_repo,
    ));
    let catalog_service = Arc::new(CatalogService::new(author_repo, book_repo));
    let post_service = Arc::new(PostService::new(post_repo.clone()));
    let comment_service = Arc::new(CommentService::new(
        comment_repo,
        post_repo,
        notification_repo.clone(),
    ));
    let follow_service = Arc::new(FollowService::new(
        follow_repo,
        user_repo,
        notification_repo.clone(),
    ));
    let notification_service = Arc::new(NotificationService::new(notification_repo));
    let mailer = Arc::new(Mailer::new(config.email.clone()));

    if !mailer.is_configured() {
        tracing::warn!("SMTP is not configured; password reset mail will not be sent");
    }

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        account_service: account_service.clone(),
        catalog_service,
        post_service,
        comment_service,
        follow_service,
        notification_service,
        mailer,
        upload_config: Arc::new(config.upload.clone()),
    };

    // Expired-token sweep (runs hourly)
    {
        let account_service = account_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match account_service.cleanup_expired_tokens().await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!("Removed {} expired token(s)", n),
                    Err(e) => tracing::warn!("Token cleanup failed: {}", e),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
