//! API layer - HTTP handlers and routing
//!
//! All HTTP endpoints of the Folio platform:
//! - Catalog endpoints (authors, books, filters)
//! - Account endpoints (register, login, tokens, profile, password reset)
//! - Post/comment endpoints with owner-only mutation
//! - Follow endpoints and the personalized feed
//! - Notification endpoints
//! - User administration with the read/write split policy

pub mod auth;
pub mod authors;
pub mod books;
pub mod comments;
pub mod common;
pub mod follows;
pub mod middleware;
pub mod notifications;
pub mod posts;
pub mod responses;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // User administration: reads for any authenticated user, writes for
    // admins only
    let admin_routes = Router::new()
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(axum_middleware::from_fn(
            middleware::require_admin_for_writes,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Routes that need a resolved identity
    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/profile", put(auth::update_profile))
        .route("/auth/password", put(auth::change_password))
        .route("/auth/profile/avatar", post(auth::upload_avatar))
        .route("/accounts/follow/{id}", post(follows::follow))
        .route("/accounts/unfollow/{id}", post(follows::unfollow))
        .route("/feed", get(posts::feed))
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/notifications/{id}/read",
            post(notifications::mark_notification_read),
        )
        .route("/authors", post(authors::create_author))
        .route(
            "/authors/{id}",
            put(authors::update_author)
                .patch(authors::update_author)
                .delete(authors::delete_author),
        )
        .route("/books", post(books::create_book))
        .route(
            "/books/{id}",
            put(books::replace_book)
                .patch(books::update_book)
                .delete(books::delete_book),
        )
        .route("/posts", post(posts::create_post))
        .route(
            "/posts/{id}",
            put(posts::update_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/comments", post(comments::create_comment))
        .route(
            "/comments/{id}",
            put(comments::update_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .route("/books", get(books::list_books))
        .route("/books/{id}", get(books::get_book))
        .route("/authors", get(authors::list_authors))
        .route("/authors/{id}", get(authors::get_author))
        .route("/posts", get(posts::list_posts))
        .route("/posts/{id}", get(posts::get_post))
        .route("/comments", get(comments::list_comments))
        .route("/comments/{id}", get(comments::get_comment))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/api-token-auth", post(auth::api_token_auth))
        .route("/auth/password-reset", post(auth::request_password_reset))
        .route(
            "/auth/password-reset/confirm",
            post(auth::confirm_password_reset),
        )
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            cors_origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:3000")),
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let uploads_dir = state.upload_config.path.clone();

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UploadConfig;
    use crate::db::repositories::{
        SqlxAuthTokenRepository, SqlxAuthorRepository, SqlxBookRepository, SqlxCommentRepository,
        SqlxFollowRepository, SqlxNotificationRepository, SqlxPasswordResetRepository,
        SqlxPostRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::services::{
        AccountService, CatalogService, CommentService, FollowService, Mailer,
        NotificationService, PostService,
    };
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use std::sync::Arc;

    async fn test_server() -> TestServer {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let upload_dir = std::env::temp_dir().join(format!("folio-test-{}", uuid::Uuid::new_v4()));

        let account_service = Arc::new(AccountService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxAuthTokenRepository::boxed(pool.clone()),
            SqlxPasswordResetRepository::boxed(pool.clone()),
        ));
        let catalog_service = Arc::new(CatalogService::new(
            SqlxAuthorRepository::boxed(pool.clone()),
            SqlxBookRepository::boxed(pool.clone()),
        ));
        let post_service = Arc::new(PostService::new(SqlxPostRepository::boxed(pool.clone())));
        let comment_service = Arc::new(CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxPostRepository::boxed(pool.clone()),
            SqlxNotificationRepository::boxed(pool.clone()),
        ));
        let follow_service = Arc::new(FollowService::new(
            SqlxFollowRepository::boxed(pool.clone()),
            SqlxUserRepository::boxed(pool.clone()),
            SqlxNotificationRepository::boxed(pool.clone()),
        ));
        let notification_service = Arc::new(NotificationService::new(
            SqlxNotificationRepository::boxed(pool.clone()),
        ));

        let state = AppState {
            pool,
            account_service,
            catalog_service,
            post_service,
            comment_service,
            follow_service,
            notification_service,
            mailer: Arc::new(Mailer::new(Default::default())),
            upload_config: Arc::new(UploadConfig {
                path: upload_dir,
                ..Default::default()
            }),
        };

        let app = build_router(state, "http://localhost:3000");
        TestServer::new(app).expect("Failed to build test server")
    }

    /// Register a user and return their token
    async fn register(server: &TestServer, username: &str) -> String {
        let response = server
            .post("/api/v1/auth/register")
            .json(&json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "password123",
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["token"]
            .as_str()
            .expect("token")
            .to_string()
    }

    fn token_header(token: &str) -> (axum::http::HeaderName, axum::http::HeaderValue) {
        (
            header::AUTHORIZATION,
            format!("Token {}", token).parse().expect("header value"),
        )
    }

    // ========================================================================
    // Catalog
    // ========================================================================

    #[tokio::test]
    async fn test_book_write_requires_auth() {
        let server = test_server().await;

        let response = server
            .post("/api/v1/books")
            .json(&json!({"title": "HP1", "publication_year": 1997, "author": 1}))
            .await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_catalog_scenario_nested_books() {
        let server = test_server().await;
        let token = register(&server, "librarian").await;
        let (name, value) = token_header(&token);

        let author = server
            .post("/api/v1/authors")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "J.K. Rowling"}))
            .await;
        author.assert_status(axum::http::StatusCode::CREATED);
        let author_id = author.json::<Value>()["id"].as_i64().expect("id");

        let book = server
            .post("/api/v1/books")
            .add_header(name.clone(), value.clone())
            .json(&json!({"title": "HP1", "publication_year": 1997, "author": author_id}))
            .await;
        book.assert_status(axum::http::StatusCode::CREATED);

        let detail = server.get(&format!("/api/v1/authors/{}", author_id)).await;
        detail.assert_status_ok();
        let body = detail.json::<Value>();
        assert_eq!(body["name"], "J.K. Rowling");
        assert_eq!(body["books"][0]["title"], "HP1");
        assert_eq!(body["books"][0]["author"], author_id);
    }

    #[tokio::test]
    async fn test_book_missing_title_bad_request() {
        let server = test_server().await;
        let token = register(&server, "librarian").await;
        let (name, value) = token_header(&token);

        let author = server
            .post("/api/v1/authors")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Author Name"}))
            .await;
        let author_id = author.json::<Value>()["id"].as_i64().expect("id");

        let book = server
            .post("/api/v1/books")
            .add_header(name.clone(), value.clone())
            .json(&json!({"title": "Fine", "publication_year": 2000, "author": author_id}))
            .await;
        let book_id = book.json::<Value>()["id"].as_i64().expect("id");

        // PUT without a title is rejected
        let response = server
            .put(&format!("/api/v1/books/{}", book_id))
            .add_header(name, value)
            .json(&json!({"publication_year": 2001}))
            .await;
        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["details"]["title"].is_string());
    }

    #[tokio::test]
    async fn test_book_patch_by_non_creator_succeeds() {
        let server = test_server().await;
        let creator = register(&server, "creator").await;
        let (name, value) = token_header(&creator);

        let author = server
            .post("/api/v1/authors")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Author Name"}))
            .await;
        let author_id = author.json::<Value>()["id"].as_i64().expect("id");

        let book = server
            .post("/api/v1/books")
            .add_header(name, value)
            .json(&json!({"title": "Shared", "publication_year": 2000, "author": author_id}))
            .await;
        let book_id = book.json::<Value>()["id"].as_i64().expect("id");

        // Books carry no ownership: a different authenticated user may edit
        let other = register(&server, "editor").await;
        let (name, value) = token_header(&other);
        let response = server
            .patch(&format!("/api/v1/books/{}", book_id))
            .add_header(name, value)
            .json(&json!({"title": "Edited by another"}))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["title"], "Edited by another");
    }

    #[tokio::test]
    async fn test_book_filters_and_missing_id() {
        let server = test_server().await;
        let token = register(&server, "librarian").await;
        let (name, value) = token_header(&token);

        let author = server
            .post("/api/v1/authors")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "George Orwell"}))
            .await;
        let author_id = author.json::<Value>()["id"].as_i64().expect("id");

        for (title, year) in [("Animal Farm", 1945), ("1984", 1949)] {
            server
                .post("/api/v1/books")
                .add_header(name.clone(), value.clone())
                .json(&json!({"title": title, "publication_year": year, "author": author_id}))
                .await
                .assert_status(axum::http::StatusCode::CREATED);
        }

        let filtered = server
            .get("/api/v1/books")
            .add_query_param("publication_year__gte", "1946")
            .await;
        filtered.assert_status_ok();
        let body = filtered.json::<Value>();
        assert_eq!(body.as_array().expect("array").len(), 1);
        assert_eq!(body[0]["title"], "1984");

        let searched = server
            .get("/api/v1/books")
            .add_query_param("search", "orwell")
            .await;
        assert_eq!(searched.json::<Value>().as_array().expect("array").len(), 2);

        let ordered = server
            .get("/api/v1/books")
            .add_query_param("ordering", "-publication_year")
            .await;
        assert_eq!(ordered.json::<Value>()[0]["title"], "1984");

        let bad_ordering = server
            .get("/api/v1/books")
            .add_query_param("ordering", "content")
            .await;
        bad_ordering.assert_status(axum::http::StatusCode::BAD_REQUEST);

        server
            .get("/api/v1/books/999")
            .await
            .assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_author_delete_cascades_books_via_api() {
        let server = test_server().await;
        let token = register(&server, "librarian").await;
        let (name, value) = token_header(&token);

        let author = server
            .post("/api/v1/authors")
            .add_header(name.clone(), value.clone())
            .json(&json!({"name": "Doomed Author"}))
            .await;
        let author_id = author.json::<Value>()["id"].as_i64().expect("id");

        let book = server
            .post("/api/v1/books")
            .add_header(name.clone(), value.clone())
            .json(&json!({"title": "Orphaned", "publication_year": 2000, "author": author_id}))
            .await;
        let book_id = book.json::<Value>()["id"].as_i64().expect("id");

        server
            .delete(&format!("/api/v1/authors/{}", author_id))
            .add_header(name, value)
            .await
            .assert_status(axum::http::StatusCode::NO_CONTENT);

        server
            .get(&format!("/api/v1/books/{}", book_id))
            .await
            .assert_status(axum::http::StatusCode::NOT_FOUND);
    }

    // ========================================================================
    // Accounts & follow graph
    // ========================================================================

    #[tokio::test]
    async fn test_register_login_and_me() {
        let server = test_server().await;
        let token = register(&server, "reader").await;

        let login = server
            .post("/api/v1/auth/login")
            .json(&json!({"username_or_email": "reader", "password": "password123"}))
            .await;
        login.assert_status_ok();
        assert_eq!(login.json::<Value>()["user"]["username"], "reader");

        let (name, value) = token_header(&token);
        let me = server.get("/api/v1/auth/me").add_header(name, value).await;
        me.assert_status_ok();
        let body = me.json::<Value>();
        assert_eq!(body["username"], "reader");
        assert_eq!(body["following"], 0);
        assert_eq!(body["followers"], 0);
    }

    #[tokio::test]
    async fn test_api_token_auth() {
        let server = test_server().await;
        register(&server, "reader").await;

        let response = server
            .post("/api/v1/api-token-auth")
            .json(&json!({"username": "reader", "password": "password123"}))
            .await;
        response.assert_status_ok();
        assert!(response.json::<Value>()["token"].is_string());

        let bad = server
            .post("/api/v1/api-token-auth")
            .json(&json!({"username": "reader", "password": "wrong"}))
            .await;
        bad.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let server = test_server().await;
        let token = register(&server, "reader").await;
        let (name, value) = token_header(&token);

        server
            .post("/api/v1/auth/logout")
            .add_header(name.clone(), value.clone())
            .await
            .assert_status(axum::http::StatusCode::NO_CONTENT);

        server
            .get("/api/v1/auth/me")
            .add_header(name, value)
            .await
            .assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_follow_errors_and_feed_scenario() {
        let server = test_server().await;
        let token_a = register(&server, "a").await;
        let token_b = register(&server, "b").await;

        // Resolve b's id from the admin-readable user list
        let (name_a, value_a) = token_header(&token_a);
        let users = server
            .get("/api/v1/users")
            .add_header(name_a.clone(), value_a.clone())
            .await
            .json::<Value>();
        let b_id = users["users"]
            .as_array()
            .expect("array")
            .iter()
            .find(|u| u["username"] == "b")
            .expect("user b")["id"]
            .as_i64()
            .expect("id");
        let a_id = users["users"]
            .as_array()
            .expect("array")
            .iter()
            .find(|u| u["username"] == "a")
            .expect("user a")["id"]
            .as_i64()
            .expect("id");

        // Self-follow rejected
        server
            .post(&format!("/api/v1/accounts/follow/{}", a_id))
            .add_header(name_a.clone(), value_a.clone())
            .await
            .assert_status(axum::http::StatusCode::BAD_REQUEST);

        // Unknown target
        server
            .post("/api/v1/accounts/follow/424242")
            .add_header(name_a.clone(), value_a.clone())
            .await
            .assert_status(axum::http::StatusCode::NOT_FOUND);

        // a follows b; doing it twice errors
        server
            .post(&format!("/api/v1/accounts/follow/{}", b_id))
            .add_header(name_a.clone(), value_a.clone())
            .await
            .assert_status_ok();
        let again = server
            .post(&format!("/api/v1/accounts/follow/{}", b_id))
            .add_header(name_a.clone(), value_a.clone())
            .await;
        again.assert_status(axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(
            again.json::<Value>()["error"]["message"],
            "Already following this user"
        );

        // b creates post P
        let (name_b, value_b) = token_header(&token_b);
        let post = server
            .post("/api/v1/posts")
            .add_header(name_b.clone(), value_b.clone())
            .json(&json!({"title": "P", "content": "hello"}))
            .await;
        post.assert_status(axum::http::StatusCode::CREATED);
        let post_id = post.json::<Value>()["id"].as_i64().expect("id");

        // feed(a) == [P]
        let feed_a = server
            .get("/api/v1/feed")
            .add_header(name_a.clone(), value_a.clone())
            .await
            .json::<Value>();
        let posts_a = feed_a["posts"].as_array().expect("array");
        assert_eq!(posts_a.len(), 1);
        assert_eq!(posts_a[0]["id"], post_id);

        // feed(b) == []
        let feed_b = server
            .get("/api/v1/feed")
            .add_header(name_b, value_b)
            .await
            .json::<Value>();
        assert!(feed_b["posts"].as_array().expect("array").is_empty());

        // unfollow restores the empty relation; a second unfollow errors
        server
            .post(&format!("/api/v1/accounts/unfollow/{}", b_id))
            .add_header(name_a.clone(), value_a.clone())
            .await
            .assert_status_ok();
        server
            .post(&format!("/api/v1/accounts/unfollow/{}", b_id))
            .add_header(name_a, value_a)
            .await
            .assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    // ========================================================================
    // Posts & comments ownership
    // ========================================================================

    #[tokio::test]
    async fn test_post_update_by_non_author_forbidden() {
        let server = test_server().await;
        let owner = register(&server, "owner").await;
        let intruder = register(&server, "intruder").await;

        let (name, value) = token_header(&owner);
        let post = server
            .post("/api/v1/posts")
            .add_header(name, value)
            .json(&json!({"title": "Mine", "content": "untouched"}))
            .await;
        let post_id = post.json::<Value>()["id"].as_i64().expect("id");

        let (name, value) = token_header(&intruder);
        let response = server
            .patch(&format!("/api/v1/posts/{}", post_id))
            .add_header(name, value)
            .json(&json!({"content": "rewritten"}))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);

        // Stored content unchanged, readable without auth
        let stored = server.get(&format!("/api/v1/posts/{}", post_id)).await;
        assert_eq!(stored.json::<Value>()["content"], "untouched");
    }

    #[tokio::test]
    async fn test_comment_flow_and_notification() {
        let server = test_server().await;
        let author = register(&server, "author").await;
        let commenter = register(&server, "commenter").await;

        let (name_author, value_author) = token_header(&author);
        let post = server
            .post("/api/v1/posts")
            .add_header(name_author.clone(), value_author.clone())
            .json(&json!({"title": "Discuss", "content": "body"}))
            .await;
        let post_id = post.json::<Value>()["id"].as_i64().expect("id");

        // Comment on a missing post is a field-keyed 400
        let (name_c, value_c) = token_header(&commenter);
        server
            .post("/api/v1/comments")
            .add_header(name_c.clone(), value_c.clone())
            .json(&json!({"post": 424242, "content": "orphan"}))
            .await
            .assert_status(axum::http::StatusCode::BAD_REQUEST);

        let comment = server
            .post("/api/v1/comments")
            .add_header(name_c, value_c)
            .json(&json!({"post": post_id, "content": "Interesting"}))
            .await;
        comment.assert_status(axum::http::StatusCode::CREATED);

        // Public read, filtered by post
        let listed = server
            .get("/api/v1/comments")
            .add_query_param("post", post_id.to_string())
            .await
            .json::<Value>();
        assert_eq!(listed.as_array().expect("array").len(), 1);

        // The post author was notified
        let count = server
            .get("/api/v1/notifications/unread-count")
            .add_header(name_author.clone(), value_author.clone())
            .await
            .json::<Value>();
        assert_eq!(count["unread_count"], 1);

        let notifications = server
            .get("/api/v1/notifications")
            .add_header(name_author.clone(), value_author.clone())
            .await
            .json::<Value>();
        let first = &notifications.as_array().expect("array")[0];
        assert_eq!(first["verb"], "commented");

        // Mark read once; twice errors
        let id = first["id"].as_i64().expect("id");
        server
            .post(&format!("/api/v1/notifications/{}/read", id))
            .add_header(name_author.clone(), value_author.clone())
            .await
            .assert_status_ok();
        server
            .post(&format!("/api/v1/notifications/{}/read", id))
            .add_header(name_author, value_author)
            .await
            .assert_status(axum::http::StatusCode::BAD_REQUEST);
    }

    // ========================================================================
    // User administration policy
    // ========================================================================

    #[tokio::test]
    async fn test_users_read_write_split() {
        let server = test_server().await;
        // First registered user is admin
        let admin = register(&server, "admin").await;
        let member = register(&server, "member").await;

        let (name_m, value_m) = token_header(&member);
        let users = server
            .get("/api/v1/users")
            .add_header(name_m.clone(), value_m.clone())
            .await;
        // Safe method passes for any authenticated user
        users.assert_status_ok();
        let member_id = users.json::<Value>()["users"]
            .as_array()
            .expect("array")
            .iter()
            .find(|u| u["username"] == "member")
            .expect("member")["id"]
            .as_i64()
            .expect("id");

        // Unsafe method needs the admin role
        server
            .delete(&format!("/api/v1/users/{}", member_id))
            .add_header(name_m, value_m)
            .await
            .assert_status(axum::http::StatusCode::FORBIDDEN);

        let (name_a, value_a) = token_header(&admin);
        server
            .delete(&format!("/api/v1/users/{}", member_id))
            .add_header(name_a, value_a)
            .await
            .assert_status(axum::http::StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_users_requires_auth() {
        let server = test_server().await;
        server
            .get("/api/v1/users")
            .await
            .assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    // ========================================================================
    // Password reset
    // ========================================================================

    #[tokio::test]
    async fn test_password_reset_endpoint_does_not_reveal_accounts() {
        let server = test_server().await;
        register(&server, "reader").await;

        let known = server
            .post("/api/v1/auth/password-reset")
            .json(&json!({"email": "reader@example.com"}))
            .await;
        known.assert_status_ok();

        let unknown = server
            .post("/api/v1/auth/password-reset")
            .json(&json!({"email": "ghost@example.com"}))
            .await;
        unknown.assert_status_ok();

        assert_eq!(known.json::<Value>(), unknown.json::<Value>());
    }

    #[tokio::test]
    async fn test_password_reset_confirm_unknown_token() {
        let server = test_server().await;

        server
            .post("/api/v1/auth/password-reset/confirm")
            .json(&json!({"token": "bogus", "new_password": "pw"}))
            .await
            .assert_status(axum::http::StatusCode::BAD_REQUEST);
    }
}
