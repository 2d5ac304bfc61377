use super::common::{created_response, success_response, JsonBody};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::articles::{
        ArticleDetail, ArticleView, CommentRequest, CommentView, PublishArticleRequest,
    },
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Router,
};

#[utoipa::path(
    get,
    path = "/api/v1/articles",
    responses((status = 200, description = "Published articles, oldest first", body = [ArticleView])),
    tag = "Articles"
)]
pub async fn list_articles(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let articles = state.services.articles.list_articles().await?;
    Ok(success_response(articles))
}

#[utoipa::path(
    get,
    path = "/api/v1/articles/{slug}",
    params(("slug" = String, Path, description = "Article slug")),
    responses(
        (status = 200, description = "Article with its latest comments", body = ArticleDetail),
        (status = 404, description = "Article not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Articles"
)]
pub async fn get_article(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, ServiceError> {
    let detail = state.services.articles.get_article(&slug).await?;
    Ok(success_response(detail))
}

#[utoipa::path(
    post,
    path = "/api/v1/articles/{slug}/comments",
    params(("slug" = String, Path, description = "Article slug")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment stored for moderation", body = CommentView),
        (status = 400, description = "Invalid comment", body = crate::errors::ErrorResponse),
        (status = 404, description = "Article not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Articles"
)]
pub async fn add_comment(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    JsonBody(request): JsonBody<CommentRequest>,
) -> Result<Response, ServiceError> {
    let comment = state.services.articles.add_comment(&slug, request).await?;
    Ok(created_response(comment))
}

#[utoipa::path(
    post,
    path = "/api/v1/articles",
    request_body = PublishArticleRequest,
    responses(
        (status = 201, description = "Article saved", body = ArticleView),
        (status = 403, description = "Staff only", body = crate::errors::ErrorResponse),
        (status = 409, description = "Title or slug taken", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Articles"
)]
pub async fn publish_article(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(request): JsonBody<PublishArticleRequest>,
) -> Result<Response, ServiceError> {
    let article = state
        .services
        .articles
        .publish_article(&user, request)
        .await?;
    Ok(created_response(article))
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/articles", get(list_articles))
        .route("/articles/:slug", get(get_article))
        .route("/articles/:slug/comments", post(add_comment))
}

pub fn staff_routes() -> Router<AppState> {
    Router::new().route("/articles", post(publish_article))
}
