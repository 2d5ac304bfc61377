use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::{article, comment, ArticleCategory, ArticleStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const ARTICLE_DEFAULT_IMAGE: &str = "news/default.jpg";
pub const LATEST_COMMENTS_LIMIT: u64 = 5;

static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));
static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid regex"));

/// Lowercase, ASCII alphanumerics separated by single dashes
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    NON_SLUG_CHARS
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

fn validate_slug(slug: &str) -> Result<(), validator::ValidationError> {
    if SLUG_PATTERN.is_match(slug) {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("slug");
        err.message = Some("slug may only contain lowercase letters, digits and dashes".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PublishArticleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 200), custom = "validate_slug")]
    pub slug: Option<String>,
    #[serde(default)]
    pub category: ArticleCategory,
    #[validate(length(min = 1))]
    pub post: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub status: ArticleStatus,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 80))]
    pub author: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ArticleView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub category: ArticleCategory,
    pub author_id: Uuid,
    pub post: String,
    pub image: String,
    pub status: ArticleStatus,
    pub created_on: chrono::DateTime<Utc>,
    pub updated_on: chrono::DateTime<Utc>,
}

impl From<article::Model> for ArticleView {
    fn from(m: article::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            slug: m.slug,
            category: m.category,
            author_id: m.author_id,
            post: m.post,
            image: m.image,
            status: m.status,
            created_on: m.created_on,
            updated_on: m.updated_on,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentView {
    pub id: Uuid,
    pub author: String,
    pub body: String,
    pub created_on: chrono::DateTime<Utc>,
    pub active: bool,
}

impl From<comment::Model> for CommentView {
    fn from(m: comment::Model) -> Self {
        Self {
            id: m.id,
            author: m.author,
            body: m.body,
            created_on: m.created_on,
            active: m.active,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ArticleDetail {
    pub article: ArticleView,
    pub comments: Vec<CommentView>,
}

#[derive(Clone)]
pub struct ArticleService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ArticleService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Published articles, oldest first
    #[instrument(skip(self))]
    pub async fn list_articles(&self) -> Result<Vec<ArticleView>, ServiceError> {
        let articles = article::Entity::find()
            .filter(article::Column::Status.eq(ArticleStatus::Published))
            .order_by_asc(article::Column::CreatedOn)
            .all(&*self.db_pool)
            .await?;
        Ok(articles.into_iter().map(ArticleView::from).collect())
    }

    /// One article with its five most recent comments, moderated or not
    #[instrument(skip(self))]
    pub async fn get_article(&self, slug: &str) -> Result<ArticleDetail, ServiceError> {
        let db = &*self.db_pool;
        let found = find_by_slug(db, slug).await?;

        let comments = comment::Entity::find()
            .filter(comment::Column::ArticleId.eq(found.id))
            .order_by_desc(comment::Column::CreatedOn)
            .limit(LATEST_COMMENTS_LIMIT)
            .all(db)
            .await?;

        Ok(ArticleDetail {
            article: found.into(),
            comments: comments.into_iter().map(CommentView::from).collect(),
        })
    }

    /// Stores a comment awaiting moderation
    #[instrument(skip(self, request))]
    pub async fn add_comment(
        &self,
        slug: &str,
        request: CommentRequest,
    ) -> Result<CommentView, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let found = find_by_slug(db, slug).await?;

        let saved = comment::ActiveModel {
            id: Set(Uuid::new_v4()),
            article_id: Set(found.id),
            author: Set(request.author),
            email: Set(request.email),
            body: Set(request.body),
            created_on: Set(Utc::now()),
            active: Set(false),
        }
        .insert(db)
        .await?;

        info!(article_id = %found.id, comment_id = %saved.id, "comment added");
        self.publish(Event::CommentAdded {
            article_id: found.id,
            comment_id: saved.id,
        })
        .await;

        Ok(saved.into())
    }

    #[instrument(skip(self, author, request), fields(author = %author.user_id))]
    pub async fn publish_article(
        &self,
        author: &AuthUser,
        request: PublishArticleRequest,
    ) -> Result<ArticleView, ServiceError> {
        author.ensure_staff()?;
        request.validate()?;

        let slug = match request.slug.as_deref().filter(|s| !s.is_empty()) {
            Some(slug) => slug.to_string(),
            None => slugify(&request.title),
        };
        if slug.is_empty() {
            return Err(ServiceError::ValidationError(
                "A slug could not be derived from the title".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let clash = article::Entity::find()
            .filter(
                Condition::any()
                    .add(article::Column::Title.eq(request.title.as_str()))
                    .add(article::Column::Slug.eq(slug.as_str())),
            )
            .one(db)
            .await?;
        if clash.is_some() {
            return Err(ServiceError::Conflict(format!(
                "An article titled '{}' or with slug '{}' already exists",
                request.title, slug
            )));
        }

        let now = Utc::now();
        let saved = article::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(request.title),
            slug: Set(slug),
            category: Set(request.category),
            author_id: Set(author.user_id),
            post: Set(request.post),
            image: Set(request
                .image
                .unwrap_or_else(|| ARTICLE_DEFAULT_IMAGE.to_string())),
            status: Set(request.status),
            created_on: Set(now),
            updated_on: Set(now),
        }
        .insert(db)
        .await?;

        info!(article_id = %saved.id, slug = %saved.slug, "article saved");
        self.publish(Event::ArticlePublished(saved.id)).await;
        Ok(saved.into())
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.publish(event).await;
        }
    }
}

async fn find_by_slug(db: &DbPool, slug: &str) -> Result<article::Model, ServiceError> {
    article::Entity::find()
        .filter(article::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Article '{}' not found", slug)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Palm Oil Harvest 2024", "palm-oil-harvest-2024")]
    #[case("  Honey -- from the North!  ", "honey-from-the-north")]
    #[case("Smoked fish: a guide", "smoked-fish-a-guide")]
    #[case("!!!", "")]
    fn slugs_from_titles(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(slugify(title), expected);
    }

    #[test]
    fn slug_validation() {
        assert!(validate_slug("fresh-catfish").is_ok());
        assert!(validate_slug("Fresh Catfish").is_err());
        assert!(validate_slug("-leading").is_err());
    }

    #[test]
    fn comment_requires_valid_email() {
        let request = CommentRequest {
            author: "Bola".into(),
            email: "not-an-email".into(),
            body: "Great read".into(),
        };
        assert!(request.validate().is_err());
    }
}
