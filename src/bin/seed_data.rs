//! Seed data script: a staff account, a shopper, a small catalog with a
//! deal, and one published article.
//!
//! Run with: cargo run --bin seed-data

use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing::info;
use uuid::Uuid;

use storefront_api::{
    auth::AuthService,
    config, db,
    entities::{
        article, deal, item, user, ArticleCategory, ArticleStatus, ItemCategory, ItemLabel,
        Packaging,
    },
    services::articles::slugify,
};

const SEED_PASSWORD: &str = "storefront-demo";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    let pool = db::establish_connection_from_app_config(&cfg).await?;
    db::run_migrations(&pool).await?;

    info!("=== Storefront seed data ===");

    let staff = create_user(&pool, "admin", "admin@storefront.local", "Ada", "Okafor", true).await?;
    create_user(&pool, "shopper", "shopper@storefront.local", "Bola", "Ade", false).await?;

    let catalog = [
        ("Smoked catfish", dec!(12.50), Some(dec!(10.00)), ItemCategory::Fish, ItemLabel::Discount, 40),
        ("Dried stockfish", dec!(18.00), None, ItemCategory::Fish, ItemLabel::New, 25),
        ("Red palm oil 5L", dec!(22.00), Some(dec!(19.50)), ItemCategory::PalmOil, ItemLabel::Discount, 60),
        ("Palm kernel oil 1L", dec!(6.75), None, ItemCategory::PalmOil, ItemLabel::New, 80),
        ("Wild forest honey 1L", dec!(14.00), None, ItemCategory::Honey, ItemLabel::New, 30),
    ];

    let mut first_item = None;
    for (name, price, discount, category, label, stock) in catalog {
        let now = Utc::now();
        let saved = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            price: Set(price),
            discount_price: Set(discount),
            category: Set(category),
            label: Set(label),
            description: Set(format!("{} from local producers", category.display_name())),
            image: Set(item::DEFAULT_IMAGE.to_string()),
            initial_stock: Set(stock),
            topup_stock: Set(0),
            total_stock: Set(0),
            current_stock: Set(stock),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&pool)
        .await?;
        info!(item = %saved.name, stock = saved.total_stock, "item created");
        first_item.get_or_insert(saved.id);
    }

    if let Some(item_id) = first_item {
        deal::ActiveModel {
            id: Set(Uuid::new_v4()),
            item_id: Set(item_id),
            price: Set(dec!(9.00)),
            packaging: Set(Packaging::Kg),
            deal: Set(20),
            title: Set("Catfish week".to_string()),
            description: Set("Twenty percent off smoked catfish".to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&pool)
        .await?;
        info!("deal created");
    }

    let title = "How we smoke our catfish";
    let now = Utc::now();
    article::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        slug: Set(slugify(title)),
        category: Set(ArticleCategory::Fish),
        author_id: Set(staff.id),
        post: Set("Slow smoking over hardwood keeps the fish firm.".to_string()),
        image: Set(storefront_api::services::articles::ARTICLE_DEFAULT_IMAGE.to_string()),
        status: Set(ArticleStatus::Published),
        created_on: Set(now),
        updated_on: Set(now),
    }
    .insert(&pool)
    .await?;

    info!(
        "Seed complete. Log in as admin@storefront.local or shopper@storefront.local with password '{}'",
        SEED_PASSWORD
    );
    Ok(())
}

async fn create_user(
    pool: &DatabaseConnection,
    username: &str,
    email: &str,
    first_name: &str,
    last_name: &str,
    is_staff: bool,
) -> anyhow::Result<user::Model> {
    let now = Utc::now();
    let saved = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        first_name: Set(first_name.to_string()),
        last_name: Set(last_name.to_string()),
        password_hash: Set(AuthService::hash_password(SEED_PASSWORD)?),
        is_staff: Set(is_staff),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(pool)
    .await?;
    info!(%username, is_staff, "user created");
    Ok(saved)
}
