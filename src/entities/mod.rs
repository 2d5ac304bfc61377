//! SeaORM entities backing the storefront.

pub mod article;
pub mod checkout_address;
pub mod comment;
pub mod deal;
pub mod item;
pub mod order;
pub mod order_item;
pub mod password_reset_token;
pub mod payment;
pub mod stock;
pub mod user;

pub use article::{ArticleCategory, ArticleStatus};
pub use deal::Packaging;
pub use item::{ItemCategory, ItemLabel};
pub use order::DeliveryStatus;
