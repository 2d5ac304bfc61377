use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use storefront_api::{
    entities::{item, order_item, ItemCategory, ItemLabel},
    services::{
        articles::slugify,
        open_order::{minor_units, order_total, OrderLine},
    },
};
use uuid::Uuid;

fn line(price_cents: i64, discount_cents: Option<i64>, quantity: i32) -> OrderLine {
    let item_id = Uuid::new_v4();
    OrderLine {
        line: order_item::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            order_id: Uuid::nil(),
            item_id,
            quantity,
            ordered: false,
            created_at: Utc::now(),
        },
        item: item::Model {
            id: item_id,
            name: "Catfish".into(),
            price: Decimal::new(price_cents, 2),
            discount_price: discount_cents.map(|c| Decimal::new(c, 2)),
            category: ItemCategory::Fish,
            label: ItemLabel::New,
            description: String::new(),
            image: item::DEFAULT_IMAGE.into(),
            initial_stock: 10,
            topup_stock: 0,
            total_stock: 10,
            current_stock: 10,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
    }
}

proptest! {
    #[test]
    fn cents_survive_conversion_to_minor_units(cents in 0i64..100_000_000) {
        prop_assert_eq!(minor_units(Decimal::new(cents, 2)).unwrap(), cents);
    }

    #[test]
    fn final_price_plus_savings_is_list_price(
        price in 1i64..100_000,
        discount in proptest::option::of(0i64..100_000),
        quantity in 1i32..50,
    ) {
        let l = line(price, discount, quantity);
        prop_assert_eq!(l.final_price() + l.amount_saved(), l.total_item_price());
    }

    #[test]
    fn order_total_sums_line_finals(
        specs in proptest::collection::vec((1i64..10_000, proptest::option::of(1i64..10_000), 1i32..10), 0..8)
    ) {
        let lines: Vec<OrderLine> = specs
            .into_iter()
            .map(|(price, discount, quantity)| line(price, discount, quantity))
            .collect();
        let expected: Decimal = lines.iter().map(|l| l.final_price()).sum();
        prop_assert_eq!(order_total(&lines), expected);
    }

    #[test]
    fn slugs_are_lowercase_dash_separated(title in "\\PC{0,60}") {
        let slug = slugify(&title);
        prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
        prop_assert!(!slug.contains("--"));
        prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        prop_assert_eq!(slugify(&slug), slug.clone());
    }
}
