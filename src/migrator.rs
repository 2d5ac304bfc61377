use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_catalog_tables::Migration),
            Box::new(m20240101_000003_create_order_tables::Migration),
            Box::new(m20240101_000004_create_article_tables::Migration),
            Box::new(m20240101_000005_unique_open_order::Migration),
        ]
    }
}

mod m20240101_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Users::Username)
                                .string_len(150)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Email)
                                .string_len(254)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::FirstName).string_len(150).not_null())
                        .col(ColumnDef::new(Users::LastName).string_len(150).not_null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(Users::IsStaff)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PasswordResetTokens::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PasswordResetTokens::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PasswordResetTokens::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(PasswordResetTokens::TokenHash)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(PasswordResetTokens::ExpiresAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PasswordResetTokens::UsedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PasswordResetTokens::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_password_reset_tokens_user")
                                .from(PasswordResetTokens::Table, PasswordResetTokens::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PasswordResetTokens::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Users {
        Table,
        Id,
        Username,
        Email,
        FirstName,
        LastName,
        PasswordHash,
        IsStaff,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PasswordResetTokens {
        Table,
        Id,
        UserId,
        TokenHash,
        ExpiresAt,
        UsedAt,
        CreatedAt,
    }
}

mod m20240101_000002_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Items::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Items::Name).string_len(100).not_null())
                        .col(ColumnDef::new(Items::Price).decimal_len(12, 2).not_null())
                        .col(ColumnDef::new(Items::DiscountPrice).decimal_len(12, 2).null())
                        .col(ColumnDef::new(Items::Category).string_len(2).not_null())
                        .col(ColumnDef::new(Items::Label).string_len(2).not_null())
                        .col(ColumnDef::new(Items::Description).text().not_null())
                        .col(ColumnDef::new(Items::Image).string().not_null())
                        .col(
                            ColumnDef::new(Items::InitialStock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Items::TopupStock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Items::TotalStock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Items::CurrentStock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Items::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Stock::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Stock::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Stock::ItemId).uuid().not_null())
                        .col(ColumnDef::new(Stock::InitialStock).integer().not_null())
                        .col(ColumnDef::new(Stock::CurrentStock).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_item")
                                .from(Stock::Table, Stock::ItemId)
                                .to(Items::Table, Items::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Deals::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Deals::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Deals::ItemId).uuid().not_null())
                        .col(ColumnDef::new(Deals::Price).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(Deals::Packaging)
                                .string_len(6)
                                .not_null()
                                .default("0"),
                        )
                        .col(ColumnDef::new(Deals::Deal).integer().not_null())
                        .col(ColumnDef::new(Deals::Title).string_len(50).not_null())
                        .col(ColumnDef::new(Deals::Description).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Deals::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_deals_item")
                                .from(Deals::Table, Deals::ItemId)
                                .to(Items::Table, Items::Id),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Deals::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Stock::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Items {
        Table,
        Id,
        Name,
        Price,
        DiscountPrice,
        Category,
        Label,
        Description,
        Image,
        InitialStock,
        TopupStock,
        TotalStock,
        CurrentStock,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Stock {
        Table,
        Id,
        ItemId,
        InitialStock,
        CurrentStock,
    }

    #[derive(DeriveIden)]
    enum Deals {
        Table,
        Id,
        ItemId,
        Price,
        Packaging,
        Deal,
        Title,
        Description,
        CreatedAt,
    }
}

mod m20240101_000003_create_order_tables {
    use super::m20240101_000001_create_users_table::Users;
    use super::m20240101_000002_create_catalog_tables::Items;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_order_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CheckoutAddresses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CheckoutAddresses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CheckoutAddresses::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(CheckoutAddresses::StreetAddress)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CheckoutAddresses::ApartmentAddress)
                                .string_len(100)
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(CheckoutAddresses::Country).string_len(2).not_null())
                        .col(ColumnDef::new(CheckoutAddresses::Zip).string_len(100).not_null())
                        .col(ColumnDef::new(CheckoutAddresses::Phone).string_len(11).not_null())
                        .col(
                            ColumnDef::new(CheckoutAddresses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_checkout_addresses_user")
                                .from(CheckoutAddresses::Table, CheckoutAddresses::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Payments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Payments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Payments::TransactionId).string_len(50).not_null())
                        .col(ColumnDef::new(Payments::TxRef).string_len(50).not_null())
                        .col(
                            ColumnDef::new(Payments::PayStatus)
                                .string_len(50)
                                .not_null()
                                .default("Processing"),
                        )
                        .col(ColumnDef::new(Payments::UserId).uuid().null())
                        .col(ColumnDef::new(Payments::Amount).decimal_len(12, 2).not_null())
                        .col(
                            ColumnDef::new(Payments::Timestamp)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payments_user")
                                .from(Payments::Table, Payments::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_payments_tx_ref")
                        .table(Payments::Table)
                        .col(Payments::TxRef)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(Orders::StartDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::OrderedDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::Ordered)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Orders::DeliveryStatus)
                                .string_len(10)
                                .not_null()
                                .default("1"),
                        )
                        .col(ColumnDef::new(Orders::CheckoutAddressId).uuid().null())
                        .col(ColumnDef::new(Orders::PaymentId).uuid().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_user")
                                .from(Orders::Table, Orders::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_checkout_address")
                                .from(Orders::Table, Orders::CheckoutAddressId)
                                .to(CheckoutAddresses::Table, CheckoutAddresses::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_payment")
                                .from(Orders::Table, Orders::PaymentId)
                                .to(Payments::Table, Payments::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_user_ordered")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .col(Orders::Ordered)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_ordered_date")
                        .table(Orders::Table)
                        .col(Orders::OrderedDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(OrderItems::UserId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ItemId).uuid().not_null())
                        .col(
                            ColumnDef::new(OrderItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(OrderItems::Ordered)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_item")
                                .from(OrderItems::Table, OrderItems::ItemId)
                                .to(Items::Table, Items::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_user_item_ordered")
                        .table(OrderItems::Table)
                        .col(OrderItems::UserId)
                        .col(OrderItems::ItemId)
                        .col(OrderItems::Ordered)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Payments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CheckoutAddresses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CheckoutAddresses {
        Table,
        Id,
        UserId,
        StreetAddress,
        ApartmentAddress,
        Country,
        Zip,
        Phone,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Payments {
        Table,
        Id,
        TransactionId,
        TxRef,
        PayStatus,
        UserId,
        Amount,
        Timestamp,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        UserId,
        StartDate,
        OrderedDate,
        Ordered,
        DeliveryStatus,
        CheckoutAddressId,
        PaymentId,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        UserId,
        OrderId,
        ItemId,
        Quantity,
        Ordered,
        CreatedAt,
    }
}

mod m20240101_000004_create_article_tables {
    use super::m20240101_000001_create_users_table::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_article_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Articles::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Articles::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Articles::Title)
                                .string_len(200)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Articles::Slug)
                                .string_len(200)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Articles::Category)
                                .string_len(7)
                                .not_null()
                                .default("fish"),
                        )
                        .col(ColumnDef::new(Articles::AuthorId).uuid().not_null())
                        .col(ColumnDef::new(Articles::Post).text().not_null())
                        .col(ColumnDef::new(Articles::Image).string().not_null())
                        .col(
                            ColumnDef::new(Articles::Status)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Articles::CreatedOn)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Articles::UpdatedOn)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_articles_author")
                                .from(Articles::Table, Articles::AuthorId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Comments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Comments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Comments::ArticleId).uuid().not_null())
                        .col(ColumnDef::new(Comments::Author).string_len(80).not_null())
                        .col(ColumnDef::new(Comments::Email).string_len(254).not_null())
                        .col(ColumnDef::new(Comments::Body).text().not_null())
                        .col(
                            ColumnDef::new(Comments::CreatedOn)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Comments::Active)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_comments_article")
                                .from(Comments::Table, Comments::ArticleId)
                                .to(Articles::Table, Articles::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Comments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Articles::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Articles {
        Table,
        Id,
        Title,
        Slug,
        Category,
        AuthorId,
        Post,
        Image,
        Status,
        CreatedOn,
        UpdatedOn,
    }

    #[derive(DeriveIden)]
    enum Comments {
        Table,
        Id,
        ArticleId,
        Author,
        Email,
        Body,
        CreatedOn,
        Active,
    }
}

mod m20240101_000005_unique_open_order {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_unique_open_order"
        }
    }

    // At most one open order per user
    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE UNIQUE INDEX IF NOT EXISTS idx_orders_one_open \
                     ON orders (user_id) WHERE ordered = false",
                )
                .await?;
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .get_connection()
                .execute_unprepared("DROP INDEX IF EXISTS idx_orders_one_open")
                .await?;
            Ok(())
        }
    }
}
