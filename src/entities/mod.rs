pub mod cart;
pub mod category;
pub mod favorite;
pub mod order;
pub mod order_line;
pub mod product;
pub mod profile;
pub mod user;

use sea_orm::{
    sea_query::{Index, IndexCreateStatement},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Schema, Set, TransactionTrait,
};

use crate::config::AdminSeed;
use crate::services::accounts::hash_password;

/// Creates every table that does not exist yet, plus the composite unique
/// indexes the ORM attributes cannot express.
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut tables = vec![
        schema.create_table_from_entity(user::Entity),
        schema.create_table_from_entity(profile::Entity),
        schema.create_table_from_entity(category::Entity),
        schema.create_table_from_entity(product::Entity),
        schema.create_table_from_entity(cart::Entity),
        schema.create_table_from_entity(favorite::Entity),
        schema.create_table_from_entity(order::Entity),
        schema.create_table_from_entity(order_line::Entity),
    ];
    for table in tables.iter_mut() {
        table.if_not_exists();
        db.execute(backend.build(&*table)).await?;
    }

    let indexes: Vec<IndexCreateStatement> = vec![
        Index::create()
            .name("idx_cart_user_product")
            .table(cart::Entity)
            .col(cart::Column::UserId)
            .col(cart::Column::ProductId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_favorite_user_product")
            .table(favorite::Entity)
            .col(favorite::Column::UserId)
            .col(favorite::Column::ProductId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ];
    for index in indexes.iter() {
        db.execute(backend.build(index)).await?;
    }

    Ok(())
}

/// Makes sure the configured admin account exists. Existing accounts are left
/// untouched.
pub async fn seed_admin(db: &DatabaseConnection, seed: &AdminSeed) -> Result<(), DbErr> {
    let txn = db.begin().await?;

    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(&seed.username))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return txn.commit().await;
    }

    let password = hash_password(&seed.password).map_err(DbErr::Custom)?;
    let admin = user::ActiveModel {
        username: Set(seed.username.clone()),
        email: Set(String::new()),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        password: Set(password),
        role: Set(user::Role::Admin),
        token_version: Set(0),
        date_joined: Set(chrono::Utc::now()),
        ..Default::default()
    };
    admin.insert(&txn).await?;

    txn.commit().await?;
    tracing::info!(username = %seed.username, "Seeded admin account");
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use sea_orm::{ConnectOptions, Database, DatabaseConnection};

    /// Fresh in-memory database with the full schema.
    pub async fn memory_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options)
            .await
            .expect("Failed to open in-memory database");
        super::setup_schema(&db)
            .await
            .expect("Failed to create schema");
        db
    }
}
