pub mod cart_item;
pub mod customer;
pub mod discount;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_size;
pub mod review;
pub mod size_chart_column;
pub mod size_chart_row;
pub mod size_chart_template;
pub mod size_chart_value;
pub mod user_address;
pub mod user_profile;
pub mod wishlist_item;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema};

// Constraints the entity derives cannot express. Both Postgres and SQLite
// accept expression and partial indexes in this form.
const GUARD_INDEXES: [&str; 5] = [
    "CREATE UNIQUE INDEX IF NOT EXISTS ux_cart_items_line \
     ON cart_items (session_id, product_id, COALESCE(size, ''), COALESCE(color, ''))",
    "CREATE UNIQUE INDEX IF NOT EXISTS ux_user_addresses_default \
     ON user_addresses (user_id) WHERE is_default",
    "CREATE UNIQUE INDEX IF NOT EXISTS ux_wishlist_items_user_product \
     ON wishlist_items (user_id, product_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS ux_product_sizes_label \
     ON product_sizes (product_id, size_label)",
    "CREATE UNIQUE INDEX IF NOT EXISTS ux_size_chart_values_cell \
     ON size_chart_values (row_id, column_id)",
];

/// Creates every table (parents before children) and the guard indexes.
/// Safe to run on every start.
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, size_chart_template::Entity).await?;
    create_table(db, &schema, size_chart_row::Entity).await?;
    create_table(db, &schema, size_chart_column::Entity).await?;
    create_table(db, &schema, size_chart_value::Entity).await?;
    create_table(db, &schema, product::Entity).await?;
    create_table(db, &schema, product_size::Entity).await?;
    create_table(db, &schema, review::Entity).await?;
    create_table(db, &schema, cart_item::Entity).await?;
    create_table(db, &schema, customer::Entity).await?;
    create_table(db, &schema, order::Entity).await?;
    create_table(db, &schema, order_item::Entity).await?;
    create_table(db, &schema, user_profile::Entity).await?;
    create_table(db, &schema, user_address::Entity).await?;
    create_table(db, &schema, wishlist_item::Entity).await?;
    create_table(db, &schema, discount::Entity).await?;

    for statement in GUARD_INDEXES {
        db.execute_unprepared(statement).await?;
    }

    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    Ok(())
}
