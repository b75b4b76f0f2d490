pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_groups_table;
mod m20240101_000002_create_api_keys_table;
mod m20250715_000001_add_key_parsing_method_to_groups_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_groups_table::Migration),
            Box::new(m20240101_000002_create_api_keys_table::Migration),
            Box::new(m20250715_000001_add_key_parsing_method_to_groups_table::Migration),
        ]
    }
}
