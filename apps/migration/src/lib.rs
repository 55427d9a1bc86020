//! Schema migrations for the blog database.
//!
//! Run from the CLI (`cargo run -p migration -- up`) or at server start-up
//! with `RUN_MIGRATIONS=true`.

pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_blog_tables;
mod m20240101_000002_seed_taxonomy;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_blog_tables::Migration),
            Box::new(m20240101_000002_seed_taxonomy::Migration),
        ]
    }
}
