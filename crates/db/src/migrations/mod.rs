//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_user_table;
mod m20250101_000002_create_todo_table;
mod m20250101_000003_create_comment_table;
mod m20250101_000004_create_reaction_table;
mod m20250101_000005_create_notification_table;
mod m20250101_000006_create_conversation_tables;
mod m20250101_000007_create_message_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_user_table::Migration),
            Box::new(m20250101_000002_create_todo_table::Migration),
            Box::new(m20250101_000003_create_comment_table::Migration),
            Box::new(m20250101_000004_create_reaction_table::Migration),
            Box::new(m20250101_000005_create_notification_table::Migration),
            Box::new(m20250101_000006_create_conversation_tables::Migration),
            Box::new(m20250101_000007_create_message_tables::Migration),
        ]
    }
}
