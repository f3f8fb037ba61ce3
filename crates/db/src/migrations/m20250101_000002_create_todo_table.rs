//! Create todo table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Todo::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Todo::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Todo::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Todo::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Todo::Description).text())
                    .col(
                        ColumnDef::new(Todo::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Todo::Priority)
                            .string_len(16)
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(Todo::Visibility)
                            .string_len(16)
                            .not_null()
                            .default("private"),
                    )
                    .col(ColumnDef::new(Todo::DueDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Todo::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Todo::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_todo_user")
                            .from(Todo::Table, Todo::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (user_id, status) (for listing a user's todos)
        manager
            .create_index(
                Index::create()
                    .name("idx_todo_user_id_status")
                    .table(Todo::Table)
                    .col(Todo::UserId)
                    .col(Todo::Status)
                    .to_owned(),
            )
            .await?;

        // Index: visibility (for the public list)
        manager
            .create_index(
                Index::create()
                    .name("idx_todo_visibility")
                    .table(Todo::Table)
                    .col(Todo::Visibility)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Todo::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Todo {
    Table,
    Id,
    UserId,
    Title,
    Description,
    Status,
    Priority,
    Visibility,
    DueDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
