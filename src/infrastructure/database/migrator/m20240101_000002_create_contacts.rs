//! Create contacts table migration

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Contacts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contacts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Contacts::FirstName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contacts::LastName)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Contacts::Email).string_len(255).not_null())
                    .col(ColumnDef::new(Contacts::PhoneNumber).string_len(50).null())
                    .col(ColumnDef::new(Contacts::Birthday).date().null())
                    .col(ColumnDef::new(Contacts::AdditionalInfo).text().null())
                    .col(ColumnDef::new(Contacts::OwnerId).string().not_null())
                    .col(
                        ColumnDef::new(Contacts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contacts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contacts_owner_id")
                            .from(Contacts::Table, Contacts::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create index on owner_id for owner-scoped queries
        manager
            .create_index(
                Index::create()
                    .name("idx_contacts_owner_id")
                    .table(Contacts::Table)
                    .col(Contacts::OwnerId)
                    .to_owned(),
            )
            .await?;

        // Create index on birthday for the upcoming-birthdays window
        manager
            .create_index(
                Index::create()
                    .name("idx_contacts_birthday")
                    .table(Contacts::Table)
                    .col(Contacts::Birthday)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Contacts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Contacts {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    PhoneNumber,
    Birthday,
    AdditionalInfo,
    OwnerId,
    CreatedAt,
    UpdatedAt,
}
