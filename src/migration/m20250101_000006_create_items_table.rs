use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Items {
    Table,
    Id,
    FinderId,
    OrganizationId,
    Title,
    Description,
    Category,
    City,
    Area,
    SpecificLocation,
    DateFound,
    ImageUrls,
    Latitude,
    Longitude,
    ContactMethod,
    Status,
    Views,
    ExpiresAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Items::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Items::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Items::FinderId).integer().not_null())
                    .col(ColumnDef::new(Items::OrganizationId).integer().null())
                    .col(ColumnDef::new(Items::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Items::Description).text().not_null())
                    .col(ColumnDef::new(Items::Category).string_len(32).not_null())
                    .col(ColumnDef::new(Items::City).string_len(100).not_null())
                    .col(ColumnDef::new(Items::Area).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Items::SpecificLocation)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Items::DateFound).date().not_null())
                    .col(
                        ColumnDef::new(Items::ImageUrls)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Items::Latitude).double().null())
                    .col(ColumnDef::new(Items::Longitude).double().null())
                    .col(ColumnDef::new(Items::ContactMethod).string_len(50).null())
                    .col(
                        ColumnDef::new(Items::Status)
                            .string_len(20)
                            .not_null()
                            .default("available"),
                    )
                    .col(
                        ColumnDef::new(Items::Views)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Items::ExpiresAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(Items::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Items::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_items_finder_id")
                            .from(Items::Table, Items::FinderId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_items_organization_id")
                            .from(Items::Table, Items::OrganizationId)
                            .to(Organizations::Table, Organizations::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        for (name, col) in [
            ("idx_items_finder_id", Items::FinderId),
            ("idx_items_organization_id", Items::OrganizationId),
            ("idx_items_city", Items::City),
            ("idx_items_created_at", Items::CreatedAt),
        ] {
            manager
                .create_index(
                    Index::create()
                        .name(name)
                        .table(Items::Table)
                        .col(col)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Items::Table).to_owned())
            .await
    }
}
