use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
    Name,
    OrgType,
    Address,
    City,
    Latitude,
    Longitude,
    ContactEmail,
    ContactPhone,
    LogoUrl,
    RadiusMeters,
    RequireLocationVerification,
    IsVerified,
    IsActive,
    ReviewStatus,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organizations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Organizations::Name).string_len(200).not_null())
                    .col(ColumnDef::new(Organizations::OrgType).string_len(50).not_null())
                    .col(ColumnDef::new(Organizations::Address).text().not_null())
                    .col(ColumnDef::new(Organizations::City).string_len(100).not_null())
                    .col(ColumnDef::new(Organizations::Latitude).double().null())
                    .col(ColumnDef::new(Organizations::Longitude).double().null())
                    .col(
                        ColumnDef::new(Organizations::ContactEmail)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Organizations::ContactPhone)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Organizations::LogoUrl).string().null())
                    .col(
                        ColumnDef::new(Organizations::RadiusMeters)
                            .integer()
                            .not_null()
                            .default(500),
                    )
                    .col(
                        ColumnDef::new(Organizations::RequireLocationVerification)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Organizations::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Organizations::IsActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Organizations::ReviewStatus)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Organizations::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Organizations::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_organizations_active_name")
                    .table(Organizations::Table)
                    .col(Organizations::IsActive)
                    .col(Organizations::Name)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Organizations::Table).to_owned())
            .await
    }
}
