use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum VerificationRequests {
    Table,
    Id,
    ItemId,
    ClaimantId,
    PurchaseProofUrl,
    IdentificationMarks,
    PhotoWithItemUrls,
    AdditionalProofUrls,
    SecurityAnswers,
    ClaimantPhone,
    AdminNotes,
    Status,
    DecidedBy,
    DecidedAt,
    SmsSent,
    SmsSentAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Items {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VerificationRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VerificationRequests::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VerificationRequests::ItemId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VerificationRequests::ClaimantId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VerificationRequests::PurchaseProofUrl)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(VerificationRequests::IdentificationMarks)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(VerificationRequests::PhotoWithItemUrls)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VerificationRequests::AdditionalProofUrls)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VerificationRequests::SecurityAnswers)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(VerificationRequests::ClaimantPhone)
                            .string_len(20)
                            .null(),
                    )
                    .col(ColumnDef::new(VerificationRequests::AdminNotes).text().null())
                    .col(
                        ColumnDef::new(VerificationRequests::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(VerificationRequests::DecidedBy).integer().null())
                    .col(
                        ColumnDef::new(VerificationRequests::DecidedAt)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(VerificationRequests::SmsSent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(VerificationRequests::SmsSentAt)
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(VerificationRequests::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(VerificationRequests::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_verification_requests_item_id")
                            .from(VerificationRequests::Table, VerificationRequests::ItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_verification_requests_claimant_id")
                            .from(VerificationRequests::Table, VerificationRequests::ClaimantId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_verification_requests_decided_by")
                            .from(VerificationRequests::Table, VerificationRequests::DecidedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // No unique index on (item_id, claimant_id): duplicate claims are allowed.
        manager
            .create_index(
                Index::create()
                    .name("idx_verification_requests_item_status")
                    .table(VerificationRequests::Table)
                    .col(VerificationRequests::ItemId)
                    .col(VerificationRequests::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_verification_requests_claimant_id")
                    .table(VerificationRequests::Table)
                    .col(VerificationRequests::ClaimantId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VerificationRequests::Table).to_owned())
            .await
    }
}
