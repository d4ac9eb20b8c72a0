use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::DisplayName).string())
                    .col(
                        ColumnDef::new(Users::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Create projects table
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Projects::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(ColumnDef::new(Projects::CreatedBy).integer().not_null())
                    .col(ColumnDef::new(Projects::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Projects::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_projects_created_by")
                            .from(Projects::Table, Projects::CreatedBy)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Create tiers table; parent_id is a self-reference so deleting a
        // tier cascades through its whole subtree
        manager
            .create_table(
                Table::create()
                    .table(Tiers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tiers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tiers::ProjectId).integer().not_null())
                    .col(ColumnDef::new(Tiers::ParentId).integer())
                    .col(ColumnDef::new(Tiers::Name).string().not_null())
                    .col(ColumnDef::new(Tiers::Level).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Tiers::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Tiers::AllowChildCreation)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Tiers::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Tiers::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tiers_project_id")
                            .from(Tiers::Table, Tiers::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tiers_parent_id")
                            .from(Tiers::Table, Tiers::ParentId)
                            .to(Tiers::Table, Tiers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tiers_project_parent")
                    .table(Tiers::Table)
                    .col(Tiers::ProjectId)
                    .col(Tiers::ParentId)
                    .to_owned(),
            )
            .await?;

        // Create tier_fields table
        manager
            .create_table(
                Table::create()
                    .table(TierFields::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TierFields::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TierFields::TierId).integer().not_null())
                    .col(ColumnDef::new(TierFields::FieldName).string().not_null())
                    .col(ColumnDef::new(TierFields::FieldType).string().not_null())
                    .col(ColumnDef::new(TierFields::Options).text())
                    .col(
                        ColumnDef::new(TierFields::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tier_fields_tier_id")
                            .from(TierFields::Table, TierFields::TierId)
                            .to(Tiers::Table, Tiers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create tier_data table with the (tier_id, field_id) upsert key
        manager
            .create_table(
                Table::create()
                    .table(TierData::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TierData::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TierData::TierId).integer().not_null())
                    .col(ColumnDef::new(TierData::FieldId).integer().not_null())
                    .col(ColumnDef::new(TierData::Value).double())
                    .col(ColumnDef::new(TierData::TextValue).text())
                    .col(ColumnDef::new(TierData::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tier_data_tier_id")
                            .from(TierData::Table, TierData::TierId)
                            .to(Tiers::Table, Tiers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tier_data_field_id")
                            .from(TierData::Table, TierData::FieldId)
                            .to(TierFields::Table, TierFields::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The upsert key for value writes
        manager
            .create_index(
                Index::create()
                    .name("idx_tier_data_tier_field")
                    .table(TierData::Table)
                    .col(TierData::TierId)
                    .col(TierData::FieldId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create field_templates table
        manager
            .create_table(
                Table::create()
                    .table(FieldTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FieldTemplates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FieldTemplates::Name).string().not_null())
                    .col(
                        ColumnDef::new(FieldTemplates::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create template_fields table
        manager
            .create_table(
                Table::create()
                    .table(TemplateFields::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TemplateFields::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TemplateFields::TemplateId).integer().not_null())
                    .col(ColumnDef::new(TemplateFields::FieldName).string().not_null())
                    .col(ColumnDef::new(TemplateFields::FieldType).string().not_null())
                    .col(ColumnDef::new(TemplateFields::Options).text())
                    .col(
                        ColumnDef::new(TemplateFields::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_template_fields_template_id")
                            .from(TemplateFields::Table, TemplateFields::TemplateId)
                            .to(FieldTemplates::Table, FieldTemplates::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TemplateFields::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FieldTemplates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TierData::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TierFields::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tiers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    DisplayName,
    IsAdmin,
    CreatedAt,
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    Name,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tiers {
    Table,
    Id,
    ProjectId,
    ParentId,
    Name,
    Level,
    DisplayOrder,
    AllowChildCreation,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TierFields {
    Table,
    Id,
    TierId,
    FieldName,
    FieldType,
    Options,
    DisplayOrder,
}

#[derive(Iden)]
enum TierData {
    Table,
    Id,
    TierId,
    FieldId,
    Value,
    TextValue,
    UpdatedAt,
}

#[derive(Iden)]
enum FieldTemplates {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(Iden)]
enum TemplateFields {
    Table,
    Id,
    TemplateId,
    FieldName,
    FieldType,
    Options,
    DisplayOrder,
}
