use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Lead {
    Table,
    Id,
    Status,
    FirstName,
    LastName,
    CompanyName,
    CompanySize,
    Industry,
    City,
    State,
    Phone,
    Email,
    Infrastructure,
    ClientType,
    Intent,
    ResearchNotes,
    ClosingStrategy,
    PartnershipInterest,
    WonReason,
    LostReason,
    AssignedTo,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Contact {
    Table,
    Id,
    LeadId,
    Name,
    Role,
    Phone,
    Email,
    DecisionMaker,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Task {
    Table,
    Id,
    TaskType,
    LeadId,
    ScheduledAt,
    AssignedTo,
    Status,
    OutcomeNotes,
    NextActionRequired,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Visit {
    Table,
    Id,
    TaskId,
    PersonSpokenTo,
    PersonRole,
    DeploymentPainPoints,
    PartnershipInterest,
    InterestLevel,
    DemoVideoShared,
    MeetingPermitted,
    MeetingDeclined,
    DeclineReason,
    MeetingRescheduled,
    RescheduleReason,
    SuggestedFollowupDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Lead::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Lead::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Lead::Status)
                            .string_len(20)
                            .not_null()
                            .default("open"),
                    )
                    .col(ColumnDef::new(Lead::FirstName).string_len(100).not_null())
                    .col(ColumnDef::new(Lead::LastName).string_len(100).not_null())
                    .col(ColumnDef::new(Lead::CompanyName).string_len(200).not_null())
                    .col(ColumnDef::new(Lead::CompanySize).string_len(50))
                    .col(ColumnDef::new(Lead::Industry).string_len(100))
                    .col(ColumnDef::new(Lead::City).string_len(100).not_null())
                    .col(ColumnDef::new(Lead::State).string_len(100))
                    .col(ColumnDef::new(Lead::Phone).string_len(15).not_null())
                    .col(ColumnDef::new(Lead::Email).string_len(320))
                    .col(ColumnDef::new(Lead::Infrastructure).string_len(20))
                    .col(ColumnDef::new(Lead::ClientType).string_len(20))
                    .col(ColumnDef::new(Lead::Intent).string_len(10))
                    .col(ColumnDef::new(Lead::ResearchNotes).text())
                    .col(ColumnDef::new(Lead::ClosingStrategy).text())
                    .col(
                        ColumnDef::new(Lead::PartnershipInterest)
                            .string_len(20)
                            .not_null()
                            .default("not_discussed"),
                    )
                    .col(ColumnDef::new(Lead::WonReason).text())
                    .col(ColumnDef::new(Lead::LostReason).text())
                    .col(ColumnDef::new(Lead::AssignedTo).uuid())
                    .col(ColumnDef::new(Lead::CreatedBy).uuid())
                    .col(
                        ColumnDef::new(Lead::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Lead::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lead_assigned_to")
                            .from(Lead::Table, Lead::AssignedTo)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lead_created_by")
                            .from(Lead::Table, Lead::CreatedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lead_status_assigned")
                    .table(Lead::Table)
                    .col(Lead::Status)
                    .col(Lead::AssignedTo)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lead_city")
                    .table(Lead::Table)
                    .col(Lead::City)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lead_intent")
                    .table(Lead::Table)
                    .col(Lead::Intent)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Contact::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Contact::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Contact::LeadId).uuid().not_null())
                    .col(ColumnDef::new(Contact::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Contact::Role).string_len(100))
                    .col(ColumnDef::new(Contact::Phone).string_len(15))
                    .col(ColumnDef::new(Contact::Email).string_len(320))
                    .col(
                        ColumnDef::new(Contact::DecisionMaker)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Contact::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contact_lead")
                            .from(Contact::Table, Contact::LeadId)
                            .to(Lead::Table, Lead::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_contact_lead")
                    .table(Contact::Table)
                    .col(Contact::LeadId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Task::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Task::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Task::TaskType).string_len(20).not_null())
                    .col(ColumnDef::new(Task::LeadId).uuid().not_null())
                    .col(
                        ColumnDef::new(Task::ScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Task::AssignedTo).uuid())
                    .col(
                        ColumnDef::new(Task::Status)
                            .string_len(20)
                            .not_null()
                            .default("planned"),
                    )
                    .col(ColumnDef::new(Task::OutcomeNotes).text())
                    .col(
                        ColumnDef::new(Task::NextActionRequired)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Task::CreatedBy).uuid())
                    .col(
                        ColumnDef::new(Task::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Task::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_lead")
                            .from(Task::Table, Task::LeadId)
                            .to(Lead::Table, Lead::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_assigned_to")
                            .from(Task::Table, Task::AssignedTo)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_status_scheduled")
                    .table(Task::Table)
                    .col(Task::Status)
                    .col(Task::ScheduledAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_lead_status")
                    .table(Task::Table)
                    .col(Task::LeadId)
                    .col(Task::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_task_assigned_scheduled")
                    .table(Task::Table)
                    .col(Task::AssignedTo)
                    .col(Task::ScheduledAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Visit::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Visit::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Visit::TaskId).uuid().not_null())
                    .col(ColumnDef::new(Visit::PersonSpokenTo).string_len(100))
                    .col(ColumnDef::new(Visit::PersonRole).string_len(100))
                    .col(ColumnDef::new(Visit::DeploymentPainPoints).text())
                    .col(
                        ColumnDef::new(Visit::PartnershipInterest)
                            .string_len(20)
                            .not_null()
                            .default("not_discussed"),
                    )
                    .col(ColumnDef::new(Visit::InterestLevel).string_len(10))
                    .col(
                        ColumnDef::new(Visit::DemoVideoShared)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Visit::MeetingPermitted)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Visit::MeetingDeclined)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Visit::DeclineReason).text())
                    .col(
                        ColumnDef::new(Visit::MeetingRescheduled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Visit::RescheduleReason).text())
                    .col(ColumnDef::new(Visit::SuggestedFollowupDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Visit::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .col(
                        ColumnDef::new(Visit::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("now()")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_visit_task")
                            .from(Visit::Table, Visit::TaskId)
                            .to(Task::Table, Task::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_visit_task")
                    .table(Visit::Table)
                    .col(Visit::TaskId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Visit::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Task::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contact::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Lead::Table).to_owned())
            .await?;
        Ok(())
    }
}
