use sea_orm::entity::prelude::*;

/// Qualitative outcome detail attached 1:1 to a visit-type task.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "visit")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub task_id: Uuid,
    pub person_spoken_to: Option<String>,
    pub person_role: Option<String>,
    pub deployment_pain_points: Option<String>,
    pub partnership_interest: super::lead::PartnershipInterest,
    pub interest_level: Option<InterestLevel>,
    pub demo_video_shared: bool,
    pub meeting_permitted: bool,
    pub meeting_declined: bool,
    pub decline_reason: Option<String>,
    pub meeting_rescheduled: bool,
    pub reschedule_reason: Option<String>,
    pub suggested_followup_date: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::task::Entity",
        from = "Column::TaskId",
        to = "super::task::Column::Id",
        on_delete = "Cascade"
    )]
    Task,
}

impl Related<super::task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Task.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(10))")]
pub enum InterestLevel {
    #[sea_orm(string_value = "low")]
    Low,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "high")]
    High,
}

impl ActiveModelBehavior for ActiveModel {}
