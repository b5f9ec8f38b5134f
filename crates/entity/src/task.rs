use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "task")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub task_type: TaskType,
    #[sea_orm(indexed)]
    pub lead_id: Uuid,
    #[sea_orm(indexed)]
    pub scheduled_at: DateTimeWithTimeZone,
    #[sea_orm(indexed)]
    pub assigned_to: Option<Uuid>,
    pub status: Status,
    pub outcome_notes: Option<String>,
    pub next_action_required: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lead::Entity",
        from = "Column::LeadId",
        to = "super::lead::Column::Id",
        on_delete = "Cascade"
    )]
    Lead,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AssignedTo",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    AssignedUser,
    #[sea_orm(has_one = "super::visit::Entity")]
    Visit,
}

impl Related<super::lead::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lead.def()
    }
}

impl Related<super::visit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Visit.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
pub enum TaskType {
    #[sea_orm(string_value = "visit")]
    Visit,
    #[sea_orm(string_value = "online_meeting")]
    OnlineMeeting,
    #[sea_orm(string_value = "call")]
    Call,
    #[sea_orm(string_value = "whatsapp")]
    Whatsapp,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
pub enum Status {
    #[sea_orm(string_value = "planned")]
    Planned,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "missed")]
    Missed,
}

impl ActiveModelBehavior for ActiveModel {}
