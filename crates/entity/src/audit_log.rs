use sea_orm::entity::prelude::*;

/// Immutable record of one mutation against one entity instance.
///
/// The subject is referenced generically by an (entity_kind, entity_id) pair
/// rather than a typed foreign key, so any entity can be audited without a
/// schema change. Rows are append-only.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: Action,
    #[sea_orm(indexed)]
    pub entity_kind: EntityKind,
    #[sea_orm(indexed)]
    pub entity_id: Uuid,
    pub changes: Json,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
pub enum Action {
    #[sea_orm(string_value = "create")]
    Create,
    #[sea_orm(string_value = "update")]
    Update,
    #[sea_orm(string_value = "delete")]
    Delete,
    #[sea_orm(string_value = "status_change")]
    StatusChange,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
pub enum EntityKind {
    #[sea_orm(string_value = "lead")]
    Lead,
    #[sea_orm(string_value = "task")]
    Task,
    #[sea_orm(string_value = "visit")]
    Visit,
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "activity_log")]
    ActivityLog,
}

impl ActiveModelBehavior for ActiveModel {}
