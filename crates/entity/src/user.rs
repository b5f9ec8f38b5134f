use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub password_hash: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    AssignedLead,
    Task,
    ActivityLog,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::AssignedLead => super::lead::Relation::AssignedUser.def().rev(),
            Relation::Task => super::task::Relation::AssignedUser.def().rev(),
            Relation::ActivityLog => super::activity_log::Relation::User.def().rev(),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
pub enum Role {
    #[sea_orm(string_value = "sales_executive")]
    SalesExecutive,
    #[sea_orm(string_value = "sales_manager")]
    SalesManager,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl ActiveModelBehavior for ActiveModel {}
