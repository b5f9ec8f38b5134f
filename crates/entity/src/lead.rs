use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "lead")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub status: Status,
    pub first_name: String,
    pub last_name: String,
    pub company_name: String,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    #[sea_orm(indexed)]
    pub city: String,
    pub state: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub infrastructure: Option<Infrastructure>,
    pub client_type: Option<ClientType>,
    #[sea_orm(indexed)]
    pub intent: Option<Intent>,
    pub research_notes: Option<String>,
    pub closing_strategy: Option<String>,
    pub partnership_interest: PartnershipInterest,
    pub won_reason: Option<String>,
    pub lost_reason: Option<String>,
    #[sea_orm(indexed)]
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AssignedTo",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    AssignedUser,
    #[sea_orm(has_many = "super::contact::Entity")]
    Contact,
    #[sea_orm(has_many = "super::task::Entity")]
    Task,
}

impl Related<super::contact::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contact.def()
    }
}

impl Related<super::task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Task.def()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
pub enum Status {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "sales_nurture")]
    SalesNurture,
    #[sea_orm(string_value = "won")]
    Won,
    #[sea_orm(string_value = "lost")]
    Lost,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(10))")]
pub enum Intent {
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "low")]
    Low,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
pub enum Infrastructure {
    #[sea_orm(string_value = "aws")]
    Aws,
    #[sea_orm(string_value = "azure")]
    Azure,
    #[sea_orm(string_value = "gcp")]
    Gcp,
    #[sea_orm(string_value = "on_prem")]
    OnPrem,
    #[sea_orm(string_value = "mixed")]
    Mixed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
pub enum ClientType {
    #[sea_orm(string_value = "indian")]
    Indian,
    #[sea_orm(string_value = "foreign")]
    Foreign,
    #[sea_orm(string_value = "both")]
    Both,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveActiveEnum, Eq, PartialEq)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
pub enum PartnershipInterest {
    #[sea_orm(string_value = "yes")]
    Yes,
    #[sea_orm(string_value = "no")]
    No,
    #[sea_orm(string_value = "not_discussed")]
    NotDiscussed,
}

impl ActiveModelBehavior for ActiveModel {}
