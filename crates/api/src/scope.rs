//! Role-based visibility scoping.
//!
//! Each function narrows a base `Select` to the rows the actor may see and is
//! applied before any caller-supplied filter, so a filter can never reveal the
//! existence of an out-of-scope row.

use entity::{activity_log, lead, task, visit};
use sea_orm::sea_query::JoinType;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect, RelationTrait, Select};
use uuid::Uuid;

use crate::auth::CurrentUser;

pub fn scope_leads(select: Select<lead::Entity>, current: &CurrentUser) -> Select<lead::Entity> {
    if current.is_sales_executive() {
        select.filter(lead::Column::AssignedTo.eq(current.user_id))
    } else {
        select
    }
}

pub fn scope_tasks(select: Select<task::Entity>, current: &CurrentUser) -> Select<task::Entity> {
    if current.is_sales_executive() {
        select.filter(task::Column::AssignedTo.eq(current.user_id))
    } else {
        select
    }
}

/// Visits are scoped through the owning task's assignee.
pub fn scope_visits(select: Select<visit::Entity>, current: &CurrentUser) -> Select<visit::Entity> {
    if current.is_sales_executive() {
        select
            .join(JoinType::InnerJoin, visit::Relation::Task.def())
            .filter(task::Column::AssignedTo.eq(current.user_id))
    } else {
        select
    }
}

/// Executives see only their own rows; managers and admins see everything,
/// optionally narrowed to one target user.
pub fn scope_activity(
    select: Select<activity_log::Entity>,
    current: &CurrentUser,
    target_user: Option<Uuid>,
) -> Select<activity_log::Entity> {
    if current.is_sales_executive() {
        select.filter(activity_log::Column::UserId.eq(current.user_id))
    } else if let Some(user_id) = target_user {
        select.filter(activity_log::Column::UserId.eq(user_id))
    } else {
        select
    }
}

/// Contacts belong to a lead; executives see contacts of their own leads only.
pub fn scope_contacts(
    select: Select<entity::contact::Entity>,
    current: &CurrentUser,
) -> Select<entity::contact::Entity> {
    if current.is_sales_executive() {
        select
            .join(JoinType::InnerJoin, entity::contact::Relation::Lead.def())
            .filter(lead::Column::AssignedTo.eq(current.user_id))
    } else {
        select
    }
}
