use crate::auth::{issue_token, AuthConfig, CurrentUser, UserRole, SESSION_COOKIE};
use crate::scope::{scope_activity, scope_contacts, scope_leads, scope_tasks, scope_visits};
use std::sync::Arc;

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use async_graphql::{
    Context, EmptySubscription, Enum, Error, ErrorExtensions, InputObject, Json, Object, Schema,
    SimpleObject, ID,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use entity::{activity_log, audit_log, contact, lead, task, user, visit};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func, OnConflict, Query};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, TransactionTrait,
};
use serde_json::json;
use tracing::{info_span, Instrument};
use uuid::Uuid;

pub struct AppSchema(pub Schema<QueryRoot, MutationRoot, EmptySubscription>);

pub fn build_schema(db: Arc<DatabaseConnection>, auth: Arc<AuthConfig>) -> AppSchema {
    let schema = Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(db)
        .data(auth)
        .finish();
    AppSchema(schema)
}

pub struct QueryRoot;
pub struct MutationRoot;

const MAX_PAGE: i32 = 200;

/// Request metadata captured at the HTTP boundary for the audit trail.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[Object]
impl QueryRoot {
    async fn crm(&self) -> CrmQuery {
        CrmQuery
    }
}

#[Object]
impl MutationRoot {
    async fn crm(&self) -> CrmMutation {
        CrmMutation
    }
}

#[derive(Default)]
pub struct CrmQuery;

#[derive(Default)]
pub struct CrmMutation;

#[Object]
impl CrmQuery {
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<UserNode> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let model = user::Entity::find_by_id(current.user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "User not found"))?;
        Ok(model.into())
    }

    async fn users(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        q: Option<String>,
    ) -> async_graphql::Result<Vec<UserNode>> {
        require_role(ctx, UserRole::Admin)?;
        let db = database(ctx)?;
        let limit = first.unwrap_or(50).clamp(1, MAX_PAGE) as u64;
        let skip = offset.unwrap_or(0).max(0) as u64;
        let mut query = user::Entity::find();
        if let Some(filter) = sanitize_optional_filter(q) {
            let pattern = format!("%{}%", filter.to_lowercase());
            let email_expr = Expr::expr(Func::lower(Expr::col(user::Column::Email)));
            let name_expr = Expr::expr(Func::lower(Expr::col(user::Column::DisplayName)));
            query = query.filter(
                Condition::any()
                    .add(email_expr.like(pattern.clone()))
                    .add(name_expr.like(pattern)),
            );
        }
        let records = query
            .order_by_asc(user::Column::Email)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(records.into_iter().map(UserNode::from).collect())
    }

    async fn leads(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        filter: Option<LeadFilter>,
    ) -> async_graphql::Result<Vec<LeadNode>> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let limit = first.unwrap_or(50).clamp(1, MAX_PAGE) as u64;
        let skip = offset.unwrap_or(0).max(0) as u64;
        let has_q = filter
            .as_ref()
            .and_then(|f| f.search.as_ref())
            .map(|q| !q.trim().is_empty())
            .unwrap_or(false);
        let span = info_span!("crm.leads.list", role = current.role.as_str(), has_q = has_q);
        let query = {
            let _guard = span.enter();
            filtered_leads(&current, filter)?
        };
        let rows = query
            .order_by_desc(lead::Column::UpdatedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(LeadNode::from).collect())
    }

    async fn lead(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<Option<LeadNode>> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let lead_id = parse_uuid(&id)?;
        let record = scope_leads(lead::Entity::find_by_id(lead_id), &current)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(record.map(LeadNode::from))
    }

    #[graphql(name = "leadContacts")]
    async fn lead_contacts(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "leadId")] lead_id: ID,
    ) -> async_graphql::Result<Vec<ContactNode>> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let lead_uuid = parse_uuid(&lead_id)?;
        let rows = scope_contacts(contact::Entity::find(), &current)
            .filter(contact::Column::LeadId.eq(lead_uuid))
            .order_by_desc(contact::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(ContactNode::from).collect())
    }

    /// Leads with no planned task scheduled in the future.
    #[graphql(name = "atRiskLeads")]
    async fn at_risk_leads(
        &self,
        ctx: &Context<'_>,
        filter: Option<LeadFilter>,
    ) -> async_graphql::Result<Vec<LeadNode>> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let now: DateTimeWithTimeZone = Utc::now().into();
        let covered = Query::select()
            .column(task::Column::LeadId)
            .from(task::Entity)
            .and_where(Expr::col(task::Column::Status).eq("planned"))
            .and_where(Expr::col(task::Column::ScheduledAt).gte(now))
            .to_owned();
        let rows = filtered_leads(&current, filter)?
            .filter(lead::Column::Id.not_in_subquery(covered))
            .order_by_desc(lead::Column::UpdatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(LeadNode::from).collect())
    }

    #[graphql(name = "leadStats")]
    async fn lead_stats(
        &self,
        ctx: &Context<'_>,
        filter: Option<LeadFilter>,
    ) -> async_graphql::Result<LeadStats> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let base = filtered_leads(&current, filter)?;
        let total = base.clone().count(db.as_ref()).await.map_err(db_error)? as i64;
        let by_status = group_counts(db.as_ref(), base.clone(), lead::Column::Status).await?;
        let by_intent = group_counts(db.as_ref(), base.clone(), lead::Column::Intent).await?;
        let by_city = group_counts(db.as_ref(), base, lead::Column::City).await?;
        Ok(LeadStats {
            total,
            by_status,
            by_intent,
            by_city,
        })
    }

    async fn tasks(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        filter: Option<TaskFilter>,
    ) -> async_graphql::Result<Vec<TaskNode>> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let limit = first.unwrap_or(50).clamp(1, MAX_PAGE) as u64;
        let skip = offset.unwrap_or(0).max(0) as u64;
        let query = filtered_tasks(&current, filter)?;
        let rows = query
            .order_by_asc(task::Column::ScheduledAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(TaskNode::from).collect())
    }

    async fn task(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<Option<TaskNode>> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let task_id = parse_uuid(&id)?;
        let record = scope_tasks(task::Entity::find_by_id(task_id), &current)
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(record.map(TaskNode::from))
    }

    /// Scoped tasks inside a date range, ordered for calendar rendering.
    #[graphql(name = "taskCalendar")]
    async fn task_calendar(
        &self,
        ctx: &Context<'_>,
        range: DateRange,
    ) -> async_graphql::Result<Vec<TaskNode>> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        if range.from > range.to {
            return Err(validation_error("range.from must be on or before range.to"));
        }
        let (start, _) = day_window(range.from);
        let (_, end) = day_window(range.to);
        let rows = scope_tasks(task::Entity::find(), &current)
            .filter(task::Column::ScheduledAt.gte(start))
            .filter(task::Column::ScheduledAt.lt(end))
            .order_by_asc(task::Column::ScheduledAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(TaskNode::from).collect())
    }

    async fn visits(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "leadId")] lead_id: Option<ID>,
    ) -> async_graphql::Result<Vec<VisitNode>> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let mut query = scope_visits(visit::Entity::find(), &current);
        if let Some(lead_uuid) = parse_optional_id("leadId", &lead_id)? {
            let owning = Query::select()
                .column(task::Column::Id)
                .from(task::Entity)
                .and_where(Expr::col(task::Column::LeadId).eq(lead_uuid))
                .to_owned();
            query = query.filter(visit::Column::TaskId.in_subquery(owning));
        }
        let rows = query
            .order_by_desc(visit::Column::CreatedAt)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(VisitNode::from).collect())
    }

    #[graphql(name = "auditLogs")]
    async fn audit_logs(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        offset: Option<i32>,
        filter: Option<AuditFilter>,
    ) -> async_graphql::Result<Vec<AuditLogNode>> {
        require_role(ctx, UserRole::SalesManager)?;
        let db = database(ctx)?;
        let limit = first.unwrap_or(50).clamp(1, MAX_PAGE) as u64;
        let skip = offset.unwrap_or(0).max(0) as u64;
        let mut query = audit_log::Entity::find();
        if let Some(filter) = filter {
            if let Some(kind) = filter.entity_kind {
                query = query.filter(audit_log::Column::EntityKind.eq(audit_log::EntityKind::from(kind)));
            }
            if let Some(entity_id) = parse_optional_id("entityId", &filter.entity_id)? {
                query = query.filter(audit_log::Column::EntityId.eq(entity_id));
            }
            if let Some(user_id) = parse_optional_id("userId", &filter.user_id)? {
                query = query.filter(audit_log::Column::UserId.eq(user_id));
            }
        }
        let rows = query
            .order_by_desc(audit_log::Column::CreatedAt)
            .limit(limit)
            .offset(skip)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(AuditLogNode::from).collect())
    }

    /// Get-or-create the actor's activity row for the given reporting day.
    #[graphql(name = "activityToday")]
    async fn activity_today(
        &self,
        ctx: &Context<'_>,
        day: Option<NaiveDate>,
    ) -> async_graphql::Result<ActivityLogNode> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let day = day.unwrap_or_else(|| Utc::now().date_naive());
        let row = get_or_create_activity(db.as_ref(), current.user_id, day)
            .await
            .map_err(service_error)?;
        Ok(row.into())
    }

    #[graphql(name = "activityLogs")]
    async fn activity_logs(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "userId")] user_id: Option<ID>,
        #[graphql(name = "dateFrom")] date_from: Option<NaiveDate>,
        #[graphql(name = "dateTo")] date_to: Option<NaiveDate>,
    ) -> async_graphql::Result<Vec<ActivityLogNode>> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let target = parse_optional_id("userId", &user_id)?;
        let mut query = scope_activity(activity_log::Entity::find(), &current, target);
        if let Some(from) = date_from {
            query = query.filter(activity_log::Column::Date.gte(from));
        }
        if let Some(to) = date_to {
            query = query.filter(activity_log::Column::Date.lte(to));
        }
        let rows = query
            .order_by_desc(activity_log::Column::Date)
            .all(db.as_ref())
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(ActivityLogNode::from).collect())
    }

    /// Summed counters over the scoped date range.
    #[graphql(name = "activityStats")]
    async fn activity_stats(
        &self,
        ctx: &Context<'_>,
        #[graphql(name = "userId")] user_id: Option<ID>,
        #[graphql(name = "dateFrom")] date_from: Option<NaiveDate>,
        #[graphql(name = "dateTo")] date_to: Option<NaiveDate>,
    ) -> async_graphql::Result<ActivityStats> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let target = parse_optional_id("userId", &user_id)?;
        let mut query = scope_activity(activity_log::Entity::find(), &current, target);
        if let Some(from) = date_from {
            query = query.filter(activity_log::Column::Date.gte(from));
        }
        if let Some(to) = date_to {
            query = query.filter(activity_log::Column::Date.lte(to));
        }
        let row = query
            .select_only()
            .column_as(activity_log::Column::VisitsCount.sum(), "total_visits")
            .column_as(activity_log::Column::CallsCount.sum(), "total_calls")
            .column_as(activity_log::Column::MeetingsCount.sum(), "total_meetings")
            .column_as(activity_log::Column::FollowupsScheduled.sum(), "total_followups")
            .column_as(activity_log::Column::LeadsUpdated.sum(), "total_leads_updated")
            .into_model::<ActivityTotalsRow>()
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .unwrap_or_default();
        Ok(ActivityStats {
            total_visits: row.total_visits.unwrap_or(0),
            total_calls: row.total_calls.unwrap_or(0),
            total_meetings: row.total_meetings.unwrap_or(0),
            total_followups: row.total_followups.unwrap_or(0),
            total_leads_updated: row.total_leads_updated.unwrap_or(0),
        })
    }
}

#[Object]
impl CrmMutation {
    async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> async_graphql::Result<AuthPayload> {
        let auth = auth_config(ctx)?;
        let db = database(ctx)?;
        let normalized = normalize_email(&email)?;
        let record = user::Entity::find()
            .filter(user::Column::Email.eq(normalized))
            .one(db.as_ref())
            .await
            .map_err(db_error)?;
        let Some(record) = record else {
            return Ok(AuthPayload::invalid());
        };
        if !record.is_active {
            return Ok(AuthPayload {
                ok: false,
                token: None,
                user: None,
                error: Some("Account disabled".into()),
            });
        }
        let parsed_hash = PasswordHash::new(&record.password_hash)
            .map_err(|_| error_with_code("INTERNAL", "Invalid password hash"))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_err()
        {
            return Ok(AuthPayload::invalid());
        }
        let role = UserRole::from(record.role);
        let token = issue_token(record.id, role, &auth)
            .map_err(|_| error_with_code("INTERNAL", "Failed to issue session token"))?;
        append_session_cookie(ctx, &token, auth.session_ttl_minutes);
        Ok(AuthPayload {
            ok: true,
            token: Some(token),
            user: Some(record.into()),
            error: None,
        })
    }

    async fn logout(&self, ctx: &Context<'_>) -> async_graphql::Result<bool> {
        append_session_cookie(ctx, "", -1);
        Ok(true)
    }

    #[graphql(name = "createUser")]
    async fn create_user(
        &self,
        ctx: &Context<'_>,
        input: NewUserInput,
    ) -> async_graphql::Result<UserNode> {
        require_role(ctx, UserRole::Admin)?;
        let db = database(ctx)?;
        let email = normalize_email(&input.email)?;
        if input.display_name.trim().is_empty() {
            return Err(validation_error("displayName cannot be empty"));
        }
        let now: DateTimeWithTimeZone = Utc::now().into();
        let record = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            display_name: Set(input.display_name.trim().to_string()),
            phone: Set(input.phone),
            city: Set(input.city),
            role: Set(user::Role::from(UserRole::from(input.role))),
            is_active: Set(true),
            password_hash: Set(hash_password(&input.password).map_err(db_error)?),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db.as_ref())
        .await
        .map_err(db_error)?;
        Ok(record.into())
    }

    #[graphql(name = "updateUser")]
    async fn update_user(
        &self,
        ctx: &Context<'_>,
        input: UpdateUserInput,
    ) -> async_graphql::Result<UserNode> {
        require_role(ctx, UserRole::Admin)?;
        let db = database(ctx)?;
        let user_id = parse_uuid(&input.id)?;
        let model = user::Entity::find_by_id(user_id)
            .one(db.as_ref())
            .await
            .map_err(db_error)?
            .ok_or_else(|| error_with_code("NOT_FOUND", "User not found"))?;
        let mut active: user::ActiveModel = model.into();
        if let Some(display_name) = input.display_name {
            if display_name.trim().is_empty() {
                return Err(validation_error("displayName cannot be empty"));
            }
            active.display_name = Set(display_name.trim().to_string());
        }
        if let Some(role) = input.role {
            active.role = Set(user::Role::from(UserRole::from(role)));
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if input.phone.is_some() {
            active.phone = Set(input.phone);
        }
        if input.city.is_some() {
            active.city = Set(input.city);
        }
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(db.as_ref()).await.map_err(db_error)?;
        Ok(updated.into())
    }

    #[graphql(name = "createLead")]
    async fn create_lead(
        &self,
        ctx: &Context<'_>,
        input: NewLeadInput,
    ) -> async_graphql::Result<LeadNode> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let meta = request_meta(ctx);
        let model = create_lead_internal(db.as_ref(), &current, &meta, input)
            .await
            .map_err(service_error)?;
        Ok(model.into())
    }

    #[graphql(name = "updateLead")]
    async fn update_lead(
        &self,
        ctx: &Context<'_>,
        input: UpdateLeadInput,
    ) -> async_graphql::Result<LeadNode> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let meta = request_meta(ctx);
        let today = Utc::now().date_naive();
        let model = update_lead_internal(db.as_ref(), &current, &meta, input, today)
            .await
            .map_err(service_error)?;
        Ok(model.into())
    }

    #[graphql(name = "assignLead")]
    async fn assign_lead(
        &self,
        ctx: &Context<'_>,
        id: ID,
        #[graphql(name = "userId")] user_id: Option<ID>,
    ) -> async_graphql::Result<LeadNode> {
        let current = require_role(ctx, UserRole::SalesManager)?;
        let db = database(ctx)?;
        let meta = request_meta(ctx);
        let lead_id = parse_uuid(&id)?;
        let target = parse_optional_id("userId", &user_id)?;
        let model = assign_lead_internal(db.as_ref(), &current, &meta, lead_id, target)
            .await
            .map_err(service_error)?;
        Ok(model.into())
    }

    /// Administrative removal; cascades to contacts and tasks.
    #[graphql(name = "deleteLead")]
    async fn delete_lead(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let current = require_role(ctx, UserRole::Admin)?;
        let db = database(ctx)?;
        let meta = request_meta(ctx);
        let lead_id = parse_uuid(&id)?;
        delete_lead_internal(db.as_ref(), &current, &meta, lead_id)
            .await
            .map_err(service_error)?;
        Ok(true)
    }

    #[graphql(name = "createTask")]
    async fn create_task(
        &self,
        ctx: &Context<'_>,
        input: NewTaskInput,
    ) -> async_graphql::Result<TaskNode> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let meta = request_meta(ctx);
        let model = create_task_internal(db.as_ref(), &current, &meta, input)
            .await
            .map_err(service_error)?;
        Ok(model.into())
    }

    #[graphql(name = "completeTask")]
    async fn complete_task(
        &self,
        ctx: &Context<'_>,
        id: ID,
        input: CompleteTaskInput,
    ) -> async_graphql::Result<CompleteTaskPayload> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let meta = request_meta(ctx);
        let task_id = parse_uuid(&id)?;
        let today = Utc::now().date_naive();
        let span = info_span!("crm.tasks.complete", role = current.role.as_str());
        let (completed, successor) =
            complete_task_internal(db.as_ref(), &current, &meta, task_id, input, today)
                .instrument(span)
                .await
                .map_err(service_error)?;
        Ok(CompleteTaskPayload {
            task: completed.into(),
            next_action: successor.map(TaskNode::from),
        })
    }

    #[graphql(name = "missTask")]
    async fn miss_task(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<TaskNode> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let meta = request_meta(ctx);
        let task_id = parse_uuid(&id)?;
        let model = miss_task_internal(db.as_ref(), &current, &meta, task_id)
            .await
            .map_err(service_error)?;
        Ok(model.into())
    }

    /// Append free-text notes to the actor's day row, creating it if needed.
    #[graphql(name = "logActivityNotes")]
    async fn log_activity_notes(
        &self,
        ctx: &Context<'_>,
        day: Option<NaiveDate>,
        notes: String,
    ) -> async_graphql::Result<ActivityLogNode> {
        let current = require_current(ctx)?;
        let db = database(ctx)?;
        let day = day.unwrap_or_else(|| Utc::now().date_naive());
        let updated = log_activity_notes_internal(db.as_ref(), &current, day, notes)
            .await
            .map_err(service_error)?;
        Ok(updated.into())
    }
}

// ---------------------------------------------------------------------------
// GraphQL enums mirroring the storage enums.
// ---------------------------------------------------------------------------

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum LeadStatus {
    Open,
    SalesNurture,
    Won,
    Lost,
}

impl From<lead::Status> for LeadStatus {
    fn from(value: lead::Status) -> Self {
        match value {
            lead::Status::Open => LeadStatus::Open,
            lead::Status::SalesNurture => LeadStatus::SalesNurture,
            lead::Status::Won => LeadStatus::Won,
            lead::Status::Lost => LeadStatus::Lost,
        }
    }
}

impl From<LeadStatus> for lead::Status {
    fn from(value: LeadStatus) -> Self {
        match value {
            LeadStatus::Open => lead::Status::Open,
            LeadStatus::SalesNurture => lead::Status::SalesNurture,
            LeadStatus::Won => lead::Status::Won,
            LeadStatus::Lost => lead::Status::Lost,
        }
    }
}

fn lead_status_str(status: lead::Status) -> &'static str {
    match status {
        lead::Status::Open => "open",
        lead::Status::SalesNurture => "sales_nurture",
        lead::Status::Won => "won",
        lead::Status::Lost => "lost",
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum IntentLevel {
    High,
    Medium,
    Low,
}

impl From<lead::Intent> for IntentLevel {
    fn from(value: lead::Intent) -> Self {
        match value {
            lead::Intent::High => IntentLevel::High,
            lead::Intent::Medium => IntentLevel::Medium,
            lead::Intent::Low => IntentLevel::Low,
        }
    }
}

impl From<IntentLevel> for lead::Intent {
    fn from(value: IntentLevel) -> Self {
        match value {
            IntentLevel::High => lead::Intent::High,
            IntentLevel::Medium => lead::Intent::Medium,
            IntentLevel::Low => lead::Intent::Low,
        }
    }
}

fn intent_str(intent: lead::Intent) -> &'static str {
    match intent {
        lead::Intent::High => "high",
        lead::Intent::Medium => "medium",
        lead::Intent::Low => "low",
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum InfrastructureKind {
    Aws,
    Azure,
    Gcp,
    OnPrem,
    Mixed,
}

impl From<lead::Infrastructure> for InfrastructureKind {
    fn from(value: lead::Infrastructure) -> Self {
        match value {
            lead::Infrastructure::Aws => InfrastructureKind::Aws,
            lead::Infrastructure::Azure => InfrastructureKind::Azure,
            lead::Infrastructure::Gcp => InfrastructureKind::Gcp,
            lead::Infrastructure::OnPrem => InfrastructureKind::OnPrem,
            lead::Infrastructure::Mixed => InfrastructureKind::Mixed,
        }
    }
}

impl From<InfrastructureKind> for lead::Infrastructure {
    fn from(value: InfrastructureKind) -> Self {
        match value {
            InfrastructureKind::Aws => lead::Infrastructure::Aws,
            InfrastructureKind::Azure => lead::Infrastructure::Azure,
            InfrastructureKind::Gcp => lead::Infrastructure::Gcp,
            InfrastructureKind::OnPrem => lead::Infrastructure::OnPrem,
            InfrastructureKind::Mixed => lead::Infrastructure::Mixed,
        }
    }
}

fn infrastructure_str(value: lead::Infrastructure) -> &'static str {
    match value {
        lead::Infrastructure::Aws => "aws",
        lead::Infrastructure::Azure => "azure",
        lead::Infrastructure::Gcp => "gcp",
        lead::Infrastructure::OnPrem => "on_prem",
        lead::Infrastructure::Mixed => "mixed",
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum ClientTypeKind {
    Indian,
    Foreign,
    Both,
}

impl From<lead::ClientType> for ClientTypeKind {
    fn from(value: lead::ClientType) -> Self {
        match value {
            lead::ClientType::Indian => ClientTypeKind::Indian,
            lead::ClientType::Foreign => ClientTypeKind::Foreign,
            lead::ClientType::Both => ClientTypeKind::Both,
        }
    }
}

impl From<ClientTypeKind> for lead::ClientType {
    fn from(value: ClientTypeKind) -> Self {
        match value {
            ClientTypeKind::Indian => lead::ClientType::Indian,
            ClientTypeKind::Foreign => lead::ClientType::Foreign,
            ClientTypeKind::Both => lead::ClientType::Both,
        }
    }
}

fn client_type_str(value: lead::ClientType) -> &'static str {
    match value {
        lead::ClientType::Indian => "indian",
        lead::ClientType::Foreign => "foreign",
        lead::ClientType::Both => "both",
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum PartnershipInterest {
    Yes,
    No,
    NotDiscussed,
}

impl From<lead::PartnershipInterest> for PartnershipInterest {
    fn from(value: lead::PartnershipInterest) -> Self {
        match value {
            lead::PartnershipInterest::Yes => PartnershipInterest::Yes,
            lead::PartnershipInterest::No => PartnershipInterest::No,
            lead::PartnershipInterest::NotDiscussed => PartnershipInterest::NotDiscussed,
        }
    }
}

impl From<PartnershipInterest> for lead::PartnershipInterest {
    fn from(value: PartnershipInterest) -> Self {
        match value {
            PartnershipInterest::Yes => lead::PartnershipInterest::Yes,
            PartnershipInterest::No => lead::PartnershipInterest::No,
            PartnershipInterest::NotDiscussed => lead::PartnershipInterest::NotDiscussed,
        }
    }
}

fn partnership_str(value: lead::PartnershipInterest) -> &'static str {
    match value {
        lead::PartnershipInterest::Yes => "yes",
        lead::PartnershipInterest::No => "no",
        lead::PartnershipInterest::NotDiscussed => "not_discussed",
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum TaskType {
    Visit,
    OnlineMeeting,
    Call,
    Whatsapp,
}

impl From<task::TaskType> for TaskType {
    fn from(value: task::TaskType) -> Self {
        match value {
            task::TaskType::Visit => TaskType::Visit,
            task::TaskType::OnlineMeeting => TaskType::OnlineMeeting,
            task::TaskType::Call => TaskType::Call,
            task::TaskType::Whatsapp => TaskType::Whatsapp,
        }
    }
}

impl From<TaskType> for task::TaskType {
    fn from(value: TaskType) -> Self {
        match value {
            TaskType::Visit => task::TaskType::Visit,
            TaskType::OnlineMeeting => task::TaskType::OnlineMeeting,
            TaskType::Call => task::TaskType::Call,
            TaskType::Whatsapp => task::TaskType::Whatsapp,
        }
    }
}

fn task_type_str(task_type: task::TaskType) -> &'static str {
    match task_type {
        task::TaskType::Visit => "visit",
        task::TaskType::OnlineMeeting => "online_meeting",
        task::TaskType::Call => "call",
        task::TaskType::Whatsapp => "whatsapp",
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum TaskStatus {
    Planned,
    Completed,
    Missed,
}

impl From<task::Status> for TaskStatus {
    fn from(value: task::Status) -> Self {
        match value {
            task::Status::Planned => TaskStatus::Planned,
            task::Status::Completed => TaskStatus::Completed,
            task::Status::Missed => TaskStatus::Missed,
        }
    }
}

impl From<TaskStatus> for task::Status {
    fn from(value: TaskStatus) -> Self {
        match value {
            TaskStatus::Planned => task::Status::Planned,
            TaskStatus::Completed => task::Status::Completed,
            TaskStatus::Missed => task::Status::Missed,
        }
    }
}

fn task_status_str(status: task::Status) -> &'static str {
    match status {
        task::Status::Planned => "planned",
        task::Status::Completed => "completed",
        task::Status::Missed => "missed",
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum InterestLevel {
    Low,
    Medium,
    High,
}

impl From<visit::InterestLevel> for InterestLevel {
    fn from(value: visit::InterestLevel) -> Self {
        match value {
            visit::InterestLevel::Low => InterestLevel::Low,
            visit::InterestLevel::Medium => InterestLevel::Medium,
            visit::InterestLevel::High => InterestLevel::High,
        }
    }
}

impl From<InterestLevel> for visit::InterestLevel {
    fn from(value: InterestLevel) -> Self {
        match value {
            InterestLevel::Low => visit::InterestLevel::Low,
            InterestLevel::Medium => visit::InterestLevel::Medium,
            InterestLevel::High => visit::InterestLevel::High,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    StatusChange,
}

impl From<audit_log::Action> for AuditAction {
    fn from(value: audit_log::Action) -> Self {
        match value {
            audit_log::Action::Create => AuditAction::Create,
            audit_log::Action::Update => AuditAction::Update,
            audit_log::Action::Delete => AuditAction::Delete,
            audit_log::Action::StatusChange => AuditAction::StatusChange,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum AuditEntityKind {
    Lead,
    Task,
    Visit,
    User,
    ActivityLog,
}

impl From<audit_log::EntityKind> for AuditEntityKind {
    fn from(value: audit_log::EntityKind) -> Self {
        match value {
            audit_log::EntityKind::Lead => AuditEntityKind::Lead,
            audit_log::EntityKind::Task => AuditEntityKind::Task,
            audit_log::EntityKind::Visit => AuditEntityKind::Visit,
            audit_log::EntityKind::User => AuditEntityKind::User,
            audit_log::EntityKind::ActivityLog => AuditEntityKind::ActivityLog,
        }
    }
}

impl From<AuditEntityKind> for audit_log::EntityKind {
    fn from(value: AuditEntityKind) -> Self {
        match value {
            AuditEntityKind::Lead => audit_log::EntityKind::Lead,
            AuditEntityKind::Task => audit_log::EntityKind::Task,
            AuditEntityKind::Visit => audit_log::EntityKind::Visit,
            AuditEntityKind::User => audit_log::EntityKind::User,
            AuditEntityKind::ActivityLog => audit_log::EntityKind::ActivityLog,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
pub enum Role {
    SalesExecutive,
    SalesManager,
    Admin,
}

impl From<user::Role> for Role {
    fn from(value: user::Role) -> Self {
        match value {
            user::Role::SalesExecutive => Role::SalesExecutive,
            user::Role::SalesManager => Role::SalesManager,
            user::Role::Admin => Role::Admin,
        }
    }
}

impl From<Role> for UserRole {
    fn from(value: Role) -> Self {
        match value {
            Role::SalesExecutive => UserRole::SalesExecutive,
            Role::SalesManager => UserRole::SalesManager,
            Role::Admin => UserRole::Admin,
        }
    }
}

// ---------------------------------------------------------------------------
// Filters and inputs.
// ---------------------------------------------------------------------------

#[derive(InputObject, Default, Clone)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub city: Option<String>,
    pub intent: Option<IntentLevel>,
    #[graphql(name = "assignedTo")]
    pub assigned_to: Option<ID>,
    pub search: Option<String>,
}

#[derive(InputObject, Default, Clone)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    #[graphql(name = "taskType")]
    pub task_type: Option<TaskType>,
    #[graphql(name = "leadId")]
    pub lead_id: Option<ID>,
    #[graphql(name = "scheduledAfter")]
    pub scheduled_after: Option<DateTime<Utc>>,
    #[graphql(name = "scheduledBefore")]
    pub scheduled_before: Option<DateTime<Utc>>,
    /// Midnight-to-midnight window for one reporting day.
    pub today: Option<NaiveDate>,
    /// Planned tasks whose scheduled time has passed.
    pub overdue: Option<bool>,
}

#[derive(InputObject, Clone)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(InputObject, Default, Clone)]
pub struct AuditFilter {
    #[graphql(name = "entityKind")]
    pub entity_kind: Option<AuditEntityKind>,
    #[graphql(name = "entityId")]
    pub entity_id: Option<ID>,
    #[graphql(name = "userId")]
    pub user_id: Option<ID>,
}

#[derive(InputObject, Clone)]
pub struct ContactInput {
    pub name: String,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[graphql(name = "decisionMaker", default)]
    pub decision_maker: bool,
}

#[derive(InputObject, Clone)]
pub struct NewLeadInput {
    #[graphql(name = "firstName")]
    pub first_name: String,
    #[graphql(name = "lastName")]
    pub last_name: String,
    #[graphql(name = "companyName")]
    pub company_name: String,
    #[graphql(name = "companySize")]
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub infrastructure: Option<InfrastructureKind>,
    #[graphql(name = "clientType")]
    pub client_type: Option<ClientTypeKind>,
    pub intent: Option<IntentLevel>,
    #[graphql(name = "researchNotes")]
    pub research_notes: Option<String>,
    #[graphql(name = "closingStrategy")]
    pub closing_strategy: Option<String>,
    #[graphql(name = "partnershipInterest")]
    pub partnership_interest: Option<PartnershipInterest>,
    #[graphql(name = "assignedTo")]
    pub assigned_to: Option<ID>,
    pub contacts: Option<Vec<ContactInput>>,
}

#[derive(InputObject, Clone)]
pub struct UpdateLeadInput {
    pub id: ID,
    pub status: Option<LeadStatus>,
    #[graphql(name = "firstName")]
    pub first_name: Option<String>,
    #[graphql(name = "lastName")]
    pub last_name: Option<String>,
    #[graphql(name = "companyName")]
    pub company_name: Option<String>,
    #[graphql(name = "companySize")]
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub infrastructure: Option<InfrastructureKind>,
    #[graphql(name = "clientType")]
    pub client_type: Option<ClientTypeKind>,
    pub intent: Option<IntentLevel>,
    #[graphql(name = "researchNotes")]
    pub research_notes: Option<String>,
    #[graphql(name = "closingStrategy")]
    pub closing_strategy: Option<String>,
    #[graphql(name = "partnershipInterest")]
    pub partnership_interest: Option<PartnershipInterest>,
    #[graphql(name = "wonReason")]
    pub won_reason: Option<String>,
    #[graphql(name = "lostReason")]
    pub lost_reason: Option<String>,
    #[graphql(name = "assignedTo")]
    pub assigned_to: Option<ID>,
    /// Full replace: existing contacts are removed and recreated.
    pub contacts: Option<Vec<ContactInput>>,
}

#[derive(InputObject, Clone)]
pub struct VisitInput {
    #[graphql(name = "personSpokenTo")]
    pub person_spoken_to: Option<String>,
    #[graphql(name = "personRole")]
    pub person_role: Option<String>,
    #[graphql(name = "deploymentPainPoints")]
    pub deployment_pain_points: Option<String>,
    #[graphql(name = "partnershipInterest")]
    pub partnership_interest: Option<PartnershipInterest>,
    #[graphql(name = "interestLevel")]
    pub interest_level: Option<InterestLevel>,
    #[graphql(name = "demoVideoShared", default)]
    pub demo_video_shared: bool,
    #[graphql(name = "meetingPermitted", default = true)]
    pub meeting_permitted: bool,
    #[graphql(name = "meetingDeclined", default)]
    pub meeting_declined: bool,
    #[graphql(name = "declineReason")]
    pub decline_reason: Option<String>,
    #[graphql(name = "meetingRescheduled", default)]
    pub meeting_rescheduled: bool,
    #[graphql(name = "rescheduleReason")]
    pub reschedule_reason: Option<String>,
    #[graphql(name = "suggestedFollowupDate")]
    pub suggested_followup_date: Option<DateTime<Utc>>,
}

#[derive(InputObject, Clone)]
pub struct NewTaskInput {
    #[graphql(name = "taskType")]
    pub task_type: TaskType,
    #[graphql(name = "leadId")]
    pub lead_id: ID,
    #[graphql(name = "scheduledAt")]
    pub scheduled_at: DateTime<Utc>,
    #[graphql(name = "assignedTo")]
    pub assigned_to: Option<ID>,
    pub visit: Option<VisitInput>,
}

#[derive(InputObject, Clone)]
pub struct NextActionInput {
    #[graphql(name = "taskType")]
    pub task_type: TaskType,
    #[graphql(name = "scheduledAt")]
    pub scheduled_at: DateTime<Utc>,
}

#[derive(InputObject, Clone)]
pub struct CompleteTaskInput {
    #[graphql(name = "outcomeNotes")]
    pub outcome_notes: Option<String>,
    #[graphql(name = "nextActionRequired", default)]
    pub next_action_required: bool,
    #[graphql(name = "nextAction")]
    pub next_action: Option<NextActionInput>,
}

#[derive(InputObject, Clone)]
pub struct NewUserInput {
    pub email: String,
    #[graphql(name = "displayName")]
    pub display_name: String,
    pub password: String,
    pub role: Role,
    pub phone: Option<String>,
    pub city: Option<String>,
}

#[derive(InputObject, Clone)]
pub struct UpdateUserInput {
    pub id: ID,
    #[graphql(name = "displayName")]
    pub display_name: Option<String>,
    pub role: Option<Role>,
    #[graphql(name = "isActive")]
    pub is_active: Option<bool>,
    pub phone: Option<String>,
    pub city: Option<String>,
}

// ---------------------------------------------------------------------------
// Nodes.
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "User")]
pub struct UserNode {
    pub id: ID,
    pub email: String,
    #[graphql(name = "displayName")]
    pub display_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub role: Role,
    #[graphql(name = "isActive")]
    pub is_active: bool,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserNode {
    fn from(model: user::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            email: model.email,
            display_name: model.display_name,
            phone: model.phone,
            city: model.city,
            role: model.role.into(),
            is_active: model.is_active,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Lead")]
pub struct LeadNode {
    pub id: ID,
    pub status: LeadStatus,
    #[graphql(name = "firstName")]
    pub first_name: String,
    #[graphql(name = "lastName")]
    pub last_name: String,
    #[graphql(name = "companyName")]
    pub company_name: String,
    #[graphql(name = "companySize")]
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub infrastructure: Option<InfrastructureKind>,
    #[graphql(name = "clientType")]
    pub client_type: Option<ClientTypeKind>,
    pub intent: Option<IntentLevel>,
    #[graphql(name = "researchNotes")]
    pub research_notes: Option<String>,
    #[graphql(name = "closingStrategy")]
    pub closing_strategy: Option<String>,
    #[graphql(name = "partnershipInterest")]
    pub partnership_interest: PartnershipInterest,
    #[graphql(name = "wonReason")]
    pub won_reason: Option<String>,
    #[graphql(name = "lostReason")]
    pub lost_reason: Option<String>,
    #[graphql(name = "assignedTo")]
    pub assigned_to: Option<ID>,
    #[graphql(name = "createdBy")]
    pub created_by: Option<ID>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<lead::Model> for LeadNode {
    fn from(model: lead::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            status: model.status.into(),
            first_name: model.first_name,
            last_name: model.last_name,
            company_name: model.company_name,
            company_size: model.company_size,
            industry: model.industry,
            city: model.city,
            state: model.state,
            phone: model.phone,
            email: model.email,
            infrastructure: model.infrastructure.map(Into::into),
            client_type: model.client_type.map(Into::into),
            intent: model.intent.map(Into::into),
            research_notes: model.research_notes,
            closing_strategy: model.closing_strategy,
            partnership_interest: model.partnership_interest.into(),
            won_reason: model.won_reason,
            lost_reason: model.lost_reason,
            assigned_to: model.assigned_to.map(|id| ID::from(id.to_string())),
            created_by: model.created_by.map(|id| ID::from(id.to_string())),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Contact")]
pub struct ContactNode {
    pub id: ID,
    #[graphql(name = "leadId")]
    pub lead_id: ID,
    pub name: String,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    #[graphql(name = "decisionMaker")]
    pub decision_maker: bool,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<contact::Model> for ContactNode {
    fn from(model: contact::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            lead_id: ID::from(model.lead_id.to_string()),
            name: model.name,
            role: model.role,
            phone: model.phone,
            email: model.email,
            decision_maker: model.decision_maker,
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Task")]
pub struct TaskNode {
    pub id: ID,
    #[graphql(name = "taskType")]
    pub task_type: TaskType,
    #[graphql(name = "leadId")]
    pub lead_id: ID,
    #[graphql(name = "scheduledAt")]
    pub scheduled_at: DateTime<Utc>,
    #[graphql(name = "assignedTo")]
    pub assigned_to: Option<ID>,
    pub status: TaskStatus,
    #[graphql(name = "outcomeNotes")]
    pub outcome_notes: Option<String>,
    #[graphql(name = "nextActionRequired")]
    pub next_action_required: bool,
    #[graphql(name = "createdBy")]
    pub created_by: Option<ID>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[graphql(name = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl From<task::Model> for TaskNode {
    fn from(model: task::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            task_type: model.task_type.into(),
            lead_id: ID::from(model.lead_id.to_string()),
            scheduled_at: model.scheduled_at.into(),
            assigned_to: model.assigned_to.map(|id| ID::from(id.to_string())),
            status: model.status.into(),
            outcome_notes: model.outcome_notes,
            next_action_required: model.next_action_required,
            created_by: model.created_by.map(|id| ID::from(id.to_string())),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Visit")]
pub struct VisitNode {
    pub id: ID,
    #[graphql(name = "taskId")]
    pub task_id: ID,
    #[graphql(name = "personSpokenTo")]
    pub person_spoken_to: Option<String>,
    #[graphql(name = "personRole")]
    pub person_role: Option<String>,
    #[graphql(name = "deploymentPainPoints")]
    pub deployment_pain_points: Option<String>,
    #[graphql(name = "partnershipInterest")]
    pub partnership_interest: PartnershipInterest,
    #[graphql(name = "interestLevel")]
    pub interest_level: Option<InterestLevel>,
    #[graphql(name = "demoVideoShared")]
    pub demo_video_shared: bool,
    #[graphql(name = "meetingPermitted")]
    pub meeting_permitted: bool,
    #[graphql(name = "meetingDeclined")]
    pub meeting_declined: bool,
    #[graphql(name = "declineReason")]
    pub decline_reason: Option<String>,
    #[graphql(name = "meetingRescheduled")]
    pub meeting_rescheduled: bool,
    #[graphql(name = "rescheduleReason")]
    pub reschedule_reason: Option<String>,
    #[graphql(name = "suggestedFollowupDate")]
    pub suggested_followup_date: Option<DateTime<Utc>>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<visit::Model> for VisitNode {
    fn from(model: visit::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            task_id: ID::from(model.task_id.to_string()),
            person_spoken_to: model.person_spoken_to,
            person_role: model.person_role,
            deployment_pain_points: model.deployment_pain_points,
            partnership_interest: model.partnership_interest.into(),
            interest_level: model.interest_level.map(Into::into),
            demo_video_shared: model.demo_video_shared,
            meeting_permitted: model.meeting_permitted,
            meeting_declined: model.meeting_declined,
            decline_reason: model.decline_reason,
            meeting_rescheduled: model.meeting_rescheduled,
            reschedule_reason: model.reschedule_reason,
            suggested_followup_date: model.suggested_followup_date.map(|d| d.into()),
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "AuditLog")]
pub struct AuditLogNode {
    pub id: ID,
    #[graphql(name = "userId")]
    pub user_id: Option<ID>,
    pub action: AuditAction,
    #[graphql(name = "entityKind")]
    pub entity_kind: AuditEntityKind,
    #[graphql(name = "entityId")]
    pub entity_id: ID,
    pub changes: Json<serde_json::Value>,
    #[graphql(name = "ipAddress")]
    pub ip_address: Option<String>,
    #[graphql(name = "userAgent")]
    pub user_agent: Option<String>,
    #[graphql(name = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<audit_log::Model> for AuditLogNode {
    fn from(model: audit_log::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            user_id: model.user_id.map(|id| ID::from(id.to_string())),
            action: model.action.into(),
            entity_kind: model.entity_kind.into(),
            entity_id: ID::from(model.entity_id.to_string()),
            changes: Json(model.changes),
            ip_address: model.ip_address,
            user_agent: model.user_agent,
            created_at: model.created_at.into(),
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "ActivityLog")]
pub struct ActivityLogNode {
    pub id: ID,
    #[graphql(name = "userId")]
    pub user_id: ID,
    pub date: NaiveDate,
    #[graphql(name = "visitsCount")]
    pub visits_count: i32,
    #[graphql(name = "callsCount")]
    pub calls_count: i32,
    #[graphql(name = "meetingsCount")]
    pub meetings_count: i32,
    #[graphql(name = "followupsScheduled")]
    pub followups_scheduled: i32,
    #[graphql(name = "leadsUpdated")]
    pub leads_updated: i32,
    pub notes: Option<String>,
}

impl From<activity_log::Model> for ActivityLogNode {
    fn from(model: activity_log::Model) -> Self {
        Self {
            id: ID::from(model.id.to_string()),
            user_id: ID::from(model.user_id.to_string()),
            date: model.date,
            visits_count: model.visits_count,
            calls_count: model.calls_count,
            meetings_count: model.meetings_count,
            followups_scheduled: model.followups_scheduled,
            leads_updated: model.leads_updated,
            notes: model.notes,
        }
    }
}

#[derive(Clone, Debug, SimpleObject)]
pub struct GroupCount {
    pub key: Option<String>,
    pub count: i64,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct LeadStats {
    pub total: i64,
    #[graphql(name = "byStatus")]
    pub by_status: Vec<GroupCount>,
    #[graphql(name = "byIntent")]
    pub by_intent: Vec<GroupCount>,
    #[graphql(name = "byCity")]
    pub by_city: Vec<GroupCount>,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct ActivityStats {
    #[graphql(name = "totalVisits")]
    pub total_visits: i64,
    #[graphql(name = "totalCalls")]
    pub total_calls: i64,
    #[graphql(name = "totalMeetings")]
    pub total_meetings: i64,
    #[graphql(name = "totalFollowups")]
    pub total_followups: i64,
    #[graphql(name = "totalLeadsUpdated")]
    pub total_leads_updated: i64,
}

#[derive(Clone, Debug, SimpleObject)]
pub struct CompleteTaskPayload {
    pub task: TaskNode,
    #[graphql(name = "nextAction")]
    pub next_action: Option<TaskNode>,
}

#[derive(Clone, Debug, SimpleObject, Default)]
pub struct AuthPayload {
    pub ok: bool,
    pub token: Option<String>,
    pub user: Option<UserNode>,
    pub error: Option<String>,
}

impl AuthPayload {
    fn invalid() -> Self {
        Self {
            ok: false,
            token: None,
            user: None,
            error: Some("Invalid credentials".into()),
        }
    }
}

#[derive(Debug, Default, FromQueryResult)]
struct ActivityTotalsRow {
    total_visits: Option<i64>,
    total_calls: Option<i64>,
    total_meetings: Option<i64>,
    total_followups: Option<i64>,
    total_leads_updated: Option<i64>,
}

#[derive(Debug, FromQueryResult)]
struct GroupCountRow {
    key: Option<String>,
    count: i64,
}

// ---------------------------------------------------------------------------
// Service internals. Each mutation runs inside one transaction together with
// its audit row; an audit failure rolls the business change back.
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ServiceError {
    Validation {
        field: &'static str,
        message: String,
    },
    NotFound(&'static str),
    Db(DbErr),
}

impl From<DbErr> for ServiceError {
    fn from(value: DbErr) -> Self {
        ServiceError::Db(value)
    }
}

fn service_error(err: ServiceError) -> Error {
    match err {
        ServiceError::Validation { field, message } => Error::new(message)
            .extend_with(|_, e| {
                e.set("code", "VALIDATION");
                e.set("field", field);
            }),
        ServiceError::NotFound(what) => {
            error_with_code("NOT_FOUND", format!("{} not found", what))
        }
        ServiceError::Db(e) => db_error(e),
    }
}

async fn record_audit<C: ConnectionTrait>(
    conn: &C,
    actor: Option<Uuid>,
    action: audit_log::Action,
    entity_kind: audit_log::EntityKind,
    entity_id: Uuid,
    changes: serde_json::Value,
    meta: &RequestMeta,
) -> Result<(), DbErr> {
    audit_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(actor),
        action: Set(action),
        entity_kind: Set(entity_kind),
        entity_id: Set(entity_id),
        changes: Set(changes),
        ip_address: Set(meta.ip_address.clone()),
        user_agent: Set(meta.user_agent.clone()),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Get-or-create the (user, day) row. The unique index resolves concurrent
/// first-touch; losers of the race fall through to the select.
async fn get_or_create_activity<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    day: NaiveDate,
) -> Result<activity_log::Model, ServiceError> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let row = activity_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        date: Set(day),
        visits_count: Set(0),
        calls_count: Set(0),
        meetings_count: Set(0),
        followups_scheduled: Set(0),
        leads_updated: Set(0),
        notes: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let inserted = activity_log::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([activity_log::Column::UserId, activity_log::Column::Date])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await;
    match inserted {
        Ok(_) => {}
        Err(DbErr::RecordNotInserted) => {}
        Err(err) => return Err(err.into()),
    }
    activity_log::Entity::find()
        .filter(activity_log::Column::UserId.eq(user_id))
        .filter(activity_log::Column::Date.eq(day))
        .one(conn)
        .await?
        .ok_or(ServiceError::NotFound("Activity log"))
}

async fn bump_activity<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    day: NaiveDate,
    counter: activity_log::Column,
) -> Result<(), ServiceError> {
    get_or_create_activity(conn, user_id, day).await?;
    activity_log::Entity::update_many()
        .col_expr(counter, Expr::col(counter).add(1))
        .col_expr(
            activity_log::Column::UpdatedAt,
            Expr::value(DateTimeWithTimeZone::from(Utc::now())),
        )
        .filter(activity_log::Column::UserId.eq(user_id))
        .filter(activity_log::Column::Date.eq(day))
        .exec(conn)
        .await?;
    Ok(())
}

async fn log_activity_notes_internal(
    db: &DatabaseConnection,
    current: &CurrentUser,
    day: NaiveDate,
    notes: String,
) -> Result<activity_log::Model, ServiceError> {
    let txn = db.begin().await?;
    let row = get_or_create_activity(&txn, current.user_id, day).await?;
    let combined = match row.notes.as_deref().filter(|prior| !prior.is_empty()) {
        Some(prior) => format!("{prior}\n{notes}"),
        None => notes,
    };
    let mut active: activity_log::ActiveModel = row.into();
    active.notes = Set(Some(combined));
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;
    txn.commit().await?;
    Ok(updated)
}

fn completion_counter(task_type: task::TaskType) -> activity_log::Column {
    match task_type {
        task::TaskType::Visit => activity_log::Column::VisitsCount,
        task::TaskType::Call | task::TaskType::Whatsapp => activity_log::Column::CallsCount,
        task::TaskType::OnlineMeeting => activity_log::Column::MeetingsCount,
    }
}

async fn create_lead_internal(
    db: &DatabaseConnection,
    current: &CurrentUser,
    meta: &RequestMeta,
    input: NewLeadInput,
) -> Result<lead::Model, ServiceError> {
    if input.company_name.trim().is_empty() {
        return Err(ServiceError::Validation {
            field: "company_name",
            message: "Company name cannot be empty".into(),
        });
    }
    let assigned_to = parse_service_id(&input.assigned_to)?;
    if let Some(user_id) = assigned_to {
        ensure_active_user(db, user_id).await?;
    }
    let txn = db.begin().await?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let lead_id = Uuid::new_v4();
    let model = lead::ActiveModel {
        id: Set(lead_id),
        status: Set(lead::Status::Open),
        first_name: Set(input.first_name),
        last_name: Set(input.last_name),
        company_name: Set(input.company_name),
        company_size: Set(input.company_size),
        industry: Set(input.industry),
        city: Set(input.city),
        state: Set(input.state),
        phone: Set(input.phone),
        email: Set(input.email),
        infrastructure: Set(input.infrastructure.map(Into::into)),
        client_type: Set(input.client_type.map(Into::into)),
        intent: Set(input.intent.map(Into::into)),
        research_notes: Set(input.research_notes),
        closing_strategy: Set(input.closing_strategy),
        partnership_interest: Set(input
            .partnership_interest
            .map(Into::into)
            .unwrap_or(lead::PartnershipInterest::NotDiscussed)),
        won_reason: Set(None),
        lost_reason: Set(None),
        assigned_to: Set(assigned_to),
        created_by: Set(Some(current.user_id)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    if let Some(contacts) = input.contacts {
        insert_contacts(&txn, lead_id, contacts, now).await?;
    }
    record_audit(
        &txn,
        Some(current.user_id),
        audit_log::Action::Create,
        audit_log::EntityKind::Lead,
        lead_id,
        lead_snapshot(&model),
        meta,
    )
    .await?;
    txn.commit().await?;
    Ok(model)
}

async fn update_lead_internal(
    db: &DatabaseConnection,
    current: &CurrentUser,
    meta: &RequestMeta,
    input: UpdateLeadInput,
    today: NaiveDate,
) -> Result<lead::Model, ServiceError> {
    let lead_id = parse_service_id(&Some(input.id.clone()))?.ok_or(ServiceError::NotFound("Lead"))?;
    let assigned_target = parse_service_id(&input.assigned_to)?;
    if let Some(user_id) = assigned_target {
        ensure_active_user(db, user_id).await?;
    }
    let txn = db.begin().await?;
    let existing = scope_leads(lead::Entity::find_by_id(lead_id), current)
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound("Lead"))?;

    let new_status: Option<lead::Status> = input.status.map(Into::into);
    let effective_status = new_status.unwrap_or(existing.status);
    if effective_status == lead::Status::Won {
        let supplied = input
            .won_reason
            .as_deref()
            .map(|r| !r.trim().is_empty())
            .unwrap_or(false);
        let existing_reason = existing
            .won_reason
            .as_deref()
            .map(|r| !r.trim().is_empty())
            .unwrap_or(false);
        if !supplied && !existing_reason {
            return Err(ServiceError::Validation {
                field: "won_reason",
                message: "Won reason is required when status is Won".into(),
            });
        }
    }
    if effective_status == lead::Status::Lost {
        let supplied = input
            .lost_reason
            .as_deref()
            .map(|r| !r.trim().is_empty())
            .unwrap_or(false);
        let existing_reason = existing
            .lost_reason
            .as_deref()
            .map(|r| !r.trim().is_empty())
            .unwrap_or(false);
        if !supplied && !existing_reason {
            return Err(ServiceError::Validation {
                field: "lost_reason",
                message: "Lost reason is required when status is Lost".into(),
            });
        }
    }

    let status_changed = new_status.map(|s| s != existing.status).unwrap_or(false);
    let mut changes = serde_json::Map::new();
    let mut active: lead::ActiveModel = existing.clone().into();

    if let Some(status) = new_status {
        if status != existing.status {
            changes.insert(
                "status".into(),
                json!({"old": lead_status_str(existing.status), "new": lead_status_str(status)}),
            );
            active.status = Set(status);
        }
    }
    if let Some(first_name) = input.first_name {
        if first_name != existing.first_name {
            changes.insert(
                "first_name".into(),
                json!({"old": existing.first_name, "new": first_name}),
            );
            active.first_name = Set(first_name);
        }
    }
    if let Some(last_name) = input.last_name {
        if last_name != existing.last_name {
            changes.insert(
                "last_name".into(),
                json!({"old": existing.last_name, "new": last_name}),
            );
            active.last_name = Set(last_name);
        }
    }
    if let Some(company_name) = input.company_name {
        if company_name != existing.company_name {
            changes.insert(
                "company_name".into(),
                json!({"old": existing.company_name, "new": company_name}),
            );
            active.company_name = Set(company_name);
        }
    }
    if let Some(company_size) = input.company_size {
        if Some(&company_size) != existing.company_size.as_ref() {
            changes.insert(
                "company_size".into(),
                json!({"old": existing.company_size, "new": company_size}),
            );
            active.company_size = Set(Some(company_size));
        }
    }
    if let Some(industry) = input.industry {
        if Some(&industry) != existing.industry.as_ref() {
            changes.insert(
                "industry".into(),
                json!({"old": existing.industry, "new": industry}),
            );
            active.industry = Set(Some(industry));
        }
    }
    if let Some(city) = input.city {
        if city != existing.city {
            changes.insert("city".into(), json!({"old": existing.city, "new": city}));
            active.city = Set(city);
        }
    }
    if let Some(state) = input.state {
        if Some(&state) != existing.state.as_ref() {
            changes.insert("state".into(), json!({"old": existing.state, "new": state}));
            active.state = Set(Some(state));
        }
    }
    if let Some(phone) = input.phone {
        if phone != existing.phone {
            changes.insert("phone".into(), json!({"old": existing.phone, "new": phone}));
            active.phone = Set(phone);
        }
    }
    if let Some(email) = input.email {
        if Some(&email) != existing.email.as_ref() {
            changes.insert("email".into(), json!({"old": existing.email, "new": email}));
            active.email = Set(Some(email));
        }
    }
    if let Some(infrastructure) = input.infrastructure {
        let value: lead::Infrastructure = infrastructure.into();
        if Some(value) != existing.infrastructure {
            changes.insert(
                "infrastructure".into(),
                json!({
                    "old": existing.infrastructure.map(infrastructure_str),
                    "new": infrastructure_str(value)
                }),
            );
            active.infrastructure = Set(Some(value));
        }
    }
    if let Some(client_type) = input.client_type {
        let value: lead::ClientType = client_type.into();
        if Some(value) != existing.client_type {
            changes.insert(
                "client_type".into(),
                json!({
                    "old": existing.client_type.map(client_type_str),
                    "new": client_type_str(value)
                }),
            );
            active.client_type = Set(Some(value));
        }
    }
    if let Some(intent) = input.intent {
        let value: lead::Intent = intent.into();
        if Some(value) != existing.intent {
            changes.insert(
                "intent".into(),
                json!({
                    "old": existing.intent.map(intent_str),
                    "new": intent_str(value)
                }),
            );
            active.intent = Set(Some(value));
        }
    }
    if let Some(research_notes) = input.research_notes {
        if Some(&research_notes) != existing.research_notes.as_ref() {
            changes.insert(
                "research_notes".into(),
                json!({"old": existing.research_notes, "new": research_notes}),
            );
            active.research_notes = Set(Some(research_notes));
        }
    }
    if let Some(closing_strategy) = input.closing_strategy {
        if Some(&closing_strategy) != existing.closing_strategy.as_ref() {
            changes.insert(
                "closing_strategy".into(),
                json!({"old": existing.closing_strategy, "new": closing_strategy}),
            );
            active.closing_strategy = Set(Some(closing_strategy));
        }
    }
    if let Some(partnership_interest) = input.partnership_interest {
        let value: lead::PartnershipInterest = partnership_interest.into();
        if value != existing.partnership_interest {
            changes.insert(
                "partnership_interest".into(),
                json!({
                    "old": partnership_str(existing.partnership_interest),
                    "new": partnership_str(value)
                }),
            );
            active.partnership_interest = Set(value);
        }
    }
    if let Some(won_reason) = input.won_reason {
        if Some(&won_reason) != existing.won_reason.as_ref() {
            changes.insert(
                "won_reason".into(),
                json!({"old": existing.won_reason, "new": won_reason}),
            );
            active.won_reason = Set(Some(won_reason));
        }
    }
    if let Some(lost_reason) = input.lost_reason {
        if Some(&lost_reason) != existing.lost_reason.as_ref() {
            changes.insert(
                "lost_reason".into(),
                json!({"old": existing.lost_reason, "new": lost_reason}),
            );
            active.lost_reason = Set(Some(lost_reason));
        }
    }
    if input.assigned_to.is_some() {
        if assigned_target != existing.assigned_to {
            changes.insert(
                "assigned_to".into(),
                json!({
                    "old": existing.assigned_to.map(|id| id.to_string()),
                    "new": assigned_target.map(|id| id.to_string())
                }),
            );
            active.assigned_to = Set(assigned_target);
        }
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    if let Some(contacts) = input.contacts {
        // Full replace: child identity is not preserved.
        contact::Entity::delete_many()
            .filter(contact::Column::LeadId.eq(lead_id))
            .exec(&txn)
            .await?;
        changes.insert("contacts".into(), json!({"replaced": contacts.len()}));
        insert_contacts(&txn, lead_id, contacts, now).await?;
    }

    let action = if status_changed {
        audit_log::Action::StatusChange
    } else {
        audit_log::Action::Update
    };
    record_audit(
        &txn,
        Some(current.user_id),
        action,
        audit_log::EntityKind::Lead,
        lead_id,
        serde_json::Value::Object(changes),
        meta,
    )
    .await?;
    bump_activity(&txn, current.user_id, today, activity_log::Column::LeadsUpdated).await?;
    txn.commit().await?;
    Ok(updated)
}

async fn assign_lead_internal(
    db: &DatabaseConnection,
    current: &CurrentUser,
    meta: &RequestMeta,
    lead_id: Uuid,
    target: Option<Uuid>,
) -> Result<lead::Model, ServiceError> {
    if let Some(user_id) = target {
        ensure_active_user(db, user_id).await?;
    }
    let txn = db.begin().await?;
    let existing = lead::Entity::find_by_id(lead_id)
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound("Lead"))?;
    let previous = existing.assigned_to;
    let mut active: lead::ActiveModel = existing.into();
    active.assigned_to = Set(target);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;
    record_audit(
        &txn,
        Some(current.user_id),
        audit_log::Action::Update,
        audit_log::EntityKind::Lead,
        lead_id,
        json!({
            "assigned_to": {
                "old": previous.map(|id| id.to_string()),
                "new": target.map(|id| id.to_string())
            }
        }),
        meta,
    )
    .await?;
    txn.commit().await?;
    Ok(updated)
}

async fn delete_lead_internal(
    db: &DatabaseConnection,
    current: &CurrentUser,
    meta: &RequestMeta,
    lead_id: Uuid,
) -> Result<(), ServiceError> {
    let txn = db.begin().await?;
    let existing = lead::Entity::find_by_id(lead_id)
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound("Lead"))?;
    let snapshot = lead_snapshot(&existing);
    lead::Entity::delete_by_id(lead_id).exec(&txn).await?;
    record_audit(
        &txn,
        Some(current.user_id),
        audit_log::Action::Delete,
        audit_log::EntityKind::Lead,
        lead_id,
        snapshot,
        meta,
    )
    .await?;
    txn.commit().await?;
    Ok(())
}

async fn create_task_internal(
    db: &DatabaseConnection,
    current: &CurrentUser,
    meta: &RequestMeta,
    input: NewTaskInput,
) -> Result<task::Model, ServiceError> {
    let lead_id = parse_service_id(&Some(input.lead_id.clone()))?.ok_or(ServiceError::NotFound("Lead"))?;
    let task_type: task::TaskType = input.task_type.into();
    if input.visit.is_some() && task_type != task::TaskType::Visit {
        return Err(ServiceError::Validation {
            field: "visit",
            message: "Visit details are only valid for visit-type tasks".into(),
        });
    }
    let assigned_to = match parse_service_id(&input.assigned_to)? {
        Some(user_id) => {
            ensure_active_user(db, user_id).await?;
            Some(user_id)
        }
        None => Some(current.user_id),
    };
    let txn = db.begin().await?;
    // Scoped lookup: an executive cannot schedule against another's lead.
    scope_leads(lead::Entity::find_by_id(lead_id), current)
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound("Lead"))?;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let task_id = Uuid::new_v4();
    let model = task::ActiveModel {
        id: Set(task_id),
        task_type: Set(task_type),
        lead_id: Set(lead_id),
        scheduled_at: Set(input.scheduled_at.into()),
        assigned_to: Set(assigned_to),
        status: Set(task::Status::Planned),
        outcome_notes: Set(None),
        next_action_required: Set(false),
        created_by: Set(Some(current.user_id)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    if let Some(visit_input) = input.visit {
        insert_visit(&txn, task_id, visit_input, now).await?;
    }
    record_audit(
        &txn,
        Some(current.user_id),
        audit_log::Action::Create,
        audit_log::EntityKind::Task,
        task_id,
        task_snapshot(&model),
        meta,
    )
    .await?;
    txn.commit().await?;
    Ok(model)
}

async fn complete_task_internal(
    db: &DatabaseConnection,
    current: &CurrentUser,
    meta: &RequestMeta,
    task_id: Uuid,
    input: CompleteTaskInput,
    today: NaiveDate,
) -> Result<(task::Model, Option<task::Model>), ServiceError> {
    let txn = db.begin().await?;
    let existing = scope_tasks(task::Entity::find_by_id(task_id), current)
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound("Task"))?;
    if existing.status != task::Status::Planned {
        return Err(ServiceError::Validation {
            field: "status",
            message: format!(
                "Only planned tasks can be completed (currently {})",
                task_status_str(existing.status)
            ),
        });
    }
    let task_type = existing.task_type;
    let lead_id = existing.lead_id;
    let assignee = existing.assigned_to;
    let now: DateTimeWithTimeZone = Utc::now().into();
    let mut active: task::ActiveModel = existing.into();
    active.status = Set(task::Status::Completed);
    active.outcome_notes = Set(input.outcome_notes.clone());
    active.next_action_required = Set(input.next_action_required);
    active.updated_at = Set(now);
    let completed = active.update(&txn).await?;
    record_audit(
        &txn,
        Some(current.user_id),
        audit_log::Action::StatusChange,
        audit_log::EntityKind::Task,
        task_id,
        json!({"status": {"old": "planned", "new": "completed"}}),
        meta,
    )
    .await?;
    bump_activity(&txn, current.user_id, today, completion_counter(task_type)).await?;

    let successor = if input.next_action_required {
        if let Some(next) = input.next_action {
            let next_id = Uuid::new_v4();
            let model = task::ActiveModel {
                id: Set(next_id),
                task_type: Set(next.task_type.into()),
                lead_id: Set(lead_id),
                scheduled_at: Set(next.scheduled_at.into()),
                assigned_to: Set(assignee.or(Some(current.user_id))),
                status: Set(task::Status::Planned),
                outcome_notes: Set(None),
                next_action_required: Set(false),
                created_by: Set(Some(current.user_id)),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
            record_audit(
                &txn,
                Some(current.user_id),
                audit_log::Action::Create,
                audit_log::EntityKind::Task,
                next_id,
                task_snapshot(&model),
                meta,
            )
            .await?;
            bump_activity(
                &txn,
                current.user_id,
                today,
                activity_log::Column::FollowupsScheduled,
            )
            .await?;
            Some(model)
        } else {
            None
        }
    } else {
        None
    };
    txn.commit().await?;
    Ok((completed, successor))
}

async fn miss_task_internal(
    db: &DatabaseConnection,
    current: &CurrentUser,
    meta: &RequestMeta,
    task_id: Uuid,
) -> Result<task::Model, ServiceError> {
    let txn = db.begin().await?;
    let existing = scope_tasks(task::Entity::find_by_id(task_id), current)
        .one(&txn)
        .await?
        .ok_or(ServiceError::NotFound("Task"))?;
    if existing.status != task::Status::Planned {
        return Err(ServiceError::Validation {
            field: "status",
            message: format!(
                "Only planned tasks can be missed (currently {})",
                task_status_str(existing.status)
            ),
        });
    }
    let mut active: task::ActiveModel = existing.into();
    active.status = Set(task::Status::Missed);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;
    record_audit(
        &txn,
        Some(current.user_id),
        audit_log::Action::StatusChange,
        audit_log::EntityKind::Task,
        task_id,
        json!({"status": {"old": "planned", "new": "missed"}}),
        meta,
    )
    .await?;
    txn.commit().await?;
    Ok(updated)
}

async fn insert_contacts<C: ConnectionTrait>(
    conn: &C,
    lead_id: Uuid,
    contacts: Vec<ContactInput>,
    now: DateTimeWithTimeZone,
) -> Result<(), ServiceError> {
    for contact_input in contacts {
        if contact_input.name.trim().is_empty() {
            return Err(ServiceError::Validation {
                field: "contacts",
                message: "Contact name cannot be empty".into(),
            });
        }
        contact::ActiveModel {
            id: Set(Uuid::new_v4()),
            lead_id: Set(lead_id),
            name: Set(contact_input.name),
            role: Set(contact_input.role),
            phone: Set(contact_input.phone),
            email: Set(contact_input.email),
            decision_maker: Set(contact_input.decision_maker),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

async fn insert_visit<C: ConnectionTrait>(
    conn: &C,
    task_id: Uuid,
    input: VisitInput,
    now: DateTimeWithTimeZone,
) -> Result<visit::Model, ServiceError> {
    let model = visit::ActiveModel {
        id: Set(Uuid::new_v4()),
        task_id: Set(task_id),
        person_spoken_to: Set(input.person_spoken_to),
        person_role: Set(input.person_role),
        deployment_pain_points: Set(input.deployment_pain_points),
        partnership_interest: Set(input
            .partnership_interest
            .map(Into::into)
            .unwrap_or(lead::PartnershipInterest::NotDiscussed)),
        interest_level: Set(input.interest_level.map(Into::into)),
        demo_video_shared: Set(input.demo_video_shared),
        meeting_permitted: Set(input.meeting_permitted),
        meeting_declined: Set(input.meeting_declined),
        decline_reason: Set(input.decline_reason),
        meeting_rescheduled: Set(input.meeting_rescheduled),
        reschedule_reason: Set(input.reschedule_reason),
        suggested_followup_date: Set(input.suggested_followup_date.map(Into::into)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;
    Ok(model)
}

async fn ensure_active_user(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Uuid, ServiceError> {
    let record = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound("User"))?;
    if !record.is_active {
        return Err(ServiceError::Validation {
            field: "assigned_to",
            message: "Cannot assign to a deactivated user".into(),
        });
    }
    Ok(record.id)
}

fn lead_snapshot(model: &lead::Model) -> serde_json::Value {
    json!({
        "status": lead_status_str(model.status),
        "company_name": model.company_name,
        "first_name": model.first_name,
        "last_name": model.last_name,
        "city": model.city,
        "phone": model.phone,
        "intent": model.intent.map(intent_str),
        "assigned_to": model.assigned_to.map(|id| id.to_string()),
    })
}

fn task_snapshot(model: &task::Model) -> serde_json::Value {
    json!({
        "task_type": task_type_str(model.task_type),
        "lead_id": model.lead_id.to_string(),
        "scheduled_at": DateTime::<Utc>::from(model.scheduled_at).to_rfc3339(),
        "status": task_status_str(model.status),
        "assigned_to": model.assigned_to.map(|id| id.to_string()),
    })
}

// ---------------------------------------------------------------------------
// Query plumbing.
// ---------------------------------------------------------------------------

fn filtered_leads(
    current: &CurrentUser,
    filter: Option<LeadFilter>,
) -> async_graphql::Result<Select<lead::Entity>> {
    // Scope first so no caller filter can reveal out-of-scope rows.
    let mut query = scope_leads(lead::Entity::find(), current);
    if let Some(filter) = filter {
        if let Some(status) = filter.status {
            query = query.filter(lead::Column::Status.eq(lead::Status::from(status)));
        }
        if let Some(city) = sanitize_optional_filter(filter.city) {
            let pattern = format!("%{}%", city.to_lowercase());
            let city_expr = Expr::expr(Func::lower(Expr::col(lead::Column::City)));
            query = query.filter(city_expr.like(pattern));
        }
        if let Some(intent) = filter.intent {
            query = query.filter(lead::Column::Intent.eq(lead::Intent::from(intent)));
        }
        if let Some(assigned_to) = &filter.assigned_to {
            if current.is_manager_or_admin() {
                let user_id = parse_uuid(assigned_to)?;
                query = query.filter(lead::Column::AssignedTo.eq(user_id));
            }
        }
        if let Some(search) = sanitize_optional_filter(filter.search) {
            let pattern = format!("%{}%", search.to_lowercase());
            let company_expr = Expr::expr(Func::lower(Expr::col(lead::Column::CompanyName)));
            let first_expr = Expr::expr(Func::lower(Expr::col(lead::Column::FirstName)));
            let last_expr = Expr::expr(Func::lower(Expr::col(lead::Column::LastName)));
            let phone_expr = Expr::expr(Func::lower(Expr::col(lead::Column::Phone)));
            let email_expr = Expr::expr(Func::lower(Expr::col(lead::Column::Email)));
            let condition = Condition::any()
                .add(company_expr.like(pattern.clone()))
                .add(first_expr.like(pattern.clone()))
                .add(last_expr.like(pattern.clone()))
                .add(phone_expr.like(pattern.clone()))
                .add(email_expr.like(pattern));
            query = query.filter(condition);
        }
    }
    Ok(query)
}

fn filtered_tasks(
    current: &CurrentUser,
    filter: Option<TaskFilter>,
) -> async_graphql::Result<Select<task::Entity>> {
    let mut query = scope_tasks(task::Entity::find(), current);
    if let Some(filter) = filter {
        if filter.today.is_some() && filter.overdue.unwrap_or(false) {
            return Err(validation_error(
                "today and overdue filters are mutually exclusive",
            ));
        }
        if let Some(status) = filter.status {
            query = query.filter(task::Column::Status.eq(task::Status::from(status)));
        }
        if let Some(task_type) = filter.task_type {
            query = query.filter(task::Column::TaskType.eq(task::TaskType::from(task_type)));
        }
        if let Some(lead_id) = parse_optional_id("leadId", &filter.lead_id)? {
            query = query.filter(task::Column::LeadId.eq(lead_id));
        }
        if let Some(after) = filter.scheduled_after {
            let ts: DateTimeWithTimeZone = after.into();
            query = query.filter(task::Column::ScheduledAt.gte(ts));
        }
        if let Some(before) = filter.scheduled_before {
            let ts: DateTimeWithTimeZone = before.into();
            query = query.filter(task::Column::ScheduledAt.lte(ts));
        }
        if let Some(day) = filter.today {
            let (start, end) = day_window(day);
            query = query
                .filter(task::Column::ScheduledAt.gte(start))
                .filter(task::Column::ScheduledAt.lt(end));
        }
        if filter.overdue.unwrap_or(false) {
            let now: DateTimeWithTimeZone = Utc::now().into();
            query = query
                .filter(task::Column::Status.eq(task::Status::Planned))
                .filter(task::Column::ScheduledAt.lt(now));
        }
    }
    Ok(query)
}

async fn group_counts(
    db: &DatabaseConnection,
    base: Select<lead::Entity>,
    column: lead::Column,
) -> async_graphql::Result<Vec<GroupCount>> {
    let rows = base
        .select_only()
        .column_as(column, "key")
        .column_as(lead::Column::Id.count(), "count")
        .group_by(column)
        .into_model::<GroupCountRow>()
        .all(db)
        .await
        .map_err(db_error)?;
    Ok(rows
        .into_iter()
        .map(|row| GroupCount {
            key: row.key,
            count: row.count,
        })
        .collect())
}

fn day_window(day: NaiveDate) -> (DateTimeWithTimeZone, DateTimeWithTimeZone) {
    let start = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)).into();
    let end = Utc
        .from_utc_datetime(&(day + Duration::days(1)).and_time(NaiveTime::MIN))
        .into();
    (start, end)
}

fn database(ctx: &Context<'_>) -> async_graphql::Result<Arc<DatabaseConnection>> {
    ctx.data::<Arc<DatabaseConnection>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing database connection"))
}

fn auth_config(ctx: &Context<'_>) -> async_graphql::Result<Arc<AuthConfig>> {
    ctx.data::<Arc<AuthConfig>>()
        .cloned()
        .map_err(|_| error_with_code("INTERNAL", "Missing auth configuration"))
}

fn request_meta(ctx: &Context<'_>) -> RequestMeta {
    ctx.data_opt::<RequestMeta>().cloned().unwrap_or_default()
}

fn require_current(ctx: &Context<'_>) -> async_graphql::Result<CurrentUser> {
    ctx.data_opt::<CurrentUser>()
        .cloned()
        .ok_or_else(|| error_with_code("UNAUTHENTICATED", "Login required"))
}

fn require_role(ctx: &Context<'_>, role: UserRole) -> async_graphql::Result<CurrentUser> {
    let current = require_current(ctx)?;
    if current.has_role(role) {
        Ok(current)
    } else {
        Err(error_with_code("FORBIDDEN", "Insufficient permissions"))
    }
}

fn parse_uuid(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| error_with_code("BAD_REQUEST", "Invalid ID"))
}

fn parse_optional_id(field: &str, id: &Option<ID>) -> async_graphql::Result<Option<Uuid>> {
    match id {
        Some(value) => Uuid::parse_str(value.as_str())
            .map(Some)
            .map_err(|_| error_with_code("BAD_REQUEST", format!("Invalid {}", field))),
        None => Ok(None),
    }
}

fn parse_service_id(id: &Option<ID>) -> Result<Option<Uuid>, ServiceError> {
    match id {
        Some(value) => Uuid::parse_str(value.as_str())
            .map(Some)
            .map_err(|_| ServiceError::NotFound("Record")),
        None => Ok(None),
    }
}

fn sanitize_optional_filter(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn normalize_email(email: &str) -> async_graphql::Result<String> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() || !normalized.contains('@') {
        return Err(validation_error("Invalid email address"));
    }
    Ok(normalized)
}

fn hash_password(password: &str) -> Result<String, DbErr> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| DbErr::Custom(format!("hash error: {}", err)))
}

fn append_session_cookie(ctx: &Context<'_>, token: &str, ttl_minutes: i64) {
    let max_age = if ttl_minutes < 0 { 0 } else { ttl_minutes * 60 };
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    );
    ctx.append_http_header("Set-Cookie", cookie);
}

fn db_error(err: DbErr) -> Error {
    error_with_code("INTERNAL", format!("Database error: {}", err))
}

fn validation_error(message: impl Into<String>) -> Error {
    error_with_code("VALIDATION", message)
}

fn error_with_code(code: &'static str, message: impl Into<String>) -> Error {
    Error::new(message).extend_with(|_, e| e.set("code", code))
}

// ---------------------------------------------------------------------------
// Demo seeding, shared by the server binary and integration tests.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SeededCrmRecords {
    pub users: Vec<user::Model>,
    pub leads: Vec<lead::Model>,
    pub tasks: Vec<task::Model>,
}

impl SeededCrmRecords {
    pub fn user_email(&self, email: &str) -> Option<&user::Model> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn lead_company(&self, company_name: &str) -> Option<&lead::Model> {
        self.leads.iter().find(|l| l.company_name == company_name)
    }
}

pub async fn seed_crm_demo(db: &DatabaseConnection) -> Result<SeededCrmRecords, DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let manager = insert_seed_user(
        db,
        "manager@crm.test",
        "Maya Manager",
        user::Role::SalesManager,
        Some("Bengaluru"),
        "managerpass",
    )
    .await?;
    let priya = insert_seed_user(
        db,
        "priya@crm.test",
        "Priya Exec",
        user::Role::SalesExecutive,
        Some("Bengaluru"),
        "priyapass",
    )
    .await?;
    let rahul = insert_seed_user(
        db,
        "rahul@crm.test",
        "Rahul Exec",
        user::Role::SalesExecutive,
        Some("Pune"),
        "rahulpass",
    )
    .await?;

    let cloudworks = lead::ActiveModel {
        id: Set(Uuid::new_v4()),
        status: Set(lead::Status::Open),
        first_name: Set("Anita".into()),
        last_name: Set("Rao".into()),
        company_name: Set("CloudWorks Studio".into()),
        company_size: Set(Some("11-50".into())),
        industry: Set(Some("IT Services".into())),
        city: Set("Bengaluru".into()),
        state: Set(Some("Karnataka".into())),
        phone: Set("+91-9000000001".into()),
        email: Set(Some("anita@cloudworks.test".into())),
        infrastructure: Set(Some(lead::Infrastructure::Aws)),
        client_type: Set(Some(lead::ClientType::Both)),
        intent: Set(Some(lead::Intent::High)),
        research_notes: Set(Some("Deploys weekly, heavy manual ops.".into())),
        closing_strategy: Set(None),
        partnership_interest: Set(lead::PartnershipInterest::NotDiscussed),
        won_reason: Set(None),
        lost_reason: Set(None),
        assigned_to: Set(Some(priya.id)),
        created_by: Set(Some(manager.id)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    let devfactory = lead::ActiveModel {
        id: Set(Uuid::new_v4()),
        status: Set(lead::Status::SalesNurture),
        first_name: Set("Vikram".into()),
        last_name: Set("Shah".into()),
        company_name: Set("DevFactory Labs".into()),
        company_size: Set(Some("51-200".into())),
        industry: Set(Some("Software".into())),
        city: Set("Pune".into()),
        state: Set(Some("Maharashtra".into())),
        phone: Set("+91-9000000002".into()),
        email: Set(Some("vikram@devfactory.test".into())),
        infrastructure: Set(Some(lead::Infrastructure::Mixed)),
        client_type: Set(Some(lead::ClientType::Foreign)),
        intent: Set(Some(lead::Intent::Medium)),
        research_notes: Set(None),
        closing_strategy: Set(Some("Lead with cost comparison.".into())),
        partnership_interest: Set(lead::PartnershipInterest::Yes),
        won_reason: Set(None),
        lost_reason: Set(None),
        assigned_to: Set(Some(rahul.id)),
        created_by: Set(Some(manager.id)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    contact::ActiveModel {
        id: Set(Uuid::new_v4()),
        lead_id: Set(cloudworks.id),
        name: Set("Suresh Iyer".into()),
        role: Set(Some("CTO".into())),
        phone: Set(Some("+91-9000000011".into())),
        email: Set(Some("suresh@cloudworks.test".into())),
        decision_maker: Set(true),
        created_at: Set(now),
    }
    .insert(db)
    .await?;

    let kickoff_visit = task::ActiveModel {
        id: Set(Uuid::new_v4()),
        task_type: Set(task::TaskType::Visit),
        lead_id: Set(cloudworks.id),
        scheduled_at: Set((Utc::now() + Duration::days(2)).into()),
        assigned_to: Set(Some(priya.id)),
        status: Set(task::Status::Planned),
        outcome_notes: Set(None),
        next_action_required: Set(false),
        created_by: Set(Some(priya.id)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    let intro_call = task::ActiveModel {
        id: Set(Uuid::new_v4()),
        task_type: Set(task::TaskType::Call),
        lead_id: Set(devfactory.id),
        scheduled_at: Set((Utc::now() - Duration::days(1)).into()),
        assigned_to: Set(Some(rahul.id)),
        status: Set(task::Status::Planned),
        outcome_notes: Set(None),
        next_action_required: Set(false),
        created_by: Set(Some(rahul.id)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(SeededCrmRecords {
        users: vec![manager, priya, rahul],
        leads: vec![cloudworks, devfactory],
        tasks: vec![kickoff_visit, intro_call],
    })
}

async fn insert_seed_user(
    db: &DatabaseConnection,
    email: &str,
    display_name: &str,
    role: user::Role,
    city: Option<&str>,
    password: &str,
) -> Result<user::Model, DbErr> {
    let now: DateTimeWithTimeZone = Utc::now().into();
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        display_name: Set(display_name.to_string()),
        phone: Set(None),
        city: Set(city.map(|c| c.to_string())),
        role: Set(role),
        is_active: Set(true),
        password_hash: Set(hash_password(password)?),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}
