#![allow(dead_code)]

use std::sync::Arc;

use api::auth::{AuthConfig, CurrentUser, UserRole};
use api::schema::{build_schema, AppSchema, RequestMeta};
use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;
use async_graphql::{Request, Variables};
use chrono::Utc;
use entity::{lead, task, user};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, Database, DatabaseBackend,
    DatabaseConnection, Statement,
};
use serde_json::Value;
use uuid::Uuid;

pub type TestSchema = async_graphql::Schema<
    api::schema::QueryRoot,
    api::schema::MutationRoot,
    async_graphql::EmptySubscription,
>;

pub struct TestEnv {
    pub db: Arc<DatabaseConnection>,
    pub schema: TestSchema,
}

pub async fn setup_env() -> TestEnv {
    let conn = Database::connect("sqlite::memory:").await.unwrap();
    let db = Arc::new(conn);
    bootstrap_sqlite(db.as_ref()).await;
    let auth = Arc::new(AuthConfig {
        jwt_secret: "test-secret".into(),
        session_ttl_minutes: 60,
    });
    let AppSchema(schema) = build_schema(db.clone(), auth);
    TestEnv { db, schema }
}

pub async fn exec_as(
    schema: &TestSchema,
    actor: &CurrentUser,
    query: &str,
    vars: Value,
) -> async_graphql::Response {
    schema
        .execute(
            Request::new(query)
                .variables(Variables::from_json(vars))
                .data(actor.clone())
                .data(RequestMeta {
                    ip_address: Some("127.0.0.1".into()),
                    user_agent: Some("integration-tests".into()),
                }),
        )
        .await
}

pub async fn exec_anonymous(
    schema: &TestSchema,
    query: &str,
    vars: Value,
) -> async_graphql::Response {
    schema
        .execute(Request::new(query).variables(Variables::from_json(vars)))
        .await
}

pub fn actor(record: &user::Model) -> CurrentUser {
    CurrentUser {
        user_id: record.id,
        role: UserRole::from(record.role),
    }
}

pub async fn create_user(
    db: &DatabaseConnection,
    email: &str,
    role: user::Role,
    password: &str,
) -> user::Model {
    let now: DateTimeWithTimeZone = Utc::now().into();
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string();
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        display_name: Set(email.split('@').next().unwrap_or(email).to_string()),
        phone: Set(None),
        city: Set(None),
        role: Set(role),
        is_active: Set(true),
        password_hash: Set(hash),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_lead(
    db: &DatabaseConnection,
    company_name: &str,
    city: &str,
    assigned_to: Option<Uuid>,
) -> lead::Model {
    let now: DateTimeWithTimeZone = Utc::now().into();
    lead::ActiveModel {
        id: Set(Uuid::new_v4()),
        status: Set(lead::Status::Open),
        first_name: Set("Test".into()),
        last_name: Set("Person".into()),
        company_name: Set(company_name.to_string()),
        company_size: Set(None),
        industry: Set(None),
        city: Set(city.to_string()),
        state: Set(None),
        phone: Set("+91-9999999999".into()),
        email: Set(None),
        infrastructure: Set(None),
        client_type: Set(None),
        intent: Set(None),
        research_notes: Set(None),
        closing_strategy: Set(None),
        partnership_interest: Set(lead::PartnershipInterest::NotDiscussed),
        won_reason: Set(None),
        lost_reason: Set(None),
        assigned_to: Set(assigned_to),
        created_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn create_task(
    db: &DatabaseConnection,
    lead_id: Uuid,
    assigned_to: Option<Uuid>,
    task_type: task::TaskType,
    status: task::Status,
    scheduled_at: DateTimeWithTimeZone,
) -> task::Model {
    let now: DateTimeWithTimeZone = Utc::now().into();
    task::ActiveModel {
        id: Set(Uuid::new_v4()),
        task_type: Set(task_type),
        lead_id: Set(lead_id),
        scheduled_at: Set(scheduled_at),
        assigned_to: Set(assigned_to),
        status: Set(status),
        outcome_notes: Set(None),
        next_action_required: Set(false),
        created_by: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
}

async fn bootstrap_sqlite(db: &DatabaseConnection) {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE user (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            phone TEXT,
            city TEXT,
            role TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE lead (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL DEFAULT 'open',
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            company_name TEXT NOT NULL,
            company_size TEXT,
            industry TEXT,
            city TEXT NOT NULL,
            state TEXT,
            phone TEXT NOT NULL,
            email TEXT,
            infrastructure TEXT,
            client_type TEXT,
            intent TEXT,
            research_notes TEXT,
            closing_strategy TEXT,
            partnership_interest TEXT NOT NULL DEFAULT 'not_discussed',
            won_reason TEXT,
            lost_reason TEXT,
            assigned_to TEXT,
            created_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(assigned_to) REFERENCES user(id) ON DELETE SET NULL,
            FOREIGN KEY(created_by) REFERENCES user(id) ON DELETE SET NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE contact (
            id TEXT PRIMARY KEY,
            lead_id TEXT NOT NULL,
            name TEXT NOT NULL,
            role TEXT,
            phone TEXT,
            email TEXT,
            decision_maker INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY(lead_id) REFERENCES lead(id) ON DELETE CASCADE
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE task (
            id TEXT PRIMARY KEY,
            task_type TEXT NOT NULL,
            lead_id TEXT NOT NULL,
            scheduled_at TEXT NOT NULL,
            assigned_to TEXT,
            status TEXT NOT NULL DEFAULT 'planned',
            outcome_notes TEXT,
            next_action_required INTEGER NOT NULL DEFAULT 0,
            created_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(lead_id) REFERENCES lead(id) ON DELETE CASCADE,
            FOREIGN KEY(assigned_to) REFERENCES user(id) ON DELETE SET NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE visit (
            id TEXT PRIMARY KEY,
            task_id TEXT NOT NULL UNIQUE,
            person_spoken_to TEXT,
            person_role TEXT,
            deployment_pain_points TEXT,
            partnership_interest TEXT NOT NULL DEFAULT 'not_discussed',
            interest_level TEXT,
            demo_video_shared INTEGER NOT NULL DEFAULT 0,
            meeting_permitted INTEGER NOT NULL DEFAULT 1,
            meeting_declined INTEGER NOT NULL DEFAULT 0,
            decline_reason TEXT,
            meeting_rescheduled INTEGER NOT NULL DEFAULT 0,
            reschedule_reason TEXT,
            suggested_followup_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(task_id) REFERENCES task(id) ON DELETE CASCADE
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE audit_log (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            action TEXT NOT NULL,
            entity_kind TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            changes TEXT NOT NULL DEFAULT '{}',
            ip_address TEXT,
            user_agent TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE SET NULL
        );
        "#,
    ))
    .await
    .unwrap();

    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"
        CREATE TABLE activity_log (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            date TEXT NOT NULL,
            visits_count INTEGER NOT NULL DEFAULT 0,
            calls_count INTEGER NOT NULL DEFAULT 0,
            meetings_count INTEGER NOT NULL DEFAULT 0,
            followups_scheduled INTEGER NOT NULL DEFAULT 0,
            leads_updated INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(user_id, date),
            FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
        );
        "#,
    ))
    .await
    .unwrap();
}
