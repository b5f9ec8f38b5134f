mod common;

use chrono::{Duration, Utc};
use common::{actor, create_lead, create_task, create_user, exec_anonymous, exec_as, setup_env};
use entity::{task, user};
use serde_json::json;

const AUDIT_QUERY: &str = r#"
    query Audits($filter: AuditFilter) {
        crm {
            auditLogs(filter: $filter) {
                action
                entityKind
                entityId
                userId
                changes
                ipAddress
            }
        }
    }
"#;

#[tokio::test]
async fn lead_mutations_write_audit_rows() {
    let env = setup_env().await;
    let manager = create_user(env.db.as_ref(), "manager@test", user::Role::SalesManager, "pw").await;
    let current = actor(&manager);

    let create = r#"
        mutation Create($input: NewLeadInput!) {
            crm { createLead(input: $input) { id } }
        }
    "#;
    let resp = exec_as(
        &env.schema,
        &current,
        create,
        json!({
            "input": {
                "firstName": "Asha",
                "lastName": "Verma",
                "companyName": "Audit Co",
                "city": "Pune",
                "phone": "+91-9222222222"
            }
        }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let lead_id = resp.data.into_json().unwrap()["crm"]["createLead"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let update = r#"
        mutation Update($input: UpdateLeadInput!) {
            crm { updateLead(input: $input) { id } }
        }
    "#;
    let resp = exec_as(
        &env.schema,
        &current,
        update,
        json!({ "input": { "id": lead_id, "status": "SALES_NURTURE" } }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);

    let resp = exec_as(
        &env.schema,
        &current,
        AUDIT_QUERY,
        json!({ "filter": { "entityKind": "LEAD", "entityId": lead_id } }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let rows = resp.data.into_json().unwrap()["crm"]["auditLogs"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(rows.len(), 2);
    // Newest first.
    assert_eq!(rows[0]["action"], "STATUS_CHANGE");
    assert_eq!(rows[1]["action"], "CREATE");
    assert_eq!(rows[0]["userId"], manager.id.to_string());
    assert_eq!(rows[0]["ipAddress"], "127.0.0.1");
    let changes = &rows[0]["changes"];
    assert_eq!(changes["status"]["old"], "open");
    assert_eq!(changes["status"]["new"], "sales_nurture");
}

#[tokio::test]
async fn lead_update_diff_records_old_and_new_for_every_field() {
    let env = setup_env().await;
    let manager = create_user(env.db.as_ref(), "manager@test", user::Role::SalesManager, "pw").await;
    let record = create_lead(env.db.as_ref(), "Diff Co", "Pune", None).await;
    let current = actor(&manager);

    let update = r#"
        mutation Update($input: UpdateLeadInput!) {
            crm { updateLead(input: $input) { id } }
        }
    "#;
    let resp = exec_as(
        &env.schema,
        &current,
        update,
        json!({
            "input": {
                "id": record.id,
                "city": "Goa",
                "researchNotes": "Runs a 40-node fleet",
                "closingStrategy": "Lead with the managed tier",
                "infrastructure": "AWS",
                "clientType": "INDIAN",
                "partnershipInterest": "YES"
            }
        }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);

    let resp = exec_as(
        &env.schema,
        &current,
        AUDIT_QUERY,
        json!({ "filter": { "entityKind": "LEAD", "entityId": record.id } }),
    )
    .await;
    let rows = resp.data.into_json().unwrap()["crm"]["auditLogs"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(rows.len(), 1);
    let changes = &rows[0]["changes"];
    assert_eq!(changes["city"]["old"], "Pune");
    assert_eq!(changes["city"]["new"], "Goa");
    assert_eq!(changes["research_notes"]["old"], serde_json::Value::Null);
    assert_eq!(changes["research_notes"]["new"], "Runs a 40-node fleet");
    assert_eq!(
        changes["closing_strategy"]["new"],
        "Lead with the managed tier"
    );
    assert_eq!(changes["infrastructure"]["old"], serde_json::Value::Null);
    assert_eq!(changes["infrastructure"]["new"], "aws");
    assert_eq!(changes["client_type"]["new"], "indian");
    assert_eq!(changes["partnership_interest"]["old"], "not_discussed");
    assert_eq!(changes["partnership_interest"]["new"], "yes");
}

#[tokio::test]
async fn task_completion_audits_both_tasks() {
    let env = setup_env().await;
    let manager = create_user(env.db.as_ref(), "manager@test", user::Role::SalesManager, "pw").await;
    let record = create_lead(env.db.as_ref(), "Chain Audit Co", "Pune", None).await;
    let planned = create_task(
        env.db.as_ref(),
        record.id,
        None,
        task::TaskType::Call,
        task::Status::Planned,
        Utc::now().into(),
    )
    .await;
    let current = actor(&manager);

    let complete = r#"
        mutation Complete($id: ID!, $input: CompleteTaskInput!) {
            crm {
                completeTask(id: $id, input: $input) {
                    task { id }
                    nextAction { id }
                }
            }
        }
    "#;
    let resp = exec_as(
        &env.schema,
        &current,
        complete,
        json!({
            "id": planned.id,
            "input": {
                "nextActionRequired": true,
                "nextAction": {
                    "taskType": "VISIT",
                    "scheduledAt": (Utc::now() + Duration::days(1)).to_rfc3339()
                }
            }
        }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let next_id = resp.data.into_json().unwrap()["crm"]["completeTask"]["nextAction"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = exec_as(
        &env.schema,
        &current,
        AUDIT_QUERY,
        json!({ "filter": { "entityKind": "TASK", "entityId": planned.id } }),
    )
    .await;
    let rows = resp.data.into_json().unwrap()["crm"]["auditLogs"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["action"], "STATUS_CHANGE");

    let resp = exec_as(
        &env.schema,
        &current,
        AUDIT_QUERY,
        json!({ "filter": { "entityKind": "TASK", "entityId": next_id } }),
    )
    .await;
    let rows = resp.data.into_json().unwrap()["crm"]["auditLogs"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["action"], "CREATE");
}

#[tokio::test]
async fn failed_validation_leaves_no_audit_row() {
    let env = setup_env().await;
    let manager = create_user(env.db.as_ref(), "manager@test", user::Role::SalesManager, "pw").await;
    let record = create_lead(env.db.as_ref(), "Rollback Co", "Pune", None).await;
    let current = actor(&manager);

    let update = r#"
        mutation Update($input: UpdateLeadInput!) {
            crm { updateLead(input: $input) { id } }
        }
    "#;
    let resp = exec_as(
        &env.schema,
        &current,
        update,
        json!({ "input": { "id": record.id, "status": "WON" } }),
    )
    .await;
    assert_eq!(resp.errors.len(), 1);

    let resp = exec_as(
        &env.schema,
        &current,
        AUDIT_QUERY,
        json!({ "filter": { "entityKind": "LEAD", "entityId": record.id } }),
    )
    .await;
    let rows = resp.data.into_json().unwrap()["crm"]["auditLogs"]
        .as_array()
        .unwrap()
        .clone();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn audit_log_is_manager_and_admin_only() {
    let env = setup_env().await;
    let exec = create_user(env.db.as_ref(), "exec@test", user::Role::SalesExecutive, "pw").await;

    let resp = exec_as(&env.schema, &actor(&exec), AUDIT_QUERY, json!({})).await;
    assert_eq!(resp.errors.len(), 1);
    assert!(resp.errors[0].message.contains("Insufficient"));

    let resp = exec_anonymous(&env.schema, AUDIT_QUERY, json!({})).await;
    assert_eq!(resp.errors.len(), 1);
    assert!(resp.errors[0].message.contains("Login required"));
}
