mod common;

use chrono::{Duration, Utc};
use common::{actor, create_lead, create_task, create_user, exec_as, setup_env};
use entity::{task, user};
use serde_json::json;

#[tokio::test]
async fn complete_task_spawns_next_action() {
    let env = setup_env().await;
    let exec = create_user(env.db.as_ref(), "exec@test", user::Role::SalesExecutive, "pw").await;
    let record = create_lead(env.db.as_ref(), "Chain Co", "Pune", Some(exec.id)).await;
    let planned = create_task(
        env.db.as_ref(),
        record.id,
        Some(exec.id),
        task::TaskType::Call,
        task::Status::Planned,
        (Utc::now() - Duration::hours(1)).into(),
    )
    .await;
    let current = actor(&exec);

    let complete = r#"
        mutation Complete($id: ID!, $input: CompleteTaskInput!) {
            crm {
                completeTask(id: $id, input: $input) {
                    task { id status outcomeNotes nextActionRequired }
                    nextAction { id status taskType leadId assignedTo }
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
                "outcomeNotes": "Spoke to CTO, wants demo",
                "nextActionRequired": true,
                "nextAction": {
                    "taskType": "ONLINE_MEETING",
                    "scheduledAt": (Utc::now() + Duration::days(2)).to_rfc3339()
                }
            }
        }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap();
    let payload = &data["crm"]["completeTask"];
    assert_eq!(payload["task"]["status"], "COMPLETED");
    assert_eq!(payload["task"]["outcomeNotes"], "Spoke to CTO, wants demo");
    let next = &payload["nextAction"];
    assert_eq!(next["status"], "PLANNED");
    assert_eq!(next["taskType"], "ONLINE_MEETING");
    assert_eq!(next["leadId"], record.id.to_string());
    assert_eq!(next["assignedTo"], exec.id.to_string());
}

#[tokio::test]
async fn completing_a_non_planned_task_fails() {
    let env = setup_env().await;
    let exec = create_user(env.db.as_ref(), "exec@test", user::Role::SalesExecutive, "pw").await;
    let record = create_lead(env.db.as_ref(), "Twice Co", "Pune", Some(exec.id)).await;
    let planned = create_task(
        env.db.as_ref(),
        record.id,
        Some(exec.id),
        task::TaskType::Call,
        task::Status::Planned,
        Utc::now().into(),
    )
    .await;
    let current = actor(&exec);

    let complete = r#"
        mutation Complete($id: ID!, $input: CompleteTaskInput!) {
            crm { completeTask(id: $id, input: $input) { task { status } } }
        }
    "#;
    let vars = json!({ "id": planned.id, "input": { "nextActionRequired": false } });
    let resp = exec_as(&env.schema, &current, complete, vars.clone()).await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);

    let resp = exec_as(&env.schema, &current, complete, vars).await;
    assert_eq!(resp.errors.len(), 1);
    assert!(resp.errors[0].message.contains("Only planned tasks"));
}

#[tokio::test]
async fn miss_task_is_terminal() {
    let env = setup_env().await;
    let exec = create_user(env.db.as_ref(), "exec@test", user::Role::SalesExecutive, "pw").await;
    let record = create_lead(env.db.as_ref(), "Missed Co", "Pune", Some(exec.id)).await;
    let planned = create_task(
        env.db.as_ref(),
        record.id,
        Some(exec.id),
        task::TaskType::Visit,
        task::Status::Planned,
        (Utc::now() - Duration::days(1)).into(),
    )
    .await;
    let current = actor(&exec);

    let miss = r#"
        mutation Miss($id: ID!) { crm { missTask(id: $id) { status } } }
    "#;
    let resp = exec_as(&env.schema, &current, miss, json!({ "id": planned.id })).await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    assert_eq!(
        resp.data.into_json().unwrap()["crm"]["missTask"]["status"],
        "MISSED"
    );

    let complete = r#"
        mutation Complete($id: ID!, $input: CompleteTaskInput!) {
            crm { completeTask(id: $id, input: $input) { task { status } } }
        }
    "#;
    let resp = exec_as(
        &env.schema,
        &current,
        complete,
        json!({ "id": planned.id, "input": { "nextActionRequired": false } }),
    )
    .await;
    assert_eq!(resp.errors.len(), 1);
    assert!(resp.errors[0].message.contains("Only planned tasks"));
}

#[tokio::test]
async fn visit_payload_is_rejected_for_non_visit_tasks() {
    let env = setup_env().await;
    let exec = create_user(env.db.as_ref(), "exec@test", user::Role::SalesExecutive, "pw").await;
    let record = create_lead(env.db.as_ref(), "Visit Co", "Pune", Some(exec.id)).await;
    let current = actor(&exec);

    let create = r#"
        mutation Create($input: NewTaskInput!) {
            crm { createTask(input: $input) { id taskType } }
        }
    "#;
    let resp = exec_as(
        &env.schema,
        &current,
        create,
        json!({
            "input": {
                "taskType": "CALL",
                "leadId": record.id,
                "scheduledAt": (Utc::now() + Duration::days(1)).to_rfc3339(),
                "visit": { "personSpokenTo": "Someone" }
            }
        }),
    )
    .await;
    assert_eq!(resp.errors.len(), 1);
    assert!(resp.errors[0].message.contains("visit-type"));

    let resp = exec_as(
        &env.schema,
        &current,
        create,
        json!({
            "input": {
                "taskType": "VISIT",
                "leadId": record.id,
                "scheduledAt": (Utc::now() + Duration::days(1)).to_rfc3339(),
                "visit": {
                    "personSpokenTo": "Suresh",
                    "personRole": "CTO",
                    "interestLevel": "HIGH",
                    "demoVideoShared": true
                }
            }
        }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);

    let visits = r#"
        query Visits($leadId: ID!) {
            crm { visits(leadId: $leadId) { personSpokenTo interestLevel demoVideoShared } }
        }
    "#;
    let resp = exec_as(&env.schema, &current, visits, json!({ "leadId": record.id })).await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let rows = resp.data.into_json().unwrap()["crm"]["visits"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["personSpokenTo"], "Suresh");
    assert_eq!(rows[0]["interestLevel"], "HIGH");
    assert_eq!(rows[0]["demoVideoShared"], true);
}

#[tokio::test]
async fn today_and_overdue_filters() {
    let env = setup_env().await;
    let exec = create_user(env.db.as_ref(), "exec@test", user::Role::SalesExecutive, "pw").await;
    let record = create_lead(env.db.as_ref(), "Window Co", "Pune", Some(exec.id)).await;
    let current = actor(&exec);

    let yesterday = create_task(
        env.db.as_ref(),
        record.id,
        Some(exec.id),
        task::TaskType::Call,
        task::Status::Planned,
        (Utc::now() - Duration::days(1)).into(),
    )
    .await;
    let today_task = create_task(
        env.db.as_ref(),
        record.id,
        Some(exec.id),
        task::TaskType::Call,
        task::Status::Planned,
        Utc::now().into(),
    )
    .await;
    create_task(
        env.db.as_ref(),
        record.id,
        Some(exec.id),
        task::TaskType::Call,
        task::Status::Planned,
        (Utc::now() + Duration::days(2)).into(),
    )
    .await;

    let query = r#"
        query Tasks($filter: TaskFilter) {
            crm { tasks(filter: $filter) { id } }
        }
    "#;
    let day = Utc::now().date_naive().to_string();
    let resp = exec_as(
        &env.schema,
        &current,
        query,
        json!({ "filter": { "today": day } }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let rows = resp.data.into_json().unwrap()["crm"]["tasks"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], today_task.id.to_string());

    let resp = exec_as(
        &env.schema,
        &current,
        query,
        json!({ "filter": { "overdue": true } }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let rows = resp.data.into_json().unwrap()["crm"]["tasks"]
        .as_array()
        .unwrap()
        .clone();
    // Both past-scheduled planned tasks are overdue; the future one is not.
    let ids: Vec<String> = rows
        .iter()
        .map(|row| row["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&yesterday.id.to_string()));
    assert!(ids.contains(&today_task.id.to_string()));

    let resp = exec_as(
        &env.schema,
        &current,
        query,
        json!({ "filter": { "today": day, "overdue": true } }),
    )
    .await;
    assert_eq!(resp.errors.len(), 1);
    assert!(resp.errors[0].message.contains("mutually exclusive"));
}

#[tokio::test]
async fn task_calendar_orders_within_range() {
    let env = setup_env().await;
    let manager = create_user(env.db.as_ref(), "manager@test", user::Role::SalesManager, "pw").await;
    let record = create_lead(env.db.as_ref(), "Calendar Co", "Pune", None).await;
    let current = actor(&manager);

    let near = create_task(
        env.db.as_ref(),
        record.id,
        None,
        task::TaskType::Call,
        task::Status::Planned,
        (Utc::now() + Duration::days(1)).into(),
    )
    .await;
    let far = create_task(
        env.db.as_ref(),
        record.id,
        None,
        task::TaskType::Visit,
        task::Status::Planned,
        (Utc::now() + Duration::days(4)).into(),
    )
    .await;
    // Outside the window.
    create_task(
        env.db.as_ref(),
        record.id,
        None,
        task::TaskType::Call,
        task::Status::Planned,
        (Utc::now() + Duration::days(30)).into(),
    )
    .await;

    let query = r#"
        query Calendar($range: DateRange!) {
            crm { taskCalendar(range: $range) { id } }
        }
    "#;
    let from = Utc::now().date_naive().to_string();
    let to = (Utc::now() + Duration::days(7)).date_naive().to_string();
    let resp = exec_as(
        &env.schema,
        &current,
        query,
        json!({ "range": { "from": from, "to": to } }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let rows = resp.data.into_json().unwrap()["crm"]["taskCalendar"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], near.id.to_string());
    assert_eq!(rows[1]["id"], far.id.to_string());
}
