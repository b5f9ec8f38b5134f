mod common;

use common::{actor, create_user, exec_anonymous, exec_as, setup_env};
use entity::user;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serde_json::json;

const LOGIN: &str = r#"
    mutation Login($email: String!, $password: String!) {
        crm { login(email: $email, password: $password) { ok token error user { email role } } }
    }
"#;

#[tokio::test]
async fn login_issues_token_for_valid_credentials() {
    let env = setup_env().await;
    create_user(env.db.as_ref(), "priya@test", user::Role::SalesExecutive, "s3cret").await;

    let resp = exec_anonymous(
        &env.schema,
        LOGIN,
        json!({ "email": "Priya@Test ", "password": "s3cret" }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let payload = resp.data.into_json().unwrap()["crm"]["login"].clone();
    assert_eq!(payload["ok"], true);
    assert!(payload["token"].is_string());
    assert_eq!(payload["user"]["email"], "priya@test");
    assert_eq!(payload["user"]["role"], "SALES_EXECUTIVE");
}

#[tokio::test]
async fn login_rejects_bad_password_and_unknown_user() {
    let env = setup_env().await;
    create_user(env.db.as_ref(), "priya@test", user::Role::SalesExecutive, "s3cret").await;

    let resp = exec_anonymous(
        &env.schema,
        LOGIN,
        json!({ "email": "priya@test", "password": "wrong" }),
    )
    .await;
    let payload = resp.data.into_json().unwrap()["crm"]["login"].clone();
    assert_eq!(payload["ok"], false);
    assert!(payload["token"].is_null());
    assert_eq!(payload["error"], "Invalid credentials");

    let resp = exec_anonymous(
        &env.schema,
        LOGIN,
        json!({ "email": "nobody@test", "password": "whatever" }),
    )
    .await;
    let payload = resp.data.into_json().unwrap()["crm"]["login"].clone();
    assert_eq!(payload["ok"], false);
}

#[tokio::test]
async fn login_rejects_deactivated_accounts() {
    let env = setup_env().await;
    let record = create_user(env.db.as_ref(), "gone@test", user::Role::SalesExecutive, "pw").await;
    let mut active: user::ActiveModel = record.into();
    active.is_active = Set(false);
    active.update(env.db.as_ref()).await.unwrap();

    let resp = exec_anonymous(
        &env.schema,
        LOGIN,
        json!({ "email": "gone@test", "password": "pw" }),
    )
    .await;
    let payload = resp.data.into_json().unwrap()["crm"]["login"].clone();
    assert_eq!(payload["ok"], false);
    assert_eq!(payload["error"], "Account disabled");
}

#[tokio::test]
async fn me_reflects_the_authenticated_user() {
    let env = setup_env().await;
    let record = create_user(env.db.as_ref(), "admin@test", user::Role::Admin, "pw").await;

    let me = r#"
        query { crm { me { email role isActive } } }
    "#;
    let resp = exec_as(&env.schema, &actor(&record), me, json!({})).await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let data = resp.data.into_json().unwrap()["crm"]["me"].clone();
    assert_eq!(data["email"], "admin@test");
    assert_eq!(data["role"], "ADMIN");
    assert_eq!(data["isActive"], true);

    let resp = exec_anonymous(&env.schema, me, json!({})).await;
    assert_eq!(resp.errors.len(), 1);
    assert!(resp.errors[0].message.contains("Login required"));
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let env = setup_env().await;
    let admin = create_user(env.db.as_ref(), "admin@test", user::Role::Admin, "pw").await;
    let manager = create_user(env.db.as_ref(), "manager@test", user::Role::SalesManager, "pw").await;

    let create = r#"
        mutation Create($input: NewUserInput!) {
            crm { createUser(input: $input) { id email role isActive } }
        }
    "#;
    let vars = json!({
        "input": {
            "email": "newexec@test",
            "displayName": "New Exec",
            "password": "welcome1",
            "role": "SALES_EXECUTIVE"
        }
    });
    let resp = exec_as(&env.schema, &actor(&manager), create, vars.clone()).await;
    assert_eq!(resp.errors.len(), 1);
    assert!(resp.errors[0].message.contains("Insufficient"));

    let resp = exec_as(&env.schema, &actor(&admin), create, vars).await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let created = resp.data.into_json().unwrap()["crm"]["createUser"].clone();
    assert_eq!(created["email"], "newexec@test");
    assert_eq!(created["role"], "SALES_EXECUTIVE");

    // The fresh credentials work immediately.
    let resp = exec_anonymous(
        &env.schema,
        LOGIN,
        json!({ "email": "newexec@test", "password": "welcome1" }),
    )
    .await;
    assert_eq!(
        resp.data.into_json().unwrap()["crm"]["login"]["ok"],
        true
    );

    let update = r#"
        mutation Update($input: UpdateUserInput!) {
            crm { updateUser(input: $input) { id isActive role } }
        }
    "#;
    let resp = exec_as(
        &env.schema,
        &actor(&admin),
        update,
        json!({ "input": { "id": created["id"], "isActive": false, "role": "SALES_MANAGER" } }),
    )
    .await;
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    let updated = resp.data.into_json().unwrap()["crm"]["updateUser"].clone();
    assert_eq!(updated["isActive"], false);
    assert_eq!(updated["role"], "SALES_MANAGER");
}
