pub use sea_orm_migration::prelude::*;

mod m20250812_000001_users;
mod m20250812_000002_crm_core;
mod m20250812_000003_audit_activity;

pub struct Migrator;
#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250812_000001_users::Migration),
            Box::new(m20250812_000002_crm_core::Migration),
            Box::new(m20250812_000003_audit_activity::Migration),
        ]
    }
}
