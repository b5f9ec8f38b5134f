pub mod activity_log;
pub mod audit_log;
pub mod contact;
pub mod lead;
pub mod task;
pub mod user;
pub mod visit;
