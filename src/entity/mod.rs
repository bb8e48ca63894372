//! SeaORM entity definitions for PostgreSQL database.

pub mod job;
pub mod job_base_run;
pub mod user;
