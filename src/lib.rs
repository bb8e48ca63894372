//! CAE job diary library.
//!
//! Tracks cluster jobs from submission to completion by reading the files the
//! scheduler leaves on the shared filesystem, and keeps one record per job in
//! the database.

pub mod caefiles;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod migration;
pub mod models;
pub mod services;
pub mod store;
