//! Persistence layer for autoplan: configuration, connection pool,
//! row models and query functions over PostgreSQL.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
