//! Query functions, one module per table.

pub mod auto_plan_runs;
pub mod calendar_items;
pub mod profiles;
pub mod users;
