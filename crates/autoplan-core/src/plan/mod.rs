//! Auto-plan generation and the per-item operations built on the same
//! prompt and cleaning pipeline.

pub mod error;
pub mod guard;
pub mod items;
pub mod prompt;
pub mod response;
pub mod service;
pub mod strategy;

pub use error::AutoPlanError;
pub use items::{ManualItem, create_manual_item, regenerate_item};
pub use response::ResponseParseError;
pub use service::{
    AutoPlanOutcome, AutoPlanRequest, NO_FREE_DATES_MESSAGE, NO_VALID_ITEMS_MESSAGE,
    generate_auto_plan,
};
pub use strategy::{DEFAULT_STRATEGY, STRATEGIES, ScriptStrategy};
