//! Auto-plan domain logic: text clean-up, slot allocation, session tokens,
//! the language model client and the monthly generation workflow.

pub mod llm;
pub mod plan;
pub mod schedule;
pub mod session;
pub mod text;
