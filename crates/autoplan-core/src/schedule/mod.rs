//! Calendar arithmetic for auto-planning: the `YYYY-MM` month type and the
//! slot allocator.

pub mod month;
pub mod slots;

pub use month::{Month, MonthParseError};
pub use slots::{Availability, allocate_slots};
