//! Post-processing of free-form model output.

pub mod caption;
pub mod normalize;
pub mod script;

pub use caption::format_caption;
pub use normalize::{extract_hashtags, normalize_key, strip_decorative, strip_hashtags};
pub use script::structure_script;
