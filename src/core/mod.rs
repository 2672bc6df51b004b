pub mod search_pattern;
pub mod strong_types;

pub use search_pattern::SearchPattern;
pub use strong_types::{Id, ParseIdError};
