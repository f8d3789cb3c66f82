pub mod builder;
pub mod normalize;

pub use builder::{build_query, parse_expression, Expression, Field};
pub use normalize::{normalize, NameLookup};
