mod builder;
mod graphql;
mod store;

pub use builder::*;
pub use store::*;
