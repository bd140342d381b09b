mod builder;
mod store;

pub use builder::*;
pub use store::*;
