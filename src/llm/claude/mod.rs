mod client;
mod error;
pub mod models;
pub mod stream;

pub use client::*;
pub use error::*;
