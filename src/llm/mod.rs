#![allow(ambiguous_glob_reexports)]

pub mod openai;
pub use openai::*;

pub mod claude;
pub use claude::*;
