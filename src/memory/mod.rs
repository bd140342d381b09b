mod buffer;
mod error;
mod file;
mod simple;
mod token_buffer;
mod traits;
mod window_buffer;

#[cfg(feature = "mongodb")]
mod mongo;
#[cfg(feature = "redis")]
mod redis;
#[cfg(feature = "sqlite-persistence")]
mod sqlite;

pub use buffer::*;
pub use error::*;
pub use file::*;
pub use simple::*;
pub use token_buffer::*;
pub use traits::*;
pub use window_buffer::*;

#[cfg(feature = "mongodb")]
pub use mongo::*;
#[cfg(feature = "redis")]
pub use self::redis::*;
#[cfg(feature = "sqlite-persistence")]
pub use sqlite::*;
