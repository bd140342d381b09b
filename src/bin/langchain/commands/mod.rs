pub mod examples;
pub mod init;
pub mod validate;
