pub mod asset;
pub mod download;
pub mod error;
pub mod http;
pub mod install;
pub mod platform;
pub mod runtime;
pub mod source;
pub mod verify;
