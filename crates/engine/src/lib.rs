// redline-engine: streamed AI suggestions applied as reviewable annotations.

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod hover;
pub mod session;
pub mod stream;
pub mod suggest;
