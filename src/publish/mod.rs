pub mod http;
pub mod publisher;
