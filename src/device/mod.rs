pub mod central;
pub mod constants;
#[cfg(test)]
pub mod mock;
pub mod sample;
pub mod session;
pub mod types;
