pub mod classifier;
pub mod controller;
