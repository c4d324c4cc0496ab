pub mod local;
pub mod staging;
