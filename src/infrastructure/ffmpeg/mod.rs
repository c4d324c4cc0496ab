pub mod pipeline;
pub mod probe;
