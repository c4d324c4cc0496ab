pub mod media;
pub mod shader;
