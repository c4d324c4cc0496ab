pub mod job_reaper;
pub mod shader_runner;
