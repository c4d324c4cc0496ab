pub mod ffmpeg;
pub mod storage;
