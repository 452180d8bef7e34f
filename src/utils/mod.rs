pub mod buffer;
pub mod music;
pub mod peak;
