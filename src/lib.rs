pub mod assets;
pub mod config;
pub mod play;
pub mod quiz;
pub mod sink;
