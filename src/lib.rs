pub mod cli;
pub mod config;
pub mod flags;
pub mod model;
pub mod storage;
pub mod store;
