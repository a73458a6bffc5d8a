pub mod config;
pub mod raw;
pub mod result;
pub mod trade;
