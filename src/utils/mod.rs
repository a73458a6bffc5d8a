pub mod export;
pub mod frame;
