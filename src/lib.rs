pub mod analysis;
pub mod calibration;
pub mod config;
pub mod pipeline;
pub mod pose;
