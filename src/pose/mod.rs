pub mod decoder;
pub mod keypoint;
pub mod smooth;

pub use decoder::{DecodeError, HeatmapDecoder};
pub use keypoint::{Keypoint, KeypointName, Pose};
pub use smooth::PoseSmoother;
