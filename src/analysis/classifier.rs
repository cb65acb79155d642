use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::pose::{KeypointName, Pose};

/// 姿勢の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostureType {
    Sitting,
    Standing,
    /// 速度履歴を持たない単一フレーム分類器からは出力されない。
    /// 呼び出し側が速度ヒューリスティクスで上書きする想定。
    Exercising,
    Unknown,
}

/// 関節ジオメトリによるヒューリスティック姿勢分類器（ML不使用）
pub struct PostureClassifier {
    confidence_threshold: f32,
}

impl PostureClassifier {
    /// 腰と膝の正規化Y座標差がこれ未満なら座位とみなす
    const SITTING_HIP_KNEE_GAP: f32 = 0.2;

    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.confidence_threshold)
    }

    /// 現フレームの姿勢を分類
    ///
    /// 腰・膝・首のいずれかが見えていなければ Unknown。
    pub fn classify(&self, pose: &Pose) -> PostureType {
        use KeypointName::*;

        let required = [LeftHip, RightHip, LeftKnee, RightKnee, Neck];
        if !required
            .iter()
            .all(|&name| pose.get(name).is_valid(self.confidence_threshold))
        {
            return PostureType::Unknown;
        }

        let avg_hip_y = (pose.get(LeftHip).y + pose.get(RightHip).y) / 2.0;
        let avg_knee_y = (pose.get(LeftKnee).y + pose.get(RightKnee).y) / 2.0;

        if (avg_hip_y - avg_knee_y).abs() < Self::SITTING_HIP_KNEE_GAP {
            PostureType::Sitting
        } else {
            PostureType::Standing
        }
    }
}
