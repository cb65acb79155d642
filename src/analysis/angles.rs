use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::pose::{KeypointName, Pose};

/// 骨格角度（度、0〜180）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleMetrics {
    pub neck: f32,
    pub shoulder: f32,
    pub spine: f32,
    pub hip: f32,
    pub knee: f32,
}

/// 各角度が計算可能だったかを示すマスク
///
/// 計算不能な角度は0度にデフォルトされるため、
/// 「本当に0度」と「関節が見えず計算できなかった」を呼び出し側が
/// 区別できるようにする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AngleValidity {
    pub neck: bool,
    pub shoulder: bool,
    pub spine: bool,
    pub hip: bool,
    pub knee: bool,
}

impl AngleValidity {
    pub fn all(&self) -> bool {
        self.neck && self.shoulder && self.spine && self.hip && self.knee
    }
}

/// 脊椎角度の重力基準点: 腰中点の真下へのオフセット（正規化座標、画像下方向が正）
const GRAVITY_REFERENCE_OFFSET: f32 = 0.2;

/// 3点 (p1, p2, p3) が p2 でなす平面角（度）
///
/// `|atan2(p3-p2) - atan2(p1-p2)|` を度に変換し、180度超は 360-v に折り返す。
/// 結果は常に [0, 180]。angle(p1,p2,p3) == angle(p3,p2,p1) が成り立つ。
pub fn joint_angle(p1: (f32, f32), p2: (f32, f32), p3: (f32, f32)) -> f32 {
    let a1 = f32::atan2(p3.1 - p2.1, p3.0 - p2.0);
    let a2 = f32::atan2(p1.1 - p2.1, p1.0 - p2.0);
    let degrees = (a1 - a2).abs().to_degrees();
    if degrees > 180.0 {
        360.0 - degrees
    } else {
        degrees
    }
}

/// Pose から5つの骨格角度を導出する
///
/// 各角度は独立にベストエフォートで計算する。必要な関節の信頼度が
/// 閾値未満なら、その角度だけ0にデフォルトして validity を下ろす。
/// フレーム全体は失敗させない。
pub struct AngleCalculator {
    confidence_threshold: f32,
}

impl AngleCalculator {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.confidence_threshold)
    }

    pub fn compute(&self, pose: &Pose) -> (AngleMetrics, AngleValidity) {
        use KeypointName::*;

        let mut metrics = AngleMetrics::default();
        let mut validity = AngleValidity::default();

        // 首: (頭頂, 首, 肩中点)
        if self.valid(pose, &[HeadTop, Neck, LeftShoulder, RightShoulder]) {
            let shoulder_mid = pose.midpoint(LeftShoulder, RightShoulder);
            metrics.neck = joint_angle(
                pose.get(HeadTop).position(),
                pose.get(Neck).position(),
                shoulder_mid,
            );
            validity.neck = true;
        }

        // 肩: (首, 左肩, 左肘)
        if self.valid(pose, &[Neck, LeftShoulder, LeftElbow]) {
            metrics.shoulder = joint_angle(
                pose.get(Neck).position(),
                pose.get(LeftShoulder).position(),
                pose.get(LeftElbow).position(),
            );
            validity.shoulder = true;
        }

        // 脊椎: (首, 腰中点, 腰中点の真下の合成点)
        // 合成点が重力方向の基準になる
        if self.valid(pose, &[Neck, LeftHip, RightHip]) {
            let hip_mid = pose.midpoint(LeftHip, RightHip);
            let below = (hip_mid.0, hip_mid.1 + GRAVITY_REFERENCE_OFFSET);
            metrics.spine = joint_angle(pose.get(Neck).position(), hip_mid, below);
            validity.spine = true;
        }

        // 腰: (左肩, 左腰, 左膝)
        if self.valid(pose, &[LeftShoulder, LeftHip, LeftKnee]) {
            metrics.hip = joint_angle(
                pose.get(LeftShoulder).position(),
                pose.get(LeftHip).position(),
                pose.get(LeftKnee).position(),
            );
            validity.hip = true;
        }

        // 膝: (左腰, 左膝, 左足首)
        if self.valid(pose, &[LeftHip, LeftKnee, LeftAnkle]) {
            metrics.knee = joint_angle(
                pose.get(LeftHip).position(),
                pose.get(LeftKnee).position(),
                pose.get(LeftAnkle).position(),
            );
            validity.knee = true;
        }

        (metrics, validity)
    }

    fn valid(&self, pose: &Pose, names: &[KeypointName]) -> bool {
        names
            .iter()
            .all(|&name| pose.get(name).is_valid(self.confidence_threshold))
    }
}
