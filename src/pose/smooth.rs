use crate::config::SmoothConfig;

use super::keypoint::Pose;

/// EMAベースのキーポイント平滑化フィルタ
///
/// 座標: キーポイントごとの成分EMA
/// 信頼度: 平滑化しない（現フレームの値をそのまま使う。
/// 古い信頼度を混ぜると直前に見失った関節を隠してしまうため）
pub struct PoseSmoother {
    alpha: f32,
    prev: Option<Pose>,
}

impl PoseSmoother {
    pub const DEFAULT_ALPHA: f32 = 0.7;

    pub fn new(alpha: f32) -> Self {
        Self { alpha, prev: None }
    }

    pub fn from_config(config: &SmoothConfig) -> Self {
        Self::new(config.alpha)
    }

    /// 1フレーム分の姿勢を平滑化
    ///
    /// 前回の姿勢がなければ（初回、またはreset直後）そのまま通す。
    pub fn apply(&mut self, pose: Pose) -> Pose {
        let prev = match &self.prev {
            Some(prev) => prev.clone(),
            None => {
                self.prev = Some(pose.clone());
                return pose;
            }
        };

        let a = self.alpha;
        let mut smoothed = pose;
        for (kp, prev_kp) in smoothed.keypoints.iter_mut().zip(prev.keypoints.iter()) {
            kp.x = a * kp.x + (1.0 - a) * prev_kp.x;
            kp.y = a * kp.y + (1.0 - a) * prev_kp.y;
            // score は現フレームの値をそのまま保持
        }

        self.prev = Some(smoothed.clone());
        smoothed
    }

    /// トラッキング再開時（キャリブレーション開始、カメラ再取得等）に呼ぶ
    pub fn reset(&mut self) {
        self.prev = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, KeypointName};

    fn make_pose(x: f32, y: f32, score: f32) -> Pose {
        Pose::new([Keypoint::new(x, y, score); KeypointName::COUNT])
    }

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_first_frame_passthrough() {
        let mut smoother = PoseSmoother::new(0.5);
        let pose = make_pose(0.3, 0.6, 0.9);
        let result = smoother.apply(pose.clone());
        assert_eq!(result.keypoints, pose.keypoints);
    }

    #[test]
    fn test_alpha_one_returns_current() {
        let mut smoother = PoseSmoother::new(1.0);
        smoother.apply(make_pose(0.0, 0.0, 0.9));
        let current = make_pose(0.4, 0.8, 0.9);
        let result = smoother.apply(current.clone());
        for (kp, cur) in result.keypoints.iter().zip(current.keypoints.iter()) {
            assert!(approx_eq(kp.x, cur.x, 1e-6));
            assert!(approx_eq(kp.y, cur.y, 1e-6));
        }
    }

    #[test]
    fn test_blend_weights() {
        let mut smoother = PoseSmoother::new(0.7);
        smoother.apply(make_pose(0.0, 0.0, 0.9));
        let result = smoother.apply(make_pose(1.0, 1.0, 0.9));
        // 0.7 * 1.0 + 0.3 * 0.0 = 0.7
        for kp in &result.keypoints {
            assert!(approx_eq(kp.x, 0.7, 1e-6));
            assert!(approx_eq(kp.y, 0.7, 1e-6));
        }
    }

    #[test]
    fn test_score_not_smoothed() {
        let mut smoother = PoseSmoother::new(0.5);
        smoother.apply(make_pose(0.0, 0.0, 0.9));
        let result = smoother.apply(make_pose(1.0, 1.0, 0.1));
        // 信頼度はEMAせず現フレームの値
        for kp in &result.keypoints {
            assert!(approx_eq(kp.score, 0.1, 1e-6));
        }
    }

    #[test]
    fn test_reset() {
        let mut smoother = PoseSmoother::new(0.1);
        smoother.apply(make_pose(0.0, 0.0, 0.9));
        smoother.reset();
        // reset後は初回扱いでそのまま通る
        let pose = make_pose(0.9, 0.9, 0.9);
        let result = smoother.apply(pose.clone());
        assert_eq!(result.keypoints, pose.keypoints);
    }

    #[test]
    fn test_smoothed_output_becomes_history() {
        let mut smoother = PoseSmoother::new(0.5);
        smoother.apply(make_pose(0.0, 0.0, 0.9));
        smoother.apply(make_pose(1.0, 1.0, 0.9)); // -> 0.5
        let result = smoother.apply(make_pose(1.0, 1.0, 0.9));
        // 0.5 * 1.0 + 0.5 * 0.5 = 0.75
        for kp in &result.keypoints {
            assert!(approx_eq(kp.x, 0.75, 1e-6));
        }
    }
}
