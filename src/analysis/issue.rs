use serde::{Deserialize, Serialize};

use crate::calibration::UserBaseline;
use crate::config::AnalysisConfig;
use crate::pose::{KeypointName, Pose};

use super::angles::AngleMetrics;
use super::classifier::PostureType;
use super::score::default_optimal_angles;

/// 姿勢問題の深刻度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    /// ソート用順位（severeが先頭）
    fn rank(self) -> u8 {
        match self {
            Self::Severe => 0,
            Self::Moderate => 1,
            Self::Mild => 2,
        }
    }
}

/// 姿勢問題の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueType {
    ForwardHead,
    RoundedShoulders,
    Slouching,
    UnevenShoulders,
    UnevenHips,
    /// 検出ルール未実装（予約）
    ExcessiveLordosis,
    /// 検出ルール未実装（予約）
    ExcessiveKyphosis,
}

impl IssueType {
    /// 表示/アラート用の固定優先順位（小さいほど優先）
    fn priority(self) -> u8 {
        match self {
            Self::Slouching => 0,
            Self::ForwardHead => 1,
            Self::RoundedShoulders => 2,
            Self::UnevenShoulders => 3,
            Self::UnevenHips => 4,
            Self::ExcessiveLordosis => 5,
            Self::ExcessiveKyphosis => 6,
        }
    }

    pub fn body_part(self) -> &'static str {
        match self {
            Self::ForwardHead => "首",
            Self::RoundedShoulders | Self::UnevenShoulders => "肩",
            Self::Slouching | Self::ExcessiveKyphosis => "背中",
            Self::UnevenHips | Self::ExcessiveLordosis => "腰",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ForwardHead => "頭が前に出ています",
            Self::RoundedShoulders => "肩が内側に巻いています",
            Self::Slouching => "背中が丸まっています",
            Self::UnevenShoulders => "左右の肩の高さがずれています",
            Self::UnevenHips => "左右の腰の高さがずれています",
            Self::ExcessiveLordosis => "腰が反りすぎています",
            Self::ExcessiveKyphosis => "背中が曲がりすぎています",
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            Self::ForwardHead => "顎を引いて、頭を肩の真上に戻しましょう",
            Self::RoundedShoulders => "肩甲骨を軽く寄せて、胸を開きましょう",
            Self::Slouching => "骨盤を立てて、背筋を伸ばしましょう",
            Self::UnevenShoulders => "両肩の力を抜いて、高さを揃えましょう",
            Self::UnevenHips => "体重を左右均等にかけ直しましょう",
            Self::ExcessiveLordosis => "腹筋に軽く力を入れて骨盤を中立に戻しましょう",
            Self::ExcessiveKyphosis => "胸を張って上体を起こしましょう",
        }
    }
}

/// 検出された姿勢問題（フレームごとに新規生成、フレーム間の重複排除はしない）
#[derive(Debug, Clone)]
pub struct PostureIssue {
    /// 検出イベントごとに新しく振られるID
    pub id: u64,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub body_part: &'static str,
    pub description: &'static str,
    pub recommendation: &'static str,
    /// 測定値（角度ルールは度、キーポイントルールは正規化オフセット）
    pub angle: Option<f32>,
    /// 超過判定に使った閾値
    pub threshold: Option<f32>,
}

/// 角度ルールの発火閾値と深刻度バンド（度、すべて厳密比較 `>`）
const ANGLE_TRIGGER: f32 = 10.0;
const ANGLE_MODERATE: f32 = 15.0;
const ANGLE_SEVERE: f32 = 25.0;

/// キーポイントルールの発火閾値と深刻度バンド（正規化座標）
const OFFSET_TRIGGER: f32 = 0.05;
const OFFSET_MODERATE: f32 = 0.07;
const OFFSET_SEVERE: f32 = 0.1;

/// ルールベースの姿勢問題検出器
///
/// 各ルールは独立で、1フレームにつき最大1件のPostureIssueを生成する。
pub struct IssueDetector {
    confidence_threshold: f32,
    next_id: u64,
}

impl IssueDetector {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            next_id: 0,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.confidence_threshold)
    }

    /// 現フレームの姿勢問題を検出する
    ///
    /// `threshold` (0〜1) は結果のフィルタ: severeは常に通過、
    /// moderateは threshold <= 0.5 で通過、mildは threshold <= 0.3 で通過。
    /// 重なり合う段階フィルタは元実装の観測挙動をそのまま再現している。
    pub fn detect(
        &mut self,
        angles: &AngleMetrics,
        pose: &Pose,
        posture_type: PostureType,
        baseline: Option<&UserBaseline>,
        threshold: f32,
    ) -> Vec<PostureIssue> {
        let optimal = match baseline {
            Some(b) => b.optimal_angles,
            None => default_optimal_angles(posture_type),
        };

        let mut issues = Vec::new();

        // 頭部前方偏位: 首角度のベースラインからの偏差
        let neck_deviation = (angles.neck - optimal.neck).abs();
        if neck_deviation > ANGLE_TRIGGER {
            issues.push(self.make_issue(
                IssueType::ForwardHead,
                angle_severity(neck_deviation),
                Some(angles.neck),
                Some(ANGLE_TRIGGER),
            ));
        }

        // 巻き肩: 肩中点と首のX座標のずれ（角度ではなく生キーポイントを使う）
        if self.joints_valid(pose, &[
            KeypointName::Neck,
            KeypointName::LeftShoulder,
            KeypointName::RightShoulder,
        ]) {
            let shoulder_mid_x =
                pose.midpoint(KeypointName::LeftShoulder, KeypointName::RightShoulder).0;
            let offset = (shoulder_mid_x - pose.get(KeypointName::Neck).x).abs();
            if offset > OFFSET_TRIGGER {
                issues.push(self.make_issue(
                    IssueType::RoundedShoulders,
                    offset_severity(offset),
                    Some(offset),
                    Some(OFFSET_TRIGGER),
                ));
            }
        }

        // 猫背: 脊椎角度のベースラインからの偏差
        let spine_deviation = (angles.spine - optimal.spine).abs();
        if spine_deviation > ANGLE_TRIGGER {
            issues.push(self.make_issue(
                IssueType::Slouching,
                angle_severity(spine_deviation),
                Some(angles.spine),
                Some(ANGLE_TRIGGER),
            ));
        }

        // 腰の左右差
        if let Some(issue) = self.check_uneven_pair(
            pose,
            KeypointName::LeftHip,
            KeypointName::RightHip,
            IssueType::UnevenHips,
        ) {
            issues.push(issue);
        }

        // 肩の左右差
        if let Some(issue) = self.check_uneven_pair(
            pose,
            KeypointName::LeftShoulder,
            KeypointName::RightShoulder,
            IssueType::UnevenShoulders,
        ) {
            issues.push(issue);
        }

        issues.retain(|issue| passes_filter(issue.severity, threshold));
        issues
    }

    fn check_uneven_pair(
        &mut self,
        pose: &Pose,
        left: KeypointName,
        right: KeypointName,
        issue_type: IssueType,
    ) -> Option<PostureIssue> {
        if !self.joints_valid(pose, &[left, right]) {
            return None;
        }
        let diff = (pose.get(left).y - pose.get(right).y).abs();
        if diff > OFFSET_TRIGGER {
            Some(self.make_issue(
                issue_type,
                offset_severity(diff),
                Some(diff),
                Some(OFFSET_TRIGGER),
            ))
        } else {
            None
        }
    }

    fn make_issue(
        &mut self,
        issue_type: IssueType,
        severity: Severity,
        angle: Option<f32>,
        threshold: Option<f32>,
    ) -> PostureIssue {
        let id = self.next_id;
        self.next_id += 1;
        PostureIssue {
            id,
            issue_type,
            severity,
            body_part: issue_type.body_part(),
            description: issue_type.description(),
            recommendation: issue_type.recommendation(),
            angle,
            threshold,
        }
    }

    fn joints_valid(&self, pose: &Pose, names: &[KeypointName]) -> bool {
        names
            .iter()
            .all(|&name| pose.get(name).is_valid(self.confidence_threshold))
    }
}

fn angle_severity(deviation: f32) -> Severity {
    if deviation > ANGLE_SEVERE {
        Severity::Severe
    } else if deviation > ANGLE_MODERATE {
        Severity::Moderate
    } else {
        Severity::Mild
    }
}

fn offset_severity(offset: f32) -> Severity {
    if offset > OFFSET_SEVERE {
        Severity::Severe
    } else if offset > OFFSET_MODERATE {
        Severity::Moderate
    } else {
        Severity::Mild
    }
}

fn passes_filter(severity: Severity, threshold: f32) -> bool {
    match severity {
        Severity::Severe => true,
        Severity::Moderate => threshold <= 0.5,
        Severity::Mild => threshold <= 0.3,
    }
}

/// 検出された問題集合を表示/アラート用に安定ソートする
///
/// 第1キー: 深刻度（severe, moderate, mildの順）
/// 第2キー: 種別の固定優先順位
/// それ以降のタイは検出順を保持する。
pub fn prioritize(issues: &mut [PostureIssue]) {
    issues.sort_by_key(|issue| (issue.severity.rank(), issue.issue_type.priority()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Keypoint;

    fn detector() -> IssueDetector {
        IssueDetector::new(0.2)
    }

    fn sitting_angles(neck: f32, spine: f32) -> AngleMetrics {
        AngleMetrics {
            neck,
            shoulder: 90.0,
            spine,
            hip: 90.0,
            knee: 90.0,
        }
    }

    fn symmetric_pose() -> Pose {
        let mut pose = Pose::default();
        let joints = [
            (KeypointName::Neck, 0.5, 0.3),
            (KeypointName::LeftShoulder, 0.4, 0.35),
            (KeypointName::RightShoulder, 0.6, 0.35),
            (KeypointName::LeftHip, 0.45, 0.6),
            (KeypointName::RightHip, 0.55, 0.6),
        ];
        for (name, x, y) in joints {
            pose.keypoints[name as usize] = Keypoint::new(x, y, 0.9);
        }
        pose
    }

    fn find(issues: &[PostureIssue], issue_type: IssueType) -> Option<&PostureIssue> {
        issues.iter().find(|i| i.issue_type == issue_type)
    }

    #[test]
    fn test_no_issues_for_ideal_sitting() {
        let mut det = detector();
        let issues = det.detect(
            &sitting_angles(15.0, 95.0),
            &symmetric_pose(),
            PostureType::Sitting,
            None,
            0.0,
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_forward_head_boundary_mild() {
        // 偏差15はちょうど境界: >15 が不成立なので moderate ではなく mild
        let mut det = detector();
        let issues = det.detect(
            &sitting_angles(30.0, 95.0),
            &symmetric_pose(),
            PostureType::Sitting,
            None,
            0.0,
        );
        let issue = find(&issues, IssueType::ForwardHead).expect("forward head not detected");
        assert_eq!(issue.severity, Severity::Mild);
    }

    #[test]
    fn test_forward_head_severity_bands() {
        let mut det = detector();
        // 偏差16 -> moderate
        let issues = det.detect(
            &sitting_angles(31.0, 95.0),
            &symmetric_pose(),
            PostureType::Sitting,
            None,
            0.0,
        );
        assert_eq!(
            find(&issues, IssueType::ForwardHead).unwrap().severity,
            Severity::Moderate
        );
        // 偏差26 -> severe
        let issues = det.detect(
            &sitting_angles(41.0, 95.0),
            &symmetric_pose(),
            PostureType::Sitting,
            None,
            0.0,
        );
        assert_eq!(
            find(&issues, IssueType::ForwardHead).unwrap().severity,
            Severity::Severe
        );
    }

    #[test]
    fn test_deviation_at_trigger_not_detected() {
        // 偏差ちょうど10: >10 不成立
        let mut det = detector();
        let issues = det.detect(
            &sitting_angles(25.0, 95.0),
            &symmetric_pose(),
            PostureType::Sitting,
            None,
            0.0,
        );
        assert!(find(&issues, IssueType::ForwardHead).is_none());
    }

    #[test]
    fn test_slouching_detected() {
        let mut det = detector();
        let issues = det.detect(
            &sitting_angles(15.0, 75.0),
            &symmetric_pose(),
            PostureType::Sitting,
            None,
            0.0,
        );
        let issue = find(&issues, IssueType::Slouching).expect("slouching not detected");
        assert_eq!(issue.severity, Severity::Moderate); // 偏差20
    }

    #[test]
    fn test_rounded_shoulders_uses_keypoints() {
        let mut det = detector();
        let mut pose = symmetric_pose();
        // 肩中点を首からX方向に0.08ずらす
        pose.keypoints[KeypointName::LeftShoulder as usize].x = 0.48;
        pose.keypoints[KeypointName::RightShoulder as usize].x = 0.68;
        let issues = det.detect(
            &sitting_angles(15.0, 95.0),
            &pose,
            PostureType::Sitting,
            None,
            0.0,
        );
        let issue = find(&issues, IssueType::RoundedShoulders).expect("not detected");
        assert_eq!(issue.severity, Severity::Moderate);
    }

    #[test]
    fn test_uneven_shoulders_and_hips() {
        let mut det = detector();
        let mut pose = symmetric_pose();
        pose.keypoints[KeypointName::LeftShoulder as usize].y = 0.3;
        pose.keypoints[KeypointName::RightShoulder as usize].y = 0.42; // 差0.12 -> severe
        pose.keypoints[KeypointName::LeftHip as usize].y = 0.6;
        pose.keypoints[KeypointName::RightHip as usize].y = 0.66; // 差0.06 -> mild
        let issues = det.detect(
            &sitting_angles(15.0, 95.0),
            &pose,
            PostureType::Sitting,
            None,
            0.0,
        );
        assert_eq!(
            find(&issues, IssueType::UnevenShoulders).unwrap().severity,
            Severity::Severe
        );
        assert_eq!(
            find(&issues, IssueType::UnevenHips).unwrap().severity,
            Severity::Mild
        );
    }

    #[test]
    fn test_threshold_filter_semantics() {
        // severe 1件 + moderate 1件 + mild 1件の合成集合で
        // フィルタの通過挙動を正確に確認する
        assert!(passes_filter(Severity::Severe, 1.0));
        assert!(passes_filter(Severity::Severe, 0.0));

        assert!(!passes_filter(Severity::Moderate, 0.6));
        assert!(passes_filter(Severity::Moderate, 0.5));
        assert!(passes_filter(Severity::Moderate, 0.2));

        assert!(!passes_filter(Severity::Mild, 0.5));
        assert!(!passes_filter(Severity::Mild, 0.31));
        assert!(passes_filter(Severity::Mild, 0.3));
        assert!(passes_filter(Severity::Mild, 0.2));
    }

    #[test]
    fn test_threshold_filters_detection_output() {
        let mut det = detector();
        // 偏差15 -> mild のみ検出されるはず
        let angles = sitting_angles(30.0, 95.0);
        let pose = symmetric_pose();

        let issues = det.detect(&angles, &pose, PostureType::Sitting, None, 0.2);
        assert!(find(&issues, IssueType::ForwardHead).is_some());

        // threshold 0.5: mild は落ちる
        let issues = det.detect(&angles, &pose, PostureType::Sitting, None, 0.5);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_ids_fresh_per_detection() {
        let mut det = detector();
        let angles = sitting_angles(45.0, 95.0);
        let pose = symmetric_pose();
        let first = det.detect(&angles, &pose, PostureType::Sitting, None, 0.0);
        let second = det.detect(&angles, &pose, PostureType::Sitting, None, 0.0);
        assert_ne!(first[0].id, second[0].id);
    }

    #[test]
    fn test_baseline_overrides_default_optimal() {
        use crate::calibration::UserBaseline;
        let mut det = detector();
        let baseline = UserBaseline::new(
            "user-1".to_string(),
            PostureType::Sitting,
            AngleMetrics {
                neck: 30.0,
                shoulder: 90.0,
                spine: 95.0,
                hip: 90.0,
                knee: 90.0,
            },
            Vec::new(),
        );
        // ベースライン(首30度)基準では偏差0 -> 検出なし
        let issues = det.detect(
            &sitting_angles(30.0, 95.0),
            &symmetric_pose(),
            PostureType::Sitting,
            Some(&baseline),
            0.0,
        );
        assert!(find(&issues, IssueType::ForwardHead).is_none());
    }

    #[test]
    fn test_prioritize_severity_first() {
        let mut det = detector();
        let mut issues = vec![
            det.make_issue(IssueType::UnevenHips, Severity::Moderate, None, None),
            det.make_issue(IssueType::ForwardHead, Severity::Severe, None, None),
        ];
        prioritize(&mut issues);
        assert_eq!(issues[0].issue_type, IssueType::ForwardHead);
        assert_eq!(issues[1].issue_type, IssueType::UnevenHips);
    }

    #[test]
    fn test_prioritize_type_order_within_severity() {
        let mut det = detector();
        let mut issues = vec![
            det.make_issue(IssueType::UnevenShoulders, Severity::Mild, None, None),
            det.make_issue(IssueType::Slouching, Severity::Mild, None, None),
            det.make_issue(IssueType::ForwardHead, Severity::Mild, None, None),
        ];
        prioritize(&mut issues);
        assert_eq!(issues[0].issue_type, IssueType::Slouching);
        assert_eq!(issues[1].issue_type, IssueType::ForwardHead);
        assert_eq!(issues[2].issue_type, IssueType::UnevenShoulders);
    }

    #[test]
    fn test_prioritize_stable_on_ties() {
        let mut det = detector();
        let mut issues = vec![
            det.make_issue(IssueType::Slouching, Severity::Mild, Some(1.0), None),
            det.make_issue(IssueType::Slouching, Severity::Mild, Some(2.0), None),
        ];
        let first_id = issues[0].id;
        prioritize(&mut issues);
        assert_eq!(issues[0].id, first_id);
    }
}
