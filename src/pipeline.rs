use anyhow::{Context, Result};
use ndarray::ArrayView3;

use crate::analysis::{
    prioritize, AngleCalculator, AngleMetrics, AngleValidity, ImprovementEstimator, IssueDetector,
    PostureClassifier, PostureIssue, PostureScore, ReferenceImprovement, ScoringEngine,
};
use crate::calibration::UserBaseline;
use crate::config::Config;
use crate::pose::{HeatmapDecoder, Pose, PoseSmoother};

/// 1フレーム分の出力メトリクス
#[derive(Debug)]
pub struct PostureMetrics {
    pub current_posture: PostureScore,
    /// 優先順位順に並んだ問題リスト
    pub issues: Vec<PostureIssue>,
    pub angles: AngleMetrics,
    pub angle_validity: AngleValidity,
    /// 改善度（ImprovementEstimatorによる。既定はプレースホルダ実装）
    pub improvement: f32,
    /// セッション継続時間（秒）。コアでは計算せず呼び出し側が設定する。
    pub duration: f32,
}

/// フレームごとの解析パイプライン
///
/// decode → smooth → angle → {classify, score, detect} → prioritize を
/// 呼び出し元のフレームループ上で同期実行する。全段が小さな固定長
/// 配列上の純粋計算で、レンダリング/キャプチャループにインラインで
/// 走らせて問題ない。カメラストリームごとに1インスタンスを持つこと。
pub struct PosturePipeline {
    smoother: PoseSmoother,
    angle_calculator: AngleCalculator,
    classifier: PostureClassifier,
    scoring: ScoringEngine,
    detector: IssueDetector,
    improvement: Box<dyn ImprovementEstimator>,
    issue_threshold: f32,
}

impl PosturePipeline {
    pub fn from_config(config: &Config) -> Self {
        Self {
            smoother: PoseSmoother::from_config(&config.smooth),
            angle_calculator: AngleCalculator::from_config(&config.analysis),
            classifier: PostureClassifier::from_config(&config.analysis),
            scoring: ScoringEngine::new(),
            detector: IssueDetector::from_config(&config.analysis),
            improvement: Box::new(ReferenceImprovement::default()),
            issue_threshold: config.analysis.issue_threshold,
        }
    }

    /// 改善度推定の実装を差し替える
    pub fn with_improvement_estimator(
        mut self,
        estimator: Box<dyn ImprovementEstimator>,
    ) -> Self {
        self.improvement = estimator;
        self
    }

    /// 生ヒートマップから1フレーム分のメトリクスを計算する
    pub fn process_heatmap(
        &mut self,
        heatmap: ArrayView3<'_, f32>,
        baseline: Option<&UserBaseline>,
    ) -> Result<PostureMetrics> {
        let pose = HeatmapDecoder::decode(heatmap).context("heatmap decode failed")?;
        Ok(self.process_pose(pose, baseline))
    }

    /// デコード済みPoseから1フレーム分のメトリクスを計算する
    /// （外部の検出器を統合する呼び出し元向け）
    pub fn process_pose(&mut self, pose: Pose, baseline: Option<&UserBaseline>) -> PostureMetrics {
        let smoothed = self.smoother.apply(pose);
        let (angles, angle_validity) = self.angle_calculator.compute(&smoothed);
        let posture_type = self.classifier.classify(&smoothed);

        let current_posture = self.scoring.score(&angles, posture_type, baseline);
        let mut issues = self.detector.detect(
            &angles,
            &smoothed,
            posture_type,
            baseline,
            self.issue_threshold,
        );
        prioritize(&mut issues);

        let improvement = self.improvement.estimate(current_posture.overall);

        PostureMetrics {
            current_posture,
            issues,
            angles,
            angle_validity,
            improvement,
            duration: 0.0,
        }
    }

    /// トラッキング再開時（カメラ再取得、キャリブレーション開始等）に
    /// 平滑化履歴を破棄する
    pub fn reset(&mut self) {
        self.smoother.reset();
    }
}
