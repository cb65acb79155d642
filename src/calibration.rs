use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::analysis::{AngleCalculator, AngleMetrics, PostureClassifier, PostureType};
use crate::config::CalibrationConfig;
use crate::pose::Pose;

// --- データ構造 ---

/// ユーザー個人のベースライン（キャリブレーションで得た「理想」関節角度）
///
/// 所有権は呼び出し側にあり、スコアリング/検出の各呼び出しに明示的に
/// 渡される。コア側に隠れたグローバル状態は持たない。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBaseline {
    pub user_id: String,
    pub posture_type: PostureType,
    /// キャリブレーションウィンドウ全体の角度平均。単一サンプルではない。
    pub optimal_angles: AngleMetrics,
    /// キャリブレーションウィンドウ（永続化対象外）
    #[serde(skip)]
    pub samples: Vec<Pose>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl UserBaseline {
    pub fn new(
        user_id: String,
        posture_type: PostureType,
        optimal_angles: AngleMetrics,
        samples: Vec<Pose>,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            user_id,
            posture_type,
            optimal_angles,
            samples,
            created_at: now,
            updated_at: now,
        }
    }
}

// --- Save / Load ---

pub fn save_baseline<P: AsRef<Path>>(path: P, baseline: &UserBaseline) -> Result<()> {
    let json = serde_json::to_string_pretty(baseline)?;
    fs::write(path, json).context("Failed to write baseline file")?;
    Ok(())
}

pub fn load_baseline<P: AsRef<Path>>(path: P) -> Result<UserBaseline> {
    let content = fs::read_to_string(path).context("Failed to read baseline file")?;
    let baseline: UserBaseline = serde_json::from_str(&content)?;
    Ok(baseline)
}

// --- キャリブレーション ---

/// ベースライン増分更新のデフォルトブレンド重み
pub const DEFAULT_UPDATE_WEIGHT: f32 = 0.1;

/// キャリブレーションセッションのサンプル収集器
///
/// 状態は2つ: 収集中 (count < min_samples) と完了 (count >= min_samples)。
/// ウィンドウは有界で、max_samples = 2 * min_samples に達したら
/// 最古のサンプルをFIFOで追い出す。完了後もサンプル追加は継続できる。
pub struct CalibrationManager {
    min_samples: usize,
    max_samples: usize,
    samples: VecDeque<Pose>,
    angle_calculator: AngleCalculator,
    classifier: PostureClassifier,
}

impl CalibrationManager {
    pub const DEFAULT_MIN_SAMPLES: usize = 30;

    pub fn new(min_samples: usize, confidence_threshold: f32) -> Self {
        Self {
            min_samples,
            max_samples: min_samples * 2,
            samples: VecDeque::with_capacity(min_samples * 2),
            angle_calculator: AngleCalculator::new(confidence_threshold),
            classifier: PostureClassifier::new(confidence_threshold),
        }
    }

    pub fn from_config(config: &CalibrationConfig, confidence_threshold: f32) -> Self {
        Self::new(config.min_samples, confidence_threshold)
    }

    /// サンプルを1つ追加し、完了状態に達したかを返す
    pub fn add_sample(&mut self, pose: Pose) -> bool {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(pose);
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.samples.len() >= self.min_samples
    }

    /// 収集の進捗 (0〜100)
    pub fn progress(&self) -> u8 {
        let percent = self.samples.len() * 100 / self.min_samples;
        percent.min(100) as u8
    }

    /// 現在のウィンドウのコピーを返す
    pub fn samples(&self) -> Vec<Pose> {
        self.samples.iter().cloned().collect()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// ウィンドウを空にして収集中状態に戻す
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// 収集済みサンプルからベースラインを作成する
    ///
    /// 完了状態でなければ None。姿勢種別はサンプル全体の多数決
    /// （同数の場合は先に出現した種別が勝つ）、最適角度は全サンプルの
    /// 角度の算術平均。
    pub fn create_baseline(&self, user_id: &str) -> Option<UserBaseline> {
        if !self.is_complete() {
            return None;
        }

        let posture_type = self.plurality_posture_type();
        let optimal_angles = self.mean_angles(self.samples.iter());

        Some(UserBaseline::new(
            user_id.to_string(),
            posture_type,
            optimal_angles,
            self.samples(),
        ))
    }

    /// 既存ベースラインを新しいサンプルで増分更新する
    ///
    /// 角度ごとに独立な指数移動平均ブレンド:
    /// updated = existing * (1 - weight) + mean(new) * weight
    /// 収集中/完了の状態機械とは無関係に、いつでも呼べる。
    pub fn update_baseline(&self, baseline: &mut UserBaseline, new_poses: &[Pose], weight: f32) {
        if new_poses.is_empty() {
            return;
        }

        let mean = self.mean_angles(new_poses.iter());
        let old = baseline.optimal_angles;
        baseline.optimal_angles = AngleMetrics {
            neck: old.neck * (1.0 - weight) + mean.neck * weight,
            shoulder: old.shoulder * (1.0 - weight) + mean.shoulder * weight,
            spine: old.spine * (1.0 - weight) + mean.spine * weight,
            hip: old.hip * (1.0 - weight) + mean.hip * weight,
            knee: old.knee * (1.0 - weight) + mean.knee * weight,
        };
        baseline.updated_at = SystemTime::now();
    }

    /// サンプル全体の多数決で姿勢種別を決める（同数は先着順）
    fn plurality_posture_type(&self) -> PostureType {
        let mut counts: Vec<(PostureType, usize)> = Vec::new();
        for pose in &self.samples {
            let posture_type = self.classifier.classify(pose);
            match counts.iter_mut().find(|(t, _)| *t == posture_type) {
                Some((_, count)) => *count += 1,
                None => counts.push((posture_type, 1)),
            }
        }

        let mut best = (PostureType::Unknown, 0usize);
        for &(posture_type, count) in &counts {
            // 厳密比較: 同数なら先に出現した種別を保持
            if count > best.1 {
                best = (posture_type, count);
            }
        }
        best.0
    }

    fn mean_angles<'a, I: Iterator<Item = &'a Pose>>(&self, poses: I) -> AngleMetrics {
        let mut sum = AngleMetrics::default();
        let mut count = 0usize;
        for pose in poses {
            let (angles, _) = self.angle_calculator.compute(pose);
            sum.neck += angles.neck;
            sum.shoulder += angles.shoulder;
            sum.spine += angles.spine;
            sum.hip += angles.hip;
            sum.knee += angles.knee;
            count += 1;
        }
        if count == 0 {
            return AngleMetrics::default();
        }
        let n = count as f32;
        AngleMetrics {
            neck: sum.neck / n,
            shoulder: sum.shoulder / n,
            spine: sum.spine / n,
            hip: sum.hip / n,
            knee: sum.knee / n,
        }
    }
}
