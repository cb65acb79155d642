use std::time::Instant;

use crate::calibration::UserBaseline;

use super::angles::AngleMetrics;
use super::classifier::PostureType;

/// 部位別スコア (0〜100)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentScores {
    pub head: u8,
    pub shoulders: u8,
    pub spine: u8,
    pub hips: u8,
}

/// 1フレーム分の姿勢スコア
#[derive(Debug, Clone)]
pub struct PostureScore {
    /// 総合スコア (0〜100)、部位別スコアの固定重み付き和
    pub overall: u8,
    pub components: ComponentScores,
    pub timestamp: Instant,
    pub posture_type: PostureType,
}

/// 総合スコアの重み: 頭 / 肩 / 脊椎 / 腰（合計1.0）
const WEIGHT_HEAD: f32 = 0.25;
const WEIGHT_SHOULDERS: f32 = 0.25;
const WEIGHT_SPINE: f32 = 0.30;
const WEIGHT_HIPS: f32 = 0.20;

/// 姿勢種別ごとのデフォルト最適角度
///
/// ベースライン未設定時に使う。キー集合はコンパイル時に閉じているため
/// 実行時辞書ではなくmatchで表す。
pub fn default_optimal_angles(posture_type: PostureType) -> AngleMetrics {
    match posture_type {
        PostureType::Sitting => AngleMetrics {
            neck: 15.0,
            shoulder: 90.0,
            spine: 95.0,
            hip: 90.0,
            knee: 90.0,
        },
        PostureType::Standing | PostureType::Exercising | PostureType::Unknown => AngleMetrics {
            neck: 0.0,
            shoulder: 180.0,
            spine: 180.0,
            hip: 180.0,
            knee: 180.0,
        },
    }
}

/// 角度偏差を部位別スコアと総合スコアに写す
///
/// 偏差→スコアの段階関数は部位ごとに固定（互換性のため値を変えないこと）。
/// 入力が同じなら常に同じ結果を返す。
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        angles: &AngleMetrics,
        posture_type: PostureType,
        baseline: Option<&UserBaseline>,
    ) -> PostureScore {
        let optimal = match baseline {
            Some(b) => b.optimal_angles,
            None => default_optimal_angles(posture_type),
        };

        let components = ComponentScores {
            head: head_score((angles.neck - optimal.neck).abs()),
            shoulders: shoulder_score((angles.shoulder - optimal.shoulder).abs()),
            spine: spine_score((angles.spine - optimal.spine).abs()),
            hips: hip_score((angles.hip - optimal.hip).abs()),
        };

        PostureScore {
            overall: overall_score(&components),
            components,
            timestamp: Instant::now(),
            posture_type,
        }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

pub fn overall_score(components: &ComponentScores) -> u8 {
    let weighted = WEIGHT_HEAD * components.head as f32
        + WEIGHT_SHOULDERS * components.shoulders as f32
        + WEIGHT_SPINE * components.spine as f32
        + WEIGHT_HIPS * components.hips as f32;
    weighted.round() as u8
}

fn head_score(deviation: f32) -> u8 {
    if deviation <= 5.0 {
        100
    } else if deviation <= 10.0 {
        90
    } else if deviation <= 15.0 {
        80
    } else if deviation <= 20.0 {
        70
    } else if deviation <= 30.0 {
        50
    } else {
        30
    }
}

fn shoulder_score(deviation: f32) -> u8 {
    if deviation <= 5.0 {
        100
    } else if deviation <= 10.0 {
        90
    } else if deviation <= 20.0 {
        75
    } else if deviation <= 30.0 {
        60
    } else {
        40
    }
}

// 脊椎は最も厳しい: 5度未満の偏差でのみ満点、25度超で30まで落ちる
fn spine_score(deviation: f32) -> u8 {
    if deviation <= 5.0 {
        100
    } else if deviation <= 10.0 {
        85
    } else if deviation <= 15.0 {
        70
    } else if deviation <= 25.0 {
        50
    } else {
        30
    }
}

// 腰は最も緩い
fn hip_score(deviation: f32) -> u8 {
    if deviation <= 10.0 {
        100
    } else if deviation <= 20.0 {
        85
    } else if deviation <= 30.0 {
        70
    } else if deviation <= 40.0 {
        55
    } else {
        40
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spine_breakpoints() {
        assert_eq!(spine_score(4.0), 100);
        assert_eq!(spine_score(12.0), 85);
        assert_eq!(spine_score(26.0), 30);
    }

    #[test]
    fn test_head_breakpoints() {
        assert_eq!(head_score(5.0), 100);
        assert_eq!(head_score(10.0), 90);
        assert_eq!(head_score(15.0), 80);
        assert_eq!(head_score(20.0), 70);
        assert_eq!(head_score(30.0), 50);
        assert_eq!(head_score(30.1), 30);
    }

    #[test]
    fn test_scores_non_increasing() {
        let tables: [fn(f32) -> u8; 4] = [head_score, shoulder_score, spine_score, hip_score];
        for table in tables {
            let mut prev = table(0.0);
            let mut deviation = 0.0f32;
            while deviation <= 60.0 {
                let current = table(deviation);
                assert!(
                    current <= prev,
                    "score increased at deviation {deviation}: {prev} -> {current}"
                );
                prev = current;
                deviation += 0.5;
            }
        }
    }

    #[test]
    fn test_overall_weighted_sum() {
        let components = ComponentScores {
            head: 80,
            shoulders: 90,
            spine: 70,
            hips: 100,
        };
        // 0.25*80 + 0.25*90 + 0.30*70 + 0.20*100 = 83.5 -> 84
        assert_eq!(overall_score(&components), 84);
    }

    #[test]
    fn test_overall_all_perfect() {
        let components = ComponentScores {
            head: 100,
            shoulders: 100,
            spine: 100,
            hips: 100,
        };
        assert_eq!(overall_score(&components), 100);
    }

    #[test]
    fn test_default_optimal_sitting() {
        let optimal = default_optimal_angles(PostureType::Sitting);
        assert_eq!(optimal.neck, 15.0);
        assert_eq!(optimal.spine, 95.0);
    }

    #[test]
    fn test_default_optimal_standing() {
        let optimal = default_optimal_angles(PostureType::Standing);
        assert_eq!(optimal.neck, 0.0);
        assert_eq!(optimal.spine, 180.0);
    }

    #[test]
    fn test_score_without_baseline() {
        let engine = ScoringEngine::new();
        // 座位最適角からの偏差: 首15度 -> head 80
        let angles = AngleMetrics {
            neck: 30.0,
            shoulder: 90.0,
            spine: 95.0,
            hip: 90.0,
            knee: 90.0,
        };
        let score = engine.score(&angles, PostureType::Sitting, None);
        assert_eq!(score.components.head, 80);
        assert_eq!(score.components.shoulders, 100);
        assert_eq!(score.components.spine, 100);
        assert_eq!(score.components.hips, 100);
        // 0.25*80 + 0.25*100 + 0.30*100 + 0.20*100 = 95
        assert_eq!(score.overall, 95);
    }
}
