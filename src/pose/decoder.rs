use ndarray::ArrayView3;
use std::time::Instant;
use thiserror::Error;

use super::keypoint::{Keypoint, KeypointName, Pose};

/// ヒートマップデコードのエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// チャンネル数が14関節スキーマと一致しない。
    /// 黙って切り詰め/パディングすると下流の全計算が壊れるため、ここで拒否する。
    #[error("heatmap channel count mismatch: expected {expected}, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },
}

/// 生ヒートマップ [H][W][K] から Pose をデコード
///
/// チャンネルごとに全セルを走査して最大活性セルを見つけ、
/// (width, height) で正規化した座標と sigmoid(最大値) の信頼度を持つ
/// キーポイントを作る。
pub struct HeatmapDecoder;

impl HeatmapDecoder {
    /// 1フレーム分のヒートマップをデコード
    ///
    /// 走査順は行優先（y外側、x内側）。同値セルは最初に走査した方が勝つ。
    /// 退化したヒートマップ（全セル同値、全ゼロ等）はエラーにせず、
    /// 低信頼度の出力として伝播させる。
    pub fn decode(heatmap: ArrayView3<'_, f32>) -> Result<Pose, DecodeError> {
        let (height, width, channels) = heatmap.dim();
        if channels != KeypointName::COUNT {
            return Err(DecodeError::SchemaMismatch {
                expected: KeypointName::COUNT,
                actual: channels,
            });
        }

        let mut keypoints = [Keypoint::default(); KeypointName::COUNT];

        if width == 0 || height == 0 {
            // 空の平面: 全キーポイントが信頼度0のまま
            return Ok(Pose::with_timestamp(keypoints, Instant::now()));
        }

        for k in 0..KeypointName::COUNT {
            let mut max_val = f32::NEG_INFINITY;
            let mut max_x = 0usize;
            let mut max_y = 0usize;

            for y in 0..height {
                for x in 0..width {
                    let v = heatmap[[y, x, k]];
                    if v > max_val {
                        max_val = v;
                        max_x = x;
                        max_y = y;
                    }
                }
            }

            keypoints[k] = Keypoint::new(
                max_x as f32 / width as f32,
                max_y as f32 / height as f32,
                sigmoid(max_val),
            );
        }

        Ok(Pose::with_timestamp(keypoints, Instant::now()))
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
