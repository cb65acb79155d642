/// 改善度の推定インターフェース
///
/// 本来は履歴トレンドから計算するべき値だが、現行実装は固定基準との
/// 単純な差分のプレースホルダ。トレイトにしておくことで、スコアリング
/// 本体に触れずに履歴ベースの実装へ差し替えられる。
pub trait ImprovementEstimator {
    /// 現フレームの総合スコアに対する改善度（正=改善、負=悪化）
    fn estimate(&self, overall: u8) -> f32;
}

/// 固定基準スコアとの差分を返すプレースホルダ実装
pub struct ReferenceImprovement {
    reference: f32,
}

impl ReferenceImprovement {
    pub const DEFAULT_REFERENCE: f32 = 70.0;

    pub fn new(reference: f32) -> Self {
        Self { reference }
    }
}

impl Default for ReferenceImprovement {
    fn default() -> Self {
        Self::new(Self::DEFAULT_REFERENCE)
    }
}

impl ImprovementEstimator for ReferenceImprovement {
    fn estimate(&self, overall: u8) -> f32 {
        overall as f32 - self.reference
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_delta() {
        let estimator = ReferenceImprovement::default();
        assert_eq!(estimator.estimate(85), 15.0);
        assert_eq!(estimator.estimate(70), 0.0);
        assert_eq!(estimator.estimate(50), -20.0);
    }

    #[test]
    fn test_custom_reference() {
        let estimator = ReferenceImprovement::new(90.0);
        assert_eq!(estimator.estimate(80), -10.0);
    }
}
