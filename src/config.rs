use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub smooth: SmoothConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmoothConfig {
    /// EMA係数（1.0で平滑化なし、現フレームを重視するほど大きく）
    #[serde(default = "default_alpha")]
    pub alpha: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// キーポイント有効判定の信頼度閾値
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    /// 問題フィルタ閾値 (0〜1): severeは常に通過、
    /// moderateは0.5以下、mildは0.3以下で通過
    #[serde(default = "default_issue_threshold")]
    pub issue_threshold: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    /// ベースライン作成に必要な最小サンプル数
    /// （ウィンドウ上限はこの2倍）
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

fn default_alpha() -> f32 { 0.7 }
fn default_confidence_threshold() -> f32 { 0.2 }
fn default_issue_threshold() -> f32 { 0.5 }
fn default_min_samples() -> usize { 30 }

impl Default for SmoothConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            issue_threshold: default_issue_threshold(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_samples: default_min_samples(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// 設定ファイルがなければデフォルト値で続行する
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }
}
