use anyhow::Result;
use ndarray::Array3;
use shisei_core::analysis::Severity;
use shisei_core::calibration::CalibrationManager;
use shisei_core::config::Config;
use shisei_core::pipeline::PosturePipeline;
use shisei_core::pose::KeypointName;

const CONFIG_PATH: &str = "config.toml";

/// デモ用の合成被写体: 座位の14関節配置を時間経過で前傾させる
fn synthetic_joints(lean: f32) -> [(f32, f32); KeypointName::COUNT] {
    [
        (0.5 + lean, 0.1),         // HeadTop
        (0.5 + lean * 0.5, 0.25),  // Neck
        (0.4, 0.3),                // LeftShoulder
        (0.6, 0.3),                // RightShoulder
        (0.38, 0.45),              // LeftElbow
        (0.62, 0.45),              // RightElbow
        (0.36, 0.55),              // LeftWrist
        (0.64, 0.55),              // RightWrist
        (0.45, 0.55),              // LeftHip
        (0.55, 0.55),              // RightHip
        (0.4, 0.65),               // LeftKnee
        (0.6, 0.65),               // RightKnee
        (0.4, 0.85),               // LeftAnkle
        (0.6, 0.85),               // RightAnkle
    ]
}

/// 関節配置を64x64のヒートマップに描く（ピークセルのみ高活性）
fn render_heatmap(joints: &[(f32, f32); KeypointName::COUNT]) -> Array3<f32> {
    let size = 64usize;
    let mut heatmap = Array3::<f32>::from_elem((size, size, KeypointName::COUNT), -6.0);
    for (k, &(x, y)) in joints.iter().enumerate() {
        let px = ((x * size as f32) as usize).min(size - 1);
        let py = ((y * size as f32) as usize).min(size - 1);
        heatmap[[py, px, k]] = 6.0;
    }
    heatmap
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Severe => "重度",
        Severity::Moderate => "中度",
        Severity::Mild => "軽度",
    }
}

fn main() -> Result<()> {
    let config = Config::load_or_default(CONFIG_PATH);

    println!("=== shisei-core デモ ({}) ===", env!("GIT_VERSION"));
    println!();

    let mut pipeline = PosturePipeline::from_config(&config);
    let mut calibration =
        CalibrationManager::from_config(&config.calibration, config.analysis.confidence_threshold);

    // フェーズ1: 良い姿勢でキャリブレーション
    println!("キャリブレーション中...");
    let mut frame = 0u32;
    let baseline = loop {
        let heatmap = render_heatmap(&synthetic_joints(0.0));
        let pose = shisei_core::pose::HeatmapDecoder::decode(heatmap.view())?;
        let complete = calibration.add_sample(pose);
        frame += 1;
        if frame % 10 == 0 {
            println!("  進捗: {}%", calibration.progress());
        }
        if complete {
            if let Some(baseline) = calibration.create_baseline("demo-user") {
                break baseline;
            }
        }
    };
    println!(
        "ベースライン作成完了: 姿勢={:?}, 首={:.1}度, 脊椎={:.1}度",
        baseline.posture_type, baseline.optimal_angles.neck, baseline.optimal_angles.spine
    );
    println!();

    // フェーズ2: 徐々に前傾する被写体を解析
    println!("解析中（徐々に前傾）:");
    pipeline.reset();
    for i in 0..10 {
        let lean = i as f32 * 0.04;
        let heatmap = render_heatmap(&synthetic_joints(lean));
        let metrics = pipeline.process_heatmap(heatmap.view(), Some(&baseline))?;

        print!(
            "  frame {:2}: スコア {:3} (頭{} 肩{} 脊椎{} 腰{})",
            i,
            metrics.current_posture.overall,
            metrics.current_posture.components.head,
            metrics.current_posture.components.shoulders,
            metrics.current_posture.components.spine,
            metrics.current_posture.components.hips,
        );
        match metrics.issues.first() {
            Some(issue) => println!(
                "  [{}] {}: {}",
                severity_label(issue.severity),
                issue.description,
                issue.recommendation
            ),
            None => println!("  問題なし"),
        }
    }

    Ok(())
}
