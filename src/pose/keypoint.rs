use std::time::Instant;

/// 14関節スキーマのキーポイントインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointName {
    HeadTop = 0,
    Neck = 1,
    LeftShoulder = 2,
    RightShoulder = 3,
    LeftElbow = 4,
    RightElbow = 5,
    LeftWrist = 6,
    RightWrist = 7,
    LeftHip = 8,
    RightHip = 9,
    LeftKnee = 10,
    RightKnee = 11,
    LeftAnkle = 12,
    RightAnkle = 13,
}

impl KeypointName {
    pub const COUNT: usize = 14;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::HeadTop),
            1 => Some(Self::Neck),
            2 => Some(Self::LeftShoulder),
            3 => Some(Self::RightShoulder),
            4 => Some(Self::LeftElbow),
            5 => Some(Self::RightElbow),
            6 => Some(Self::LeftWrist),
            7 => Some(Self::RightWrist),
            8 => Some(Self::LeftHip),
            9 => Some(Self::RightHip),
            10 => Some(Self::LeftKnee),
            11 => Some(Self::RightKnee),
            12 => Some(Self::LeftAnkle),
            13 => Some(Self::RightAnkle),
            _ => None,
        }
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0)
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub score: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, score: f32) -> Self {
        Self { x, y, score }
    }

    /// 信頼度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.score >= threshold
    }

    /// 座標を (x, y) タプルで取得
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            score: 0.0,
        }
    }
}

/// 14キーポイントからなる1フレーム分の姿勢
#[derive(Debug, Clone)]
pub struct Pose {
    pub keypoints: [Keypoint; KeypointName::COUNT],
    /// 全体信頼度（キーポイント信頼度の平均）
    pub score: f32,
    /// フレーム処理時刻（単調時刻）
    pub timestamp: Instant,
}

impl Pose {
    pub fn new(keypoints: [Keypoint; KeypointName::COUNT]) -> Self {
        Self::with_timestamp(keypoints, Instant::now())
    }

    pub fn with_timestamp(keypoints: [Keypoint; KeypointName::COUNT], timestamp: Instant) -> Self {
        let score = average_score(&keypoints);
        Self {
            keypoints,
            score,
            timestamp,
        }
    }

    /// 名前でキーポイントを取得
    pub fn get(&self, name: KeypointName) -> &Keypoint {
        &self.keypoints[name as usize]
    }

    /// 全キーポイントの平均信頼度
    pub fn average_score(&self) -> f32 {
        average_score(&self.keypoints)
    }

    /// 2つのキーポイントの中点 (x, y)
    pub fn midpoint(&self, a: KeypointName, b: KeypointName) -> (f32, f32) {
        let ka = self.get(a);
        let kb = self.get(b);
        ((ka.x + kb.x) / 2.0, (ka.y + kb.y) / 2.0)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new([Keypoint::default(); KeypointName::COUNT])
    }
}

fn average_score(keypoints: &[Keypoint; KeypointName::COUNT]) -> f32 {
    let sum: f32 = keypoints.iter().map(|k| k.score).sum();
    sum / KeypointName::COUNT as f32
}
