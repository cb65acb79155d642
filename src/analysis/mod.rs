pub mod angles;
pub mod classifier;
pub mod improvement;
pub mod issue;
pub mod score;

pub use angles::{joint_angle, AngleCalculator, AngleMetrics, AngleValidity};
pub use classifier::{PostureClassifier, PostureType};
pub use improvement::{ImprovementEstimator, ReferenceImprovement};
pub use issue::{prioritize, IssueDetector, IssueType, PostureIssue, Severity};
pub use score::{default_optimal_angles, ComponentScores, PostureScore, ScoringEngine};
