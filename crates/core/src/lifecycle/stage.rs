//! # Pipeline Stages
//!
//! The eight fixed stages of the delivery pipeline and the paradigm each one
//! dispatches.

use serde::{Deserialize, Serialize};

/// Stage of the delivery pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    RequirementExtraction,
    ArchitectureSynthesis,
    CodeGeneration,
    AutomatedTesting,
    CodeReview,
    DeploymentOrchestration,
    Monitoring,
    MetricsFeedback,
}

impl PipelineStage {
    /// All stages in execution order
    pub const ALL: [PipelineStage; 8] = [
        PipelineStage::RequirementExtraction,
        PipelineStage::ArchitectureSynthesis,
        PipelineStage::CodeGeneration,
        PipelineStage::AutomatedTesting,
        PipelineStage::CodeReview,
        PipelineStage::DeploymentOrchestration,
        PipelineStage::Monitoring,
        PipelineStage::MetricsFeedback,
    ];

    /// Stage name, used as the session id and history key
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::RequirementExtraction => "requirement_extraction",
            PipelineStage::ArchitectureSynthesis => "architecture_synthesis",
            PipelineStage::CodeGeneration => "code_generation",
            PipelineStage::AutomatedTesting => "automated_testing",
            PipelineStage::CodeReview => "code_review",
            PipelineStage::DeploymentOrchestration => "deployment_orchestration",
            PipelineStage::Monitoring => "monitoring",
            PipelineStage::MetricsFeedback => "metrics_feedback",
        }
    }

    /// Paradigm label dispatched for this stage
    pub fn paradigm(&self) -> &'static str {
        match self {
            PipelineStage::RequirementExtraction => "analysis",
            PipelineStage::ArchitectureSynthesis => "design",
            PipelineStage::CodeGeneration => "implementation",
            PipelineStage::AutomatedTesting => "testing",
            PipelineStage::CodeReview => "review",
            PipelineStage::DeploymentOrchestration => "deployment",
            PipelineStage::Monitoring => "observability",
            PipelineStage::MetricsFeedback => "feedback",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        let names: Vec<&str> = PipelineStage::ALL.iter().map(PipelineStage::name).collect();
        assert_eq!(
            names,
            vec![
                "requirement_extraction",
                "architecture_synthesis",
                "code_generation",
                "automated_testing",
                "code_review",
                "deployment_orchestration",
                "monitoring",
                "metrics_feedback",
            ]
        );
    }

    #[test]
    fn test_stage_paradigms() {
        assert_eq!(PipelineStage::RequirementExtraction.paradigm(), "analysis");
        assert_eq!(PipelineStage::CodeGeneration.paradigm(), "implementation");
        assert_eq!(PipelineStage::Monitoring.paradigm(), "observability");
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&PipelineStage::CodeReview).unwrap();
        assert_eq!(json, "\"code_review\"");
    }
}
