//! Deployment step pipeline: the fixed template shown while idle, the
//! snapshot that the status poller replaces wholesale, and the plain-text
//! timeline rendering.

use serde::{Deserialize, Serialize};

use crate::types::{PipelineStep, StepStatus, TaskId};

/// Status message shown while no task is being tracked.
pub const IDLE_MESSAGE: &str = "Ready for deployment";

/// The ordered step template: upload, analyze, build, deploy, monitor.
pub fn default_steps() -> Vec<PipelineStep> {
    vec![
        PipelineStep::pending(
            "upload",
            "Code Uploaded",
            "Project files successfully uploaded to the platform",
        ),
        PipelineStep::pending(
            "analyze",
            "AI Analysis",
            "Analyzing project structure and dependencies",
        ),
        PipelineStep::pending(
            "build",
            "Build Process",
            "Building application for deployment",
        ),
        PipelineStep::pending(
            "deploy",
            "Deployment",
            "Deploying to production environment",
        ),
        PipelineStep::pending(
            "monitor",
            "Monitoring",
            "Setting up monitoring and alerts",
        ),
    ]
}

/// A status message ends polling when it mentions "complete" or "failed",
/// in any case.
pub fn is_terminal_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("complete") || lower.contains("failed")
}

/// The whole visible pipeline state. Replaced as a unit, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub task_id: Option<TaskId>,
    pub steps: Vec<PipelineStep>,
    pub current_message: String,
}

impl PipelineSnapshot {
    pub fn idle() -> Self {
        Self {
            task_id: None,
            steps: default_steps(),
            current_message: IDLE_MESSAGE.to_string(),
        }
    }

    pub fn for_task(task_id: TaskId, steps: Vec<PipelineStep>, message: impl Into<String>) -> Self {
        Self {
            task_id: Some(task_id),
            steps,
            current_message: message.into(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.task_id.is_none()
    }

    pub fn active_step(&self) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.status == StepStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        is_terminal_message(&self.current_message)
    }

    /// Number of completed steps, for progress displays.
    pub fn completed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }
}

impl Default for PipelineSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}

/// Render steps as a vertical timeline, one step per line followed by an
/// indented description.
pub fn render_timeline(steps: &[PipelineStep]) -> String {
    let mut out = String::new();
    for (i, step) in steps.iter().enumerate() {
        let connector = if i + 1 == steps.len() { " " } else { "|" };
        match &step.timestamp {
            Some(ts) => out.push_str(&format!(
                "[{}] {} ({})\n",
                step.status.glyph(),
                step.title,
                ts
            )),
            None => out.push_str(&format!("[{}] {}\n", step.status.glyph(), step.title)),
        }
        out.push_str(&format!(" {}   {}\n", connector, step.description));
    }
    out
}
