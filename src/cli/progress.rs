use std::collections::HashSet;
use std::fmt::Display;
use std::time::Duration;

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::plan::TaskKey;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Pending,
    InProgress,
    Failed,
}

/// One spinner line per macro of a batch.
pub struct BatchProgress {
    mp: MultiProgress,
}

/// Progress of a single macro through its enabled tasks.
pub struct MacroProgress {
    name: String,
    steps: Vec<TaskKey>,
    step_num: usize,
    progress_bar: ProgressBar,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self {
            mp: MultiProgress::new(),
        }
    }

    /// Adds a pending line for `name`.
    ///
    /// Characterization and planning always run; views run only if enabled.
    pub fn add_macro(&self, name: &str, tasks: &HashSet<TaskKey>) -> MacroProgress {
        let steps = TaskKey::ALL
            .into_iter()
            .filter(|key| {
                matches!(key, TaskKey::Characterize | TaskKey::GeneratePlan) || tasks.contains(key)
            })
            .collect();
        let mut progress = MacroProgress {
            name: name.to_string(),
            steps,
            step_num: 0,
            progress_bar: self.mp.add(ProgressBar::new_spinner()),
        };
        progress.set_status(StepStatus::Pending);
        progress
    }
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroProgress {
    pub fn start(&mut self) {
        self.set_status(StepStatus::InProgress);
    }

    /// Marks `key` as complete. Tasks that were not enabled are ignored.
    pub fn finish(&mut self, key: TaskKey) {
        if let Some(pos) = self.steps.iter().position(|&step| step == key) {
            self.step_num = self.step_num.max(pos + 1);
        }
        if self.step_num >= self.steps.len() {
            self.set_status(StepStatus::Done);
        } else {
            self.set_status(StepStatus::InProgress);
        }
    }

    pub fn check<T>(&mut self, res: &crate::Result<T>) {
        match res {
            Ok(_) => self.set_status(StepStatus::Done),
            Err(_) => self.set_status(StepStatus::Failed),
        }
    }

    fn message(&self) -> String {
        let total = self.steps.len();
        let width = format!("{total}").len();
        match self.steps.get(self.step_num) {
            Some(step) => format!(
                "{} [{:width$}/{:width$}] {}",
                self.name,
                self.step_num + 1,
                total,
                step.desc()
            ),
            None => format!("{} [{total}/{total}]", self.name),
        }
    }

    fn set_status(&mut self, status: StepStatus) {
        let status_template = match status {
            StepStatus::Done => format_template(false, "Done".green().bold()),
            StepStatus::Failed => format_template(false, "Failed".bright_white().on_red().bold()),
            StepStatus::InProgress => format_template(true, "In Progress".bright_white().bold()),
            StepStatus::Pending => format_template(true, "Pending".blue().bold()),
        };
        if let Ok(style) = ProgressStyle::with_template(&status_template) {
            self.progress_bar.set_style(style);
        }
        self.progress_bar.set_message(self.message());

        match status {
            StepStatus::InProgress => self
                .progress_bar
                .enable_steady_tick(Duration::from_millis(200)),
            StepStatus::Pending => {}
            StepStatus::Done | StepStatus::Failed => self.progress_bar.finish(),
        }
    }
}

fn format_template(spinner: bool, status: impl Display) -> String {
    if spinner {
        format!("{{spinner:.green}} {:16} {{msg}}", status)
    } else {
        format!("  {:16} {{msg}}", status)
    }
}
