use std::fmt;

use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StageStatus {
    #[default]
    Skipped,
    Done,
    /// Diff came back empty
    NoChange,
    Failed(String),
}

impl StageStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, StageStatus::Failed(_))
    }

    fn label(&self) -> &'static str {
        match self {
            StageStatus::Skipped => "skipped",
            StageStatus::Done => "done",
            StageStatus::NoChange => "no change",
            StageStatus::Failed(_) => "FAILED",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchReport {
    pub name: String,
    pub compute: StageStatus,
    pub collect: StageStatus,
    pub diff: StageStatus,
    pub validate: StageStatus,
    pub commit: StageStatus,
}

impl SwitchReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            compute: StageStatus::Done,
            collect: StageStatus::Skipped,
            diff: StageStatus::Skipped,
            validate: StageStatus::Skipped,
            commit: StageStatus::Skipped,
        }
    }

    /// Switch whose configuration could not be computed; nothing else ran
    pub fn compute_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            compute: StageStatus::Failed(reason.into()),
            ..Self::new(name)
        }
    }

    pub fn is_validated(&self) -> bool {
        self.validate == StageStatus::Done
    }

    pub fn has_failures(&self) -> bool {
        self.stages().iter().any(|(_, s)| s.is_failed())
    }

    fn stages(&self) -> [(&'static str, &StageStatus); 5] {
        [
            ("compute", &self.compute),
            ("collect", &self.collect),
            ("diff", &self.diff),
            ("validate", &self.validate),
            ("commit", &self.commit),
        ]
    }
}

/// Outcome of one reconciliation run, one row per switch
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub switches: Vec<SwitchReport>,
    /// Every reconciled switch passed validation
    pub validated: bool,
}

impl RunSummary {
    pub fn new(run_id: Uuid, switches: Vec<SwitchReport>) -> Self {
        let validated = switches.iter().all(|s| s.is_validated());
        Self {
            run_id,
            switches,
            validated,
        }
    }

    /// Append switches that never reached the device
    pub fn add_compute_failures(&mut self, failures: impl IntoIterator<Item = SwitchReport>) {
        self.switches.extend(failures);
    }

    pub fn get(&self, name: &str) -> Option<&SwitchReport> {
        self.switches.iter().find(|s| s.name == name)
    }

    /// False when anything failed to compute, validate or commit
    pub fn is_success(&self) -> bool {
        self.validated
            && self.switches.iter().all(|s| {
                !s.compute.is_failed() && !s.validate.is_failed() && !s.commit.is_failed()
            })
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .switches
            .iter()
            .map(|s| s.name.len())
            .max()
            .unwrap_or(0)
            .max("SWITCH".len());

        writeln!(f, "run {}", self.run_id)?;
        writeln!(
            f,
            "{:<width$}  {:<9}  {:<9}  {:<9}  {:<9}  {:<9}",
            "SWITCH", "COMPUTE", "COLLECT", "DIFF", "VALIDATE", "COMMIT"
        )?;
        for s in &self.switches {
            writeln!(
                f,
                "{:<width$}  {:<9}  {:<9}  {:<9}  {:<9}  {:<9}",
                s.name,
                s.compute.label(),
                s.collect.label(),
                s.diff.label(),
                s.validate.label(),
                s.commit.label()
            )?;
        }

        for s in &self.switches {
            for (stage, status) in s.stages() {
                if let StageStatus::Failed(reason) = status {
                    writeln!(f, "{} {}: {}", s.name, stage, reason)?;
                }
            }
        }
        Ok(())
    }
}
