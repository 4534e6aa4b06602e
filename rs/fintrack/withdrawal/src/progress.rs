//! Step lists for rendering the progress of a multi-step chain transaction.
//!
//! The aggregate flags are always recomputed from the whole list, so a step that goes back to
//! an earlier status is reflected immediately.

use crate::session::{WithdrawalSession, WithdrawalStatus, WithdrawalStep};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Loading,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapStep {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: StepStatus,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
}

impl SwapStep {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            status: StepStatus::Pending,
            tx_hash: None,
            error: None,
        }
    }
}

/// The first loading step, else the first pending step.
pub fn current_step(steps: &[SwapStep]) -> Option<&SwapStep> {
    steps
        .iter()
        .find(|step| step.status == StepStatus::Loading)
        .or_else(|| steps.iter().find(|step| step.status == StepStatus::Pending))
}

/// True when there is at least one step and every step succeeded.
pub fn is_completed(steps: &[SwapStep]) -> bool {
    !steps.is_empty() && steps.iter().all(|step| step.status == StepStatus::Success)
}

pub fn has_failed(steps: &[SwapStep]) -> bool {
    steps.iter().any(|step| step.status == StepStatus::Error)
}

/// An ordered step list whose statuses are set independently.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SwapProgress {
    steps: Vec<SwapStep>,
}

impl SwapProgress {
    pub fn new(steps: Vec<SwapStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[SwapStep] {
        &self.steps
    }

    fn step_mut(&mut self, id: &str) -> Option<&mut SwapStep> {
        self.steps.iter_mut().find(|step| step.id == id)
    }

    /// Returns false if no step has this id.
    pub fn set_status(&mut self, id: &str, status: StepStatus) -> bool {
        match self.step_mut(id) {
            Some(step) => {
                step.status = status;
                true
            }
            None => false,
        }
    }

    pub fn set_tx_hash(&mut self, id: &str, tx_hash: impl Into<String>) -> bool {
        match self.step_mut(id) {
            Some(step) => {
                step.tx_hash = Some(tx_hash.into());
                true
            }
            None => false,
        }
    }

    pub fn fail(&mut self, id: &str, error: impl Into<String>) -> bool {
        match self.step_mut(id) {
            Some(step) => {
                step.status = StepStatus::Error;
                step.error = Some(error.into());
                true
            }
            None => false,
        }
    }

    pub fn current_step(&self) -> Option<&SwapStep> {
        current_step(&self.steps)
    }

    pub fn is_completed(&self) -> bool {
        is_completed(&self.steps)
    }

    pub fn has_failed(&self) -> bool {
        has_failed(&self.steps)
    }
}

fn withdrawal_step(step: WithdrawalStep) -> SwapStep {
    match step {
        WithdrawalStep::Approve => SwapStep::new(
            step.to_string(),
            "Approve",
            "Allow the minter to burn the withdrawn amount",
        ),
        WithdrawalStep::Withdraw => SwapStep::new(
            step.to_string(),
            "Withdraw",
            "Burn the tokens and send the native asset to the destination",
        ),
    }
}

/// The `approve` and `withdraw` steps as they stand in `session`.
pub fn steps_for_session(session: &WithdrawalSession) -> Vec<SwapStep> {
    use StepStatus::*;

    let (approve, withdraw) = match session.status() {
        WithdrawalStatus::Idle => (Pending, Pending),
        WithdrawalStatus::Approving => (Loading, Pending),
        WithdrawalStatus::Withdrawing => (Success, Loading),
        WithdrawalStatus::Success => (Success, Success),
        WithdrawalStatus::Error => match session.error().map(|failure| failure.step) {
            Some(WithdrawalStep::Approve) | None => (Error, Pending),
            Some(WithdrawalStep::Withdraw) => (Success, Error),
        },
    };
    let mut progress = SwapProgress::new(vec![
        withdrawal_step(WithdrawalStep::Approve),
        withdrawal_step(WithdrawalStep::Withdraw),
    ]);
    progress.set_status("approve", approve);
    progress.set_status("withdraw", withdraw);
    if let Some(failure) = session.error() {
        progress.fail(&failure.step.to_string(), failure.to_string());
    }
    if let Some(id) = session.id() {
        progress.set_tx_hash("withdraw", id);
    }
    progress.steps
}
