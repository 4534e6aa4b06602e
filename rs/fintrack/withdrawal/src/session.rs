use crate::flow::FlowError;
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum WithdrawalStatus {
    Idle,
    Approving,
    Withdrawing,
    Success,
    Error,
}

impl WithdrawalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Approving | Self::Withdrawing)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum WithdrawalStep {
    Approve,
    Withdraw,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{step} step failed: {error}")]
pub struct StepFailure {
    pub step: WithdrawalStep,
    pub error: FlowError,
}

/// One attempt at a withdrawal.
///
/// Every session has its own `generation`; a session that reached a terminal state is replaced,
/// never reused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawalSession {
    generation: u64,
    status: WithdrawalStatus,
    id: Option<String>,
    error: Option<StepFailure>,
}

impl WithdrawalSession {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            generation,
            status: WithdrawalStatus::Idle,
            id: None,
            error: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn status(&self) -> WithdrawalStatus {
        self.status
    }

    /// Identifier of the completed withdrawal.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn error(&self) -> Option<&StepFailure> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    pub(crate) fn start(&mut self) {
        self.status = WithdrawalStatus::Approving;
    }

    pub(crate) fn approved(&mut self) {
        self.status = WithdrawalStatus::Withdrawing;
    }

    pub(crate) fn succeed(&mut self, id: String) {
        self.status = WithdrawalStatus::Success;
        self.id = Some(id);
    }

    pub(crate) fn fail(&mut self, failure: StepFailure) {
        self.status = WithdrawalStatus::Error;
        self.error = Some(failure);
    }
}
