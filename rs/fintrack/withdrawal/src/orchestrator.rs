use crate::flow::WithdrawalFlow;
use crate::session::{StepFailure, WithdrawalSession, WithdrawalStatus, WithdrawalStep};
use candid::Nat;
use fintrack_ledger_types::tokens::{parse_base_units, AmountParseError};
use fintrack_ledger_types::ErrorKind;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvalidWithdrawal {
    #[error("destination address is empty")]
    EmptyDestination,
    #[error("withdrawal amount must be greater than zero")]
    ZeroAmount,
    #[error("invalid amount: {0}")]
    Amount(#[from] AmountParseError),
}

/// A checked withdrawal: a non-empty destination and a positive amount in base units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawalRequest {
    destination: String,
    amount: Nat,
}

impl WithdrawalRequest {
    pub fn new(destination: &str, amount: Nat) -> Result<Self, InvalidWithdrawal> {
        let destination = destination.trim();
        if destination.is_empty() {
            return Err(InvalidWithdrawal::EmptyDestination);
        }
        if amount == 0_u64 {
            return Err(InvalidWithdrawal::ZeroAmount);
        }
        Ok(Self {
            destination: destination.to_string(),
            amount,
        })
    }

    /// Builds a request from raw user text. The amount must already be in base units.
    pub fn parse(destination: &str, amount: &str) -> Result<Self, InvalidWithdrawal> {
        let amount = parse_base_units(amount)?;
        Self::new(destination, amount)
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn amount(&self) -> &Nat {
        &self.amount
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WithdrawError {
    #[error(transparent)]
    Invalid(#[from] InvalidWithdrawal),
    #[error("a withdrawal can only start from idle, current status is {0}")]
    NotIdle(WithdrawalStatus),
    #[error(transparent)]
    Failed(StepFailure),
    /// `id` is set when the minter accepted the withdrawal after the session was left behind.
    #[error(
        "the withdrawal session was abandoned before the {step} step completed{}",
        .id.as_ref().map(|accepted| format!(", the minter still accepted it as {accepted}")).unwrap_or_default()
    )]
    Abandoned {
        step: WithdrawalStep,
        id: Option<String>,
    },
}

impl WithdrawError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid(_) | Self::NotIdle(_) => ErrorKind::Validation,
            Self::Failed(failure) => failure.error.kind(),
            Self::Abandoned { .. } => ErrorKind::Network,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("cannot reset while the session is {0}")]
pub struct ResetError(pub WithdrawalStatus);

struct State {
    session: WithdrawalSession,
    next_generation: u64,
}

impl State {
    fn replace_session(&mut self) -> &WithdrawalSession {
        self.session = WithdrawalSession::new(self.next_generation);
        self.next_generation += 1;
        &self.session
    }
}

/// Drives one withdrawal at a time through `idle -> approving -> withdrawing -> success|error`.
///
/// The session lock is never held across an await. After each step the result is applied only
/// if the session is still the one that started the step and still in the expected status;
/// otherwise the result is dropped.
pub struct WithdrawalOrchestrator<F> {
    flow: F,
    state: Mutex<State>,
}

impl<F: WithdrawalFlow> WithdrawalOrchestrator<F> {
    pub fn new(flow: F) -> Self {
        Self {
            flow,
            state: Mutex::new(State {
                session: WithdrawalSession::new(0),
                next_generation: 1,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// A snapshot of the current session.
    pub fn session(&self) -> WithdrawalSession {
        self.lock().session.clone()
    }

    pub async fn withdraw(&self, destination: &str, amount: Nat) -> Result<String, WithdrawError> {
        let request = WithdrawalRequest::new(destination, amount)?;
        self.execute(request).await
    }

    pub async fn execute(&self, request: WithdrawalRequest) -> Result<String, WithdrawError> {
        let generation = {
            let mut state = self.lock();
            let status = state.session.status();
            if status != WithdrawalStatus::Idle {
                warn!(%status, "rejecting withdrawal, session is not idle");
                return Err(WithdrawError::NotIdle(status));
            }
            state.session.start();
            state.session.generation()
        };
        info!(
            generation,
            destination = request.destination(),
            amount = %request.amount(),
            "approving withdrawal"
        );

        let approval = self.flow.approve(request.amount()).await;
        {
            let mut state = self.lock();
            if !Self::is_current(&state, generation, WithdrawalStatus::Approving) {
                return Err(WithdrawError::Abandoned {
                    step: WithdrawalStep::Approve,
                    id: None,
                });
            }
            if let Err(err) = approval {
                let failure = StepFailure {
                    step: WithdrawalStep::Approve,
                    error: err,
                };
                error!(generation, %failure, "withdrawal failed");
                state.session.fail(failure.clone());
                return Err(WithdrawError::Failed(failure));
            }
            state.session.approved();
        }
        info!(generation, "approval granted, withdrawing");

        let withdrawal = self
            .flow
            .withdraw(request.destination(), request.amount())
            .await;
        let mut state = self.lock();
        if !Self::is_current(&state, generation, WithdrawalStatus::Withdrawing) {
            let id = withdrawal.ok();
            if let Some(id) = &id {
                warn!(generation, %id, "minter accepted the withdrawal of an abandoned session");
            }
            return Err(WithdrawError::Abandoned {
                step: WithdrawalStep::Withdraw,
                id,
            });
        }
        match withdrawal {
            Ok(id) => {
                info!(generation, %id, "withdrawal succeeded");
                state.session.succeed(id.clone());
                Ok(id)
            }
            Err(err) => {
                let failure = StepFailure {
                    step: WithdrawalStep::Withdraw,
                    error: err,
                };
                error!(generation, %failure, "withdrawal failed");
                state.session.fail(failure.clone());
                Err(WithdrawError::Failed(failure))
            }
        }
    }

    fn is_current(state: &State, generation: u64, expected: WithdrawalStatus) -> bool {
        let current = &state.session;
        if current.generation() == generation && current.status() == expected {
            return true;
        }
        warn!(
            generation,
            current_generation = current.generation(),
            status = %current.status(),
            "discarding result of an abandoned withdrawal session"
        );
        false
    }

    /// Starts a fresh idle session after a terminal one. A no-op when idle.
    pub fn reset(&self) -> Result<WithdrawalSession, ResetError> {
        let mut state = self.lock();
        let status = state.session.status();
        if status.is_in_flight() {
            return Err(ResetError(status));
        }
        if status.is_terminal() {
            return Ok(state.replace_session().clone());
        }
        Ok(state.session.clone())
    }

    /// Leaves the current session behind whatever its status. A result arriving later for it
    /// is discarded.
    pub fn abandon(&self) -> WithdrawalSession {
        let mut state = self.lock();
        if state.session.status().is_in_flight() {
            info!(
                generation = state.session.generation(),
                status = %state.session.status(),
                "abandoning in-flight withdrawal"
            );
        }
        state.replace_session().clone()
    }
}
