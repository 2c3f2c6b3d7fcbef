//! The seam between the HTTP endpoint and whatever runs the turn.

use async_trait::async_trait;
use parley_core::{Activity, BotResult, CancellationToken, InvokeResponse, TurnId};

/// Outcome of one turn, as the endpoint needs it.
#[derive(Debug)]
pub struct ProcessedTurn {
    /// Id the turn ran under, when one was assigned.
    pub turn_id: Option<TurnId>,
    /// `Some` for invoke activities answered through the invoke path.
    pub result: BotResult<Option<InvokeResponse>>,
}

impl ProcessedTurn {
    /// Wraps a result with no turn id.
    #[must_use]
    pub const fn anonymous(result: BotResult<Option<InvokeResponse>>) -> Self {
        Self {
            turn_id: None,
            result,
        }
    }
}

/// Runs one turn for a deserialized activity.
///
/// `cancel` is cancelled when the endpoint gives up on the turn.
#[async_trait]
pub trait TurnProcessor: Send + Sync + 'static {
    /// Processes `activity` to completion.
    async fn process_turn(&self, activity: Activity, cancel: CancellationToken) -> ProcessedTurn;
}
