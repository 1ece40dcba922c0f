use tokio_util::sync::CancellationToken;

use crate::descriptor::EntityName;
use crate::errors::HookError;

/// What a post-stage hook sees once an entity's stage has completed.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub entity: &'a EntityName,
    /// Rows inserted by this stage.
    pub inserted: u64,
    /// Rows in the entity after the stage.
    pub total: u64,
    /// The run's cancellation token. Cancelling it stops the run before the next attempt.
    pub cancel: &'a CancellationToken,
}

/// Caller callback run after an entity reaches its minimum count.
pub trait StageHook: Send + Sync {
    fn after_stage(&self, ctx: &HookContext<'_>) -> Result<(), HookError>;
}

/// Adapts a closure into a [`StageHook`].
pub struct FnHook<F>(pub F);

impl<F> StageHook for FnHook<F>
where
    F: Fn(&HookContext<'_>) -> Result<(), HookError> + Send + Sync,
{
    fn after_stage(&self, ctx: &HookContext<'_>) -> Result<(), HookError> {
        (self.0)(ctx)
    }
}
