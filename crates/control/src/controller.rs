use physics::BodyState;
use serde_json::Value;

use crate::error::ControlError;

/// A control law that turns an observation into a horizontal cart force.
///
/// Implementations are stateful (histories, integrators) and are driven from
/// the scheduler thread, one `compute` call per tick.
pub trait Controller: Send {
    /// Force for this tick, or `None` when the law has no opinion and the
    /// next controller in priority order should be asked.
    fn compute(&mut self, state: &BodyState) -> Option<f64>;

    /// Apply a parameter patch.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::InvalidParameters`] or
    /// [`ControlError::Malformed`] when the patch is rejected; the law keeps
    /// its previous parameters in that case.
    fn set_parameters(&mut self, params: &Value) -> Result<(), ControlError>;

    /// Forget accumulated state.
    fn reset(&mut self) {}
}
