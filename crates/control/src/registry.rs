//! # Controller Registry
//!
//! Named control laws in registration order. Registration order is priority
//! order: on every tick the first enabled law that yields a finite force
//! decides the command, and laws after it are not consulted.

use indexmap::IndexMap;
use physics::BodyState;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::controller::Controller;
use crate::error::ControlError;

/// Arbitration result for one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControlCommand {
    /// Id of the controller that produced `force`, `None` when no enabled
    /// controller had an output.
    pub source_id: Option<String>,
    pub force: f64,
}

impl ControlCommand {
    /// No controller spoke this tick.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }
}

struct Entry {
    enabled: bool,
    controller: Box<dyn Controller>,
}

#[derive(Default)]
pub struct ControllerRegistry {
    entries: IndexMap<String, Entry>,
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(id, e)| (id, e.enabled)))
            .finish()
    }
}

impl ControllerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a law under `id`, after every law already present.
    ///
    /// # Errors
    ///
    /// [`ControlError::DuplicateController`] if `id` is taken; use
    /// [`Self::replace_controller`] to overwrite.
    pub fn add_controller(
        &mut self,
        id: impl Into<String>,
        controller: Box<dyn Controller>,
        enabled: bool,
    ) -> Result<(), ControlError> {
        let id = id.into();
        if self.entries.contains_key(&id) {
            return Err(ControlError::DuplicateController(id));
        }
        info!(controller = %id, enabled, "controller registered");
        self.entries.insert(id, Entry { enabled, controller });
        Ok(())
    }

    /// Swap the law stored under `id`, keeping its position and enabled
    /// flag. Registers it (disabled) at the end when `id` is new.
    ///
    /// Returns the previous law, if any.
    pub fn replace_controller(
        &mut self,
        id: impl Into<String>,
        controller: Box<dyn Controller>,
    ) -> Option<Box<dyn Controller>> {
        let id = id.into();
        if let Some(entry) = self.entries.get_mut(&id) {
            info!(controller = %id, "controller replaced");
            return Some(std::mem::replace(&mut entry.controller, controller));
        }
        info!(controller = %id, enabled = false, "controller registered");
        self.entries.insert(
            id,
            Entry {
                enabled: false,
                controller,
            },
        );
        None
    }

    /// # Errors
    ///
    /// [`ControlError::UnknownController`] if nothing is registered as `id`.
    pub fn enable_controller(&mut self, id: &str, enabled: bool) -> Result<(), ControlError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| ControlError::UnknownController(id.to_owned()))?;
        if entry.enabled != enabled {
            info!(controller = %id, enabled, "controller toggled");
        }
        entry.enabled = enabled;
        Ok(())
    }

    /// Forward a parameter patch to the law registered as `id`.
    ///
    /// # Errors
    ///
    /// [`ControlError::UnknownController`] for an unknown id, otherwise
    /// whatever the law's own setter reports.
    pub fn set_parameters(&mut self, id: &str, params: &Value) -> Result<(), ControlError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| ControlError::UnknownController(id.to_owned()))?;
        entry.controller.set_parameters(params)?;
        debug!(controller = %id, %params, "parameters updated");
        Ok(())
    }

    /// Pick this tick's force. The first enabled law, in registration order,
    /// returning a finite value wins.
    pub fn compute_control(&mut self, state: &BodyState) -> ControlCommand {
        for (id, entry) in &mut self.entries {
            if !entry.enabled {
                continue;
            }
            match entry.controller.compute(state) {
                Some(force) if force.is_finite() => {
                    return ControlCommand {
                        source_id: Some(id.clone()),
                        force,
                    };
                }
                Some(force) => warn!(controller = %id, force, "ignoring non-finite output"),
                None => {}
            }
        }
        ControlCommand::idle()
    }

    /// Clear the accumulated state of every law.
    pub fn reset(&mut self) {
        for entry in self.entries.values_mut() {
            entry.controller.reset();
        }
    }

    #[must_use]
    pub fn is_enabled(&self, id: &str) -> Option<bool> {
        self.entries.get(id).map(|e| e.enabled)
    }

    /// Registered ids in priority order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<f64>);

    impl Controller for Fixed {
        fn compute(&mut self, _: &BodyState) -> Option<f64> {
            self.0
        }

        fn set_parameters(&mut self, params: &Value) -> Result<(), ControlError> {
            self.0 = params.as_f64();
            Ok(())
        }
    }

    fn registry(specs: &[(&str, bool, Option<f64>)]) -> ControllerRegistry {
        let mut r = ControllerRegistry::new();
        for &(id, enabled, out) in specs {
            r.add_controller(id, Box::new(Fixed(out)), enabled).unwrap();
        }
        r
    }

    #[test]
    fn first_enabled_wins() {
        let mut r = registry(&[("a", false, Some(1.0)), ("b", true, Some(3.0)), ("c", true, Some(5.0))]);
        let cmd = r.compute_control(&BodyState::default());
        assert_eq!(cmd, ControlCommand { source_id: Some("b".into()), force: 3.0 });
    }

    #[test]
    fn all_disabled_is_idle() {
        let mut r = registry(&[("a", false, Some(1.0)), ("b", false, Some(3.0))]);
        assert_eq!(r.compute_control(&BodyState::default()), ControlCommand::idle());
        assert_eq!(ControlCommand::idle().source_id, None);
    }

    #[test]
    fn silent_and_non_finite_outputs_fall_through() {
        let mut r = registry(&[("a", true, None), ("b", true, Some(f64::NAN)), ("c", true, Some(-2.0))]);
        let cmd = r.compute_control(&BodyState::default());
        assert_eq!(cmd.source_id.as_deref(), Some("c"));
        assert_eq!(cmd.force, -2.0);
    }

    #[test]
    fn enable_controller_uses_the_flag() {
        let mut r = registry(&[("a", true, Some(1.0))]);
        r.enable_controller("a", false).unwrap();
        assert_eq!(r.is_enabled("a"), Some(false));
        assert_eq!(r.compute_control(&BodyState::default()), ControlCommand::idle());
        r.enable_controller("a", true).unwrap();
        assert_eq!(r.is_enabled("a"), Some(true));
    }

    #[test]
    fn duplicate_and_unknown_ids_are_errors() {
        let mut r = registry(&[("a", true, None)]);
        assert!(matches!(
            r.add_controller("a", Box::new(Fixed(None)), true),
            Err(ControlError::DuplicateController(id)) if id == "a"
        ));
        assert!(matches!(r.enable_controller("zz", true), Err(ControlError::UnknownController(_))));
        assert!(matches!(
            r.set_parameters("zz", &Value::Null),
            Err(ControlError::UnknownController(_))
        ));
    }

    #[test]
    fn replace_keeps_position_and_flag() {
        let mut r = registry(&[("a", true, Some(1.0)), ("b", true, Some(2.0))]);
        assert!(r.replace_controller("a", Box::new(Fixed(Some(7.0)))).is_some());
        assert_eq!(r.ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(r.compute_control(&BodyState::default()).force, 7.0);

        assert!(r.replace_controller("c", Box::new(Fixed(Some(9.0)))).is_none());
        assert_eq!(r.is_enabled("c"), Some(false));
        assert_eq!(r.len(), 3);
    }
}
