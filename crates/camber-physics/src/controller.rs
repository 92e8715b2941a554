//! Gameplay controllers driven by the step.

use crate::world::PhysicsWorld;

/// A controller updated once per step, before bodies integrate.
///
/// Vehicle and character drivers live behind this trait: they read body
/// state and accumulate forces for the coming integration.
pub trait Controller: Send {
    /// Whether the controller participates this step.
    fn enabled(&self) -> bool {
        true
    }

    /// Runs once per simulation step.
    fn update(&mut self, world: &mut PhysicsWorld, dt: f32);
}
