//! Passes run by [`crate::PhysicsSim::step`], in order, once per substep.

pub mod contact;
pub mod integration;
pub mod joint;
