//! Test suites for the reconciler.

mod behaviour;
pub(crate) mod support;
