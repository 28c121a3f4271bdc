//! Command implementations

mod reconcile;

pub use reconcile::run_reconcile;
