//! Alert and confirm dialog coordination.
//!
//! Each dialog kind holds at most one visible dialog and one pending
//! completion handle. Presentation code renders the published
//! [`AlertState`]/[`ConfirmState`] records and calls back into the
//! coordinator when the user acts.

mod coordinator;
mod handle;
mod state;

pub use coordinator::{DialogCoordinator, DisplacedPolicy};
pub use handle::{AlertHandle, ConfirmHandle};
pub use state::{AlertOptions, AlertState, ConfirmOptions, ConfirmState, DialogType};
