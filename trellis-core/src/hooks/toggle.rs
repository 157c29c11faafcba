//! Boolean toggle.

use crate::reactive::{Scope, StateCell};

/// A boolean cell with a `flip` operation.
#[derive(Debug, Clone)]
pub struct Toggle {
    cell: StateCell<bool>,
}

impl Toggle {
    /// A standalone toggle, not owned by any instance.
    pub fn new(initial: bool) -> Self {
        Self::from_cell(StateCell::new(initial))
    }

    pub fn from_cell(cell: StateCell<bool>) -> Self {
        Self { cell }
    }

    /// Invert the logical next value.
    pub fn flip(&self) {
        self.cell.update(|on| !on);
    }

    pub fn set(&self, on: bool) {
        self.cell.set(on);
    }

    /// The committed value.
    pub fn get(&self) -> bool {
        self.cell.get()
    }

    pub fn cell(&self) -> &StateCell<bool> {
        &self.cell
    }
}

/// A toggle owned by the calling instance.
///
/// Returns the value observed by this pass and the handle.
pub fn use_toggle(cx: &mut Scope<'_>, initial: bool) -> (bool, Toggle) {
    let cell = cx.use_state(|| initial);
    (cell.get(), Toggle::from_cell(cell))
}
