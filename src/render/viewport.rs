use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::PaneKind;

/// Pane widths as last reported by the rendering layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ViewportDimensions {
    pub panes: HashMap<PaneKind, f64>,
}

impl ViewportDimensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, pane: PaneKind, width_px: f64) -> Self {
        self.panes.insert(pane, width_px);
        self
    }

    /// Width of a pane, if it has been measured and is non-zero.
    pub fn width(&self, pane: PaneKind) -> Option<f64> {
        self.panes
            .get(&pane)
            .copied()
            .filter(|width| width.is_finite() && *width > 0.0)
    }

    /// Take newer measurements; panes not mentioned keep their last width.
    pub fn merge(&mut self, update: &ViewportDimensions) {
        for (pane, width) in &update.panes {
            self.panes.insert(*pane, *width);
        }
    }

    pub fn widths_for(&self, panes: &[PaneKind]) -> HashMap<PaneKind, f64> {
        panes
            .iter()
            .filter_map(|pane| self.width(*pane).map(|width| (*pane, width)))
            .collect()
    }
}
