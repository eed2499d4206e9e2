use std::collections::HashMap;
use std::hash::Hash;

/// Map a playback ratio onto each pane's cursor overlay.
///
/// Ratios outside `[0, 1]` are clamped; non-finite ratios map to the start.
pub fn sync<K>(progress_ratio: f64, pane_widths: &HashMap<K, f64>) -> HashMap<K, f64>
where
    K: Eq + Hash + Clone,
{
    let ratio = clamp_ratio(progress_ratio);
    pane_widths
        .iter()
        .map(|(pane, width)| (pane.clone(), ratio * width))
        .collect()
}

/// Seek ratio for a click `x_px` pixels from a pane's left edge.
pub fn ratio_from_click(x_px: f64, width_px: f64) -> f64 {
    if width_px <= 0.0 || width_px.is_nan() {
        return 0.0;
    }
    clamp_ratio(x_px / width_px)
}

pub fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}
