//! Wheel speed desaturation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;

use super::ModuleState;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Scale the module speeds so that none exceed `max_speed_ms`.
///
/// All speeds are scaled by the same factor so the ratios between modules,
/// and therefore the direction the chassis travels in, are kept. Angles are
/// not changed. If no module is over the limit the states are left alone.
///
/// Returns `true` if the speeds were scaled.
pub fn desaturate(states: &mut [ModuleState], max_speed_ms: f64) -> bool {
    let fastest_ms = states
        .iter()
        .map(|s| s.speed_ms.abs())
        .fold(0.0, f64::max);

    if fastest_ms <= max_speed_ms {
        return false;
    }

    let scale = max_speed_ms / fastest_ms;

    debug!(
        "Desaturating module speeds, fastest {:.3} m/s, scale {:.3}",
        fastest_ms, scale
    );

    // Clamp absorbs rounding so a second pass is always a no-op
    for s in states.iter_mut() {
        s.speed_ms = (s.speed_ms * scale).max(-max_speed_ms).min(max_speed_ms);
    }

    true
}
