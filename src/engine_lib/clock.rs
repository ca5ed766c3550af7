// src/engine_lib/clock.rs

/// Milliseconds on a monotonic timeline. `std::time::Instant` is not
/// available in the browser, so wasm reads `performance.now()` instead.
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    ORIGIN.get_or_init(Instant::now).elapsed().as_secs_f64() * 1000.0
}

#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

/// Frame-to-frame delta tracking.
#[derive(Debug, Default, Clone)]
pub struct Clock {
    last_ms: Option<f64>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick; zero on the first one.
    pub fn tick_at(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) if now_ms > last => (now_ms - last) / 1000.0,
            _ => 0.0,
        };
        self.last_ms = Some(now_ms);
        dt as f32
    }

    pub fn tick(&mut self) -> f32 {
        self.tick_at(now_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_are_monotonic() {
        let mut clock = Clock::new();
        assert_eq!(clock.tick_at(1000.0), 0.0);
        assert!((clock.tick_at(1016.0) - 0.016).abs() < 1e-6);
        // A clock that steps backwards yields a zero delta, never negative.
        assert_eq!(clock.tick_at(900.0), 0.0);
    }

    #[test]
    fn native_time_moves_forward() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
    }
}
