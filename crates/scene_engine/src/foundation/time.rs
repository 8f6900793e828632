//! Time management utilities
//!
//! The scene manager animates against a [`VirtualTimer`]: a millisecond clock
//! that only advances when [`VirtualTimer::tick`] is called and can be
//! stopped, sped up or set explicitly. Tests drive it with `set_time`.

use std::time::Instant;

/// Virtual animation clock in milliseconds
#[derive(Debug)]
pub struct VirtualTimer {
    /// Real time at the last tick
    last_real: Instant,

    /// Current virtual time in milliseconds
    virtual_ms: f64,

    /// Multiplier applied to elapsed real time
    speed: f32,

    /// Number of outstanding `stop` calls
    stop_depth: u32,
}

impl Default for VirtualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualTimer {
    /// Create a running timer starting at 0 ms
    pub fn new() -> Self {
        Self {
            last_real: Instant::now(),
            virtual_ms: 0.0,
            speed: 1.0,
            stop_depth: 0,
        }
    }

    /// Current virtual time in milliseconds
    ///
    /// Wraps like a 32-bit tick counter.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn time_ms(&self) -> u32 {
        (self.virtual_ms as u64 & u64::from(u32::MAX)) as u32
    }

    /// Set the virtual time explicitly
    pub fn set_time(&mut self, time_ms: u32) {
        self.virtual_ms = f64::from(time_ms);
        self.last_real = Instant::now();
    }

    /// Advance virtual time by an explicit amount, ignoring speed and stop state
    pub fn advance(&mut self, delta_ms: u32) {
        self.virtual_ms += f64::from(delta_ms);
    }

    /// Advance virtual time by the real time elapsed since the last tick
    pub fn tick(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_real);
        self.last_real = now;

        if !self.is_stopped() {
            self.virtual_ms += elapsed.as_secs_f64() * 1000.0 * f64::from(self.speed);
        }
    }

    /// Stop the timer; calls nest
    pub fn stop(&mut self) {
        if self.stop_depth == 0 {
            self.tick();
        }
        self.stop_depth += 1;
    }

    /// Undo one `stop` call
    pub fn start(&mut self) {
        if self.stop_depth > 0 {
            self.stop_depth -= 1;
            if self.stop_depth == 0 {
                self.last_real = Instant::now();
            }
        }
    }

    /// Whether the timer is currently stopped
    pub fn is_stopped(&self) -> bool {
        self.stop_depth > 0
    }

    /// Set the speed multiplier (negative values are clamped to zero)
    pub fn set_speed(&mut self, speed: f32) {
        self.tick();
        self.speed = speed.max(0.0);
    }

    /// Get the speed multiplier
    pub fn speed(&self) -> f32 {
        self.speed
    }
}

/// Frame-rate counter fed once per frame
#[derive(Debug)]
pub struct FpsCounter {
    fps: u32,
    frames: u32,
    window_start_ms: u32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    /// Create a counter with no history
    pub fn new() -> Self {
        Self {
            fps: 0,
            frames: 0,
            window_start_ms: 0,
        }
    }

    /// Register a frame at the given time; the rate is recomputed every 1.5 s
    pub fn register_frame(&mut self, now_ms: u32) {
        self.frames += 1;
        let elapsed = now_ms.wrapping_sub(self.window_start_ms);
        if elapsed >= 1500 {
            let rate = f64::from(self.frames) * 1000.0 / f64::from(elapsed);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                self.fps = rate.round() as u32;
            }
            self.frames = 0;
            self.window_start_ms = now_ms;
        }
    }

    /// Last computed frames per second
    pub fn fps(&self) -> u32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_advance() {
        let mut timer = VirtualTimer::new();
        timer.set_time(1000);
        timer.advance(250);
        assert_eq!(timer.time_ms(), 1250);
    }

    #[test]
    fn test_stop_is_nested() {
        let mut timer = VirtualTimer::new();
        timer.stop();
        timer.stop();
        timer.start();
        assert!(timer.is_stopped());
        timer.start();
        assert!(!timer.is_stopped());
    }

    #[test]
    fn test_stopped_timer_does_not_tick() {
        let mut timer = VirtualTimer::new();
        timer.stop();
        timer.set_time(500);
        std::thread::sleep(std::time::Duration::from_millis(5));
        timer.tick();
        assert_eq!(timer.time_ms(), 500);
    }

    #[test]
    fn test_fps_counter() {
        let mut counter = FpsCounter::new();
        for frame in 1..=30 {
            counter.register_frame(frame * 50);
        }
        assert_eq!(counter.fps(), 20);
    }
}
