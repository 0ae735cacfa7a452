/// Tunables for a loaded model's procedural animation.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Seconds between automatic blinks. `None` disables blinking.
    pub eye_blink_interval: Option<f32>,
    pub breath: bool,
    /// Restart the first `Idle` motion whenever nothing else plays.
    pub auto_idle: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            eye_blink_interval: Some(4.0),
            breath: true,
            auto_idle: true,
        }
    }
}

impl BridgeConfig {
    /// No procedural motion at all; parameters only change when the host sets them.
    pub fn still() -> Self {
        Self {
            eye_blink_interval: None,
            breath: false,
            auto_idle: false,
        }
    }
}
