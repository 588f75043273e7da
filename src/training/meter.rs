/// Running average of the training loss
///
/// Exponential moving average with the first observation used as the
/// starting value, so early iterations are not biased toward zero.

/// Running average meter
pub struct RunningAverageMeter {
    momentum: f64,
    val: Option<f64>,
    avg: f64,
}

impl RunningAverageMeter {
    /// Create new meter with the given momentum
    pub fn new(momentum: f64) -> Self {
        Self {
            momentum,
            val: None,
            avg: 0.0,
        }
    }

    /// Record a new observation
    pub fn update(&mut self, val: f64) {
        self.avg = match self.val {
            None => val,
            Some(_) => self.avg * self.momentum + val * (1.0 - self.momentum),
        };
        self.val = Some(val);
    }

    /// Most recent observation, if any
    pub fn val(&self) -> Option<f64> {
        self.val
    }

    /// Current running average
    pub fn avg(&self) -> f64 {
        self.avg
    }

    /// Clear all recorded state
    pub fn reset(&mut self) {
        self.val = None;
        self.avg = 0.0;
    }
}

impl Default for RunningAverageMeter {
    fn default() -> Self {
        Self::new(0.99)
    }
}
