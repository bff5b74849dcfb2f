/// One-pole smoother toward a target. Every audible parameter change in the
/// engine goes through one of these (or a ramp) against the sample clock;
/// instantaneous jumps on gain, cutoff or Q are audible clicks.
#[derive(Clone)]
pub struct Smooth {
  pub y: f32,
  a: f32,
}

impl Smooth {
  pub fn new(sr: f32, ms: f32) -> Self {
    let a = (-1.0 / (ms * 0.001 * sr)).exp();
    Self { y: 0.0, a }
  }
  pub fn with_value(sr: f32, ms: f32, y: f32) -> Self {
    let mut s = Self::new(sr, ms);
    s.y = y;
    s
  }
  /// Jump without smoothing; used only at voice construction, never while
  /// a voice is audible.
  #[inline]
  pub fn snap(&mut self, v: f32) {
    self.y = v;
  }
  #[inline]
  pub fn next(&mut self, target: f32) -> f32 {
    self.y = self.a * self.y + (1.0 - self.a) * target;
    self.y
  }
}

/// Sample-counted linear ramp; drives glide and the envelope's linear
/// segments.
#[derive(Clone)]
pub struct LinearRamp {
  from: f32,
  to: f32,
  dur: usize,
  pos: usize,
}

impl LinearRamp {
  pub fn new(from: f32, to: f32, dur_samples: usize) -> Self {
    Self { from, to, dur: dur_samples.max(1), pos: 0 }
  }
  #[inline]
  pub fn next(&mut self) -> f32 {
    if self.pos >= self.dur {
      return self.to;
    }
    let t = self.pos as f32 / self.dur as f32;
    self.pos += 1;
    self.from + (self.to - self.from) * t
  }
  #[inline]
  pub fn done(&self) -> bool {
    self.pos >= self.dur
  }
  pub fn target(&self) -> f32 {
    self.to
  }
}
