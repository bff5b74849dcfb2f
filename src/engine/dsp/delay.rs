use super::smooth::Smooth;

/// Feedback coefficient of the send delay. Must stay < 1 or the line
/// self-oscillates.
pub const FEEDBACK: f32 = 0.6;

/// Line time in seconds; only the wet send gain is user-controlled.
pub const DELAY_TIME: f32 = 0.4;

/// Stereo feedback delay used as a send: `tick` consumes the dry signal and
/// returns the wet contribution only.
pub struct FeedbackDelay {
  buf_l: Vec<f32>,
  buf_r: Vec<f32>,
  wr_l: usize,
  wr_r: usize,
  d_l: usize,
  d_r: usize,
  wet: Smooth,
}

impl FeedbackDelay {
  pub fn new(sr: f32) -> Self {
    let d_l = ((DELAY_TIME * sr).round() as usize).max(1);
    // Slightly longer right tap to avoid identical wrap alignment
    let d_r = ((DELAY_TIME * sr * 1.03).round() as usize).max(1);
    Self {
      buf_l: vec![0.0; d_l + 1],
      buf_r: vec![0.0; d_r + 1],
      wr_l: 0,
      wr_r: 0,
      d_l,
      d_r,
      wet: Smooth::new(sr, 8.0),
    }
  }

  #[inline]
  fn read(buf: &[f32], wr: usize, d: usize) -> f32 {
    let len = buf.len();
    buf[(wr + len - d) % len]
  }

  pub fn tick(&mut self, l: f32, r: f32, wet_target: f32) -> (f32, f32) {
    let wet = self.wet.next(wet_target.clamp(0.0, 1.0));
    // read delayed before writing (no instantaneous feedback)
    let yl = Self::read(&self.buf_l, self.wr_l, self.d_l);
    let yr = Self::read(&self.buf_r, self.wr_r, self.d_r);
    self.buf_l[self.wr_l] = l + yl * FEEDBACK;
    self.buf_r[self.wr_r] = r + yr * FEEDBACK;
    self.wr_l += 1;
    if self.wr_l >= self.buf_l.len() {
      self.wr_l = 0;
    }
    self.wr_r += 1;
    if self.wr_r >= self.buf_r.len() {
      self.wr_r = 0;
    }
    (yl * wet, yr * wet)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_echo_arrives_after_line_time() {
    let sr = 1000.0;
    let mut d = FeedbackDelay::new(sr);
    let delay_samples = (DELAY_TIME * sr).round() as usize;
    let (l0, _) = d.tick(1.0, 1.0, 1.0);
    assert_eq!(l0, 0.0, "no wet signal before the line fills");
    let mut first_echo_at = None;
    for i in 1..delay_samples + 8 {
      let (l, _) = d.tick(0.0, 0.0, 1.0);
      if l.abs() > 1e-4 && first_echo_at.is_none() {
        first_echo_at = Some(i);
      }
    }
    assert_eq!(first_echo_at, Some(delay_samples), "echo should land at the tap");
  }

  #[test]
  fn echoes_decay_by_feedback_ratio() {
    let sr = 1000.0;
    let mut d = FeedbackDelay::new(sr);
    let delay_samples = (DELAY_TIME * sr).round() as usize;
    d.tick(1.0, 0.0, 1.0);
    let mut peaks = Vec::new();
    for _ in 0..delay_samples * 3 + 4 {
      let (l, _) = d.tick(0.0, 0.0, 1.0);
      if l.abs() > 1e-4 {
        peaks.push(l);
      }
    }
    assert!(peaks.len() >= 3, "expected at least three echoes, got {}", peaks.len());
    assert!((peaks[1] / peaks[0] - FEEDBACK).abs() < 0.05);
    assert!((peaks[2] / peaks[1] - FEEDBACK).abs() < 0.05);
  }

  #[test]
  fn zero_wet_is_silent_but_line_still_runs() {
    let sr = 1000.0;
    let mut d = FeedbackDelay::new(sr);
    for _ in 0..2000 {
      let (l, r) = d.tick(0.5, -0.5, 0.0);
      assert!(l.abs() < 1e-3 && r.abs() < 1e-3, "wet 0 should stay ~silent");
    }
  }
}
