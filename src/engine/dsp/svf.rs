use std::f32::consts::PI;

use crate::engine::settings::FilterKind;

/// Outputs of one SVF step; the caller picks the response it wants.
#[derive(Clone, Copy)]
pub struct SvfFrame {
  pub lp: f32,
  pub hp: f32,
  pub bp: f32,
  pub notch: f32,
}

impl SvfFrame {
  #[inline]
  pub fn select(&self, kind: FilterKind) -> f32 {
    match kind {
      FilterKind::Lowpass => self.lp,
      FilterKind::Highpass => self.hp,
      FilterKind::Bandpass => self.bp,
      FilterKind::Notch => self.notch,
    }
  }
}

/// Chamberlin-style state variable filter, all four responses per step.
#[derive(Clone)]
pub struct Svf {
  ic1eq: f32,
  ic2eq: f32,
  g: f32,
  k: f32,
}

impl Svf {
  pub fn new() -> Self {
    Self { ic1eq: 0.0, ic2eq: 0.0, g: 0.1, k: 0.5 }
  }

  pub fn set_params(&mut self, cutoff: f32, q: f32, sr: f32) {
    let g = (PI * (cutoff / sr).clamp(0.0001, 0.49)).tan();
    self.g = g;
    self.k = 1.0 / q.max(0.001);
  }

  #[inline]
  pub fn process(&mut self, x: f32) -> SvfFrame {
    let g = self.g;
    let k = self.k;
    let v0 = x;
    let v1 = (self.ic1eq + g * (v0 - self.ic2eq)) / (1.0 + g * (g + k));
    let v2 = self.ic2eq + g * v1;
    self.ic1eq = 2.0 * v1 - self.ic1eq;
    self.ic2eq = 2.0 * v2 - self.ic2eq;
    let lp = v2;
    let bp = v1;
    let hp = v0 - k * bp - lp;
    let notch = hp + lp;
    SvfFrame { lp, hp, bp, notch }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::f32::consts::TAU;

  fn rms_through(kind: FilterKind, cutoff: f32, tone_hz: f32) -> f32 {
    let sr = 44_100.0;
    let mut f = Svf::new();
    f.set_params(cutoff, 0.707, sr);
    let mut acc = 0.0f64;
    let n = 44_100;
    for i in 0..n {
      let x = (TAU * tone_hz * i as f32 / sr).sin();
      let y = f.process(x).select(kind);
      if i > n / 2 {
        acc += (y as f64) * (y as f64);
      }
    }
    ((acc / (n / 2) as f64).sqrt()) as f32
  }

  #[test]
  fn lowpass_attenuates_above_cutoff() {
    let pass = rms_through(FilterKind::Lowpass, 1000.0, 100.0);
    let stop = rms_through(FilterKind::Lowpass, 1000.0, 10_000.0);
    assert!(stop < pass * 0.2, "10k should be well below 100Hz: {stop} vs {pass}");
  }

  #[test]
  fn highpass_attenuates_below_cutoff() {
    let pass = rms_through(FilterKind::Highpass, 1000.0, 10_000.0);
    let stop = rms_through(FilterKind::Highpass, 1000.0, 100.0);
    assert!(stop < pass * 0.2, "100Hz should be well below 10k: {stop} vs {pass}");
  }

  #[test]
  fn notch_rejects_center() {
    let center = rms_through(FilterKind::Notch, 1000.0, 1000.0);
    let off = rms_through(FilterKind::Notch, 1000.0, 100.0);
    assert!(center < off * 0.5, "notch center should dip: {center} vs {off}");
  }

  #[test]
  fn bandpass_peaks_at_center() {
    let center = rms_through(FilterKind::Bandpass, 1000.0, 1000.0);
    let off = rms_through(FilterKind::Bandpass, 1000.0, 8000.0);
    assert!(center > off, "bandpass should favor its center: {center} vs {off}");
  }
}
