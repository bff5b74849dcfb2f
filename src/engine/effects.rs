use super::dsp::delay::FeedbackDelay;
use super::dsp::distortion::Distortion;
use super::dsp::reverb::ConvolutionReverb;
use super::dsp::shelf::Shelf;
use super::settings::EffectsSpec;

/// Master effects chain. Voices sum into the distortion in line; the delay
/// and reverb hang off the distorted bus as wet-only sends.
pub struct EffectsChain {
  sr: f32,
  distortion: Distortion,
  delay: FeedbackDelay,
  reverb: ConvolutionReverb,
  reverb_trim_l: Shelf,
  reverb_trim_r: Shelf,
  dist_mix: f32,
  delay_send: f32,
  reverb_send: f32,
  trim_db: f32,
}

impl EffectsChain {
  pub fn new(sr: f32) -> Self {
    Self {
      sr,
      distortion: Distortion::new(sr),
      delay: FeedbackDelay::new(sr),
      reverb: ConvolutionReverb::new(sr),
      reverb_trim_l: Shelf::new(),
      reverb_trim_r: Shelf::new(),
      dist_mix: 0.0,
      delay_send: 0.0,
      reverb_send: 0.0,
      trim_db: 0.0,
    }
  }

  pub fn apply(&mut self, fx: &EffectsSpec) {
    self.dist_mix = fx.distortion_mix();
    self.delay_send = fx.delay_send();
    self.reverb_send = fx.reverb_send();
    self.distortion.apply(fx);
    if fx.reverb_low_db != self.trim_db {
      self.reverb_trim_l.set_low_shelf(self.sr, 250.0, fx.reverb_low_db);
      self.reverb_trim_r.set_low_shelf(self.sr, 250.0, fx.reverb_low_db);
      self.trim_db = fx.reverb_low_db;
    }
  }

  #[inline]
  pub fn process(&mut self, l: f32, r: f32) -> (f32, f32) {
    let (l, r) = self.distortion.tick(l, r, self.dist_mix);
    let (dl, dr) = self.delay.tick(l, r, self.delay_send);
    let (rl, rr) = self.reverb.tick(l, r, self.reverb_send);
    let rl = self.reverb_trim_l.process(rl);
    let rr = self.reverb_trim_r.process(rr);
    (l + dl + rl, r + dr + rr)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::f32::consts::TAU;

  fn neutral() -> EffectsSpec {
    EffectsSpec {
      reverb: 0.0,
      delay: 0.0,
      distortion: 0.0,
      dist_low_db: 0.0,
      dist_high_db: 0.0,
      reverb_low_db: 0.0,
    }
  }

  #[test]
  fn neutral_chain_passes_dry_signal() {
    let mut fx = EffectsChain::new(8000.0);
    fx.apply(&neutral());
    for i in 0..8000 {
      let x = (TAU * 220.0 * i as f32 / 8000.0).sin() * 0.5;
      let (l, r) = fx.process(x, x);
      assert!((l - x).abs() < 1e-3, "dry-only chain should be transparent");
      assert!((r - x).abs() < 1e-3);
    }
  }

  #[test]
  fn delay_send_adds_echo_energy() {
    let sr = 8000.0;
    let mut dry = EffectsChain::new(sr);
    dry.apply(&neutral());
    let mut wet = EffectsChain::new(sr);
    wet.apply(&EffectsSpec { delay: 100.0, ..neutral() });
    let mut e_dry = 0.0f64;
    let mut e_wet = 0.0f64;
    // one burst, then silence long enough for the first echo
    for i in 0..(sr * 0.8) as usize {
      let x = if i < 400 { (TAU * 220.0 * i as f32 / sr).sin() } else { 0.0 };
      let (l, _) = dry.process(x, x);
      e_dry += (l as f64) * (l as f64);
      let (l, _) = wet.process(x, x);
      e_wet += (l as f64) * (l as f64);
    }
    assert!(e_wet > e_dry * 1.2, "delay send should add energy: {e_wet} vs {e_dry}");
  }

  #[test]
  fn reverb_send_leaves_a_tail() {
    let sr = 8000.0;
    let mut fx = EffectsChain::new(sr);
    fx.apply(&EffectsSpec { reverb: 80.0, ..neutral() });
    for i in 0..800 {
      let x = (TAU * 220.0 * i as f32 / sr).sin();
      fx.process(x, x);
    }
    let mut tail = 0.0f64;
    for _ in 0..4000 {
      let (l, _) = fx.process(0.0, 0.0);
      tail += (l as f64) * (l as f64);
    }
    assert!(tail > 1e-5, "reverb should ring after the input stops, got {tail}");
  }
}
