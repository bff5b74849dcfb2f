use super::shelf::Shelf;
use super::smooth::Smooth;
use crate::engine::settings::EffectsSpec;

const SHELF_LOW_HZ: f32 = 320.0;
const SHELF_HIGH_HZ: f32 = 3200.0;
const DRIVE: f32 = 3.0;
const COMP_THRESHOLD: f32 = 0.5;
const COMP_RATIO: f32 = 4.0;

#[derive(Clone)]
struct Channel {
  low: Shelf,
  high: Shelf,
  comp_env: f32,
}

impl Channel {
  fn new() -> Self {
    Self { low: Shelf::new(), high: Shelf::new(), comp_env: 0.0 }
  }

  #[inline]
  fn shape(&mut self, x: f32, atk: f32, rel: f32) -> f32 {
    let x = self.low.process(x);
    let x = (x * DRIVE).tanh();
    let x = self.high.process(x);
    // Feed-forward compressor
    let level = x.abs();
    let a = if level > self.comp_env { atk } else { rel };
    self.comp_env += a * (level - self.comp_env);
    let gain = if self.comp_env > COMP_THRESHOLD {
      (COMP_THRESHOLD + (self.comp_env - COMP_THRESHOLD) / COMP_RATIO) / self.comp_env
    } else {
      1.0
    };
    let x = x * gain;
    // Limiter: soft saturation with a hard ceiling of 1
    x.tanh()
  }
}

/// Distortion stage: dry path crossfaded against
/// low shelf -> waveshaper -> high shelf -> compressor -> limiter.
pub struct Distortion {
  sr: f32,
  l: Channel,
  r: Channel,
  mix: Smooth,
  comp_atk: f32,
  comp_rel: f32,
  last_low_db: f32,
  last_high_db: f32,
}

impl Distortion {
  pub fn new(sr: f32) -> Self {
    let mut d = Self {
      sr,
      l: Channel::new(),
      r: Channel::new(),
      mix: Smooth::new(sr, 10.0),
      comp_atk: 1.0 - (-1.0 / (0.003 * sr)).exp(),
      comp_rel: 1.0 - (-1.0 / (0.100 * sr)).exp(),
      last_low_db: f32::NAN,
      last_high_db: f32::NAN,
    };
    d.set_shelves(0.0, 0.0);
    d
  }

  fn set_shelves(&mut self, low_db: f32, high_db: f32) {
    if low_db != self.last_low_db {
      self.l.low.set_low_shelf(self.sr, SHELF_LOW_HZ, low_db);
      self.r.low.set_low_shelf(self.sr, SHELF_LOW_HZ, low_db);
      self.last_low_db = low_db;
    }
    if high_db != self.last_high_db {
      self.l.high.set_high_shelf(self.sr, SHELF_HIGH_HZ, high_db);
      self.r.high.set_high_shelf(self.sr, SHELF_HIGH_HZ, high_db);
      self.last_high_db = high_db;
    }
  }

  pub fn apply(&mut self, fx: &EffectsSpec) {
    self.set_shelves(fx.dist_low_db, fx.dist_high_db);
  }

  /// In-line processing: output already contains the dry/wet crossfade,
  /// `dry = 1 - mix`, `mix = (output_gain/100)^2`.
  pub fn tick(&mut self, l: f32, r: f32, mix_target: f32) -> (f32, f32) {
    let mix = self.mix.next(mix_target.clamp(0.0, 1.0));
    if mix < 1e-4 {
      return (l, r);
    }
    let dry = 1.0 - mix;
    let wl = self.l.shape(l, self.comp_atk, self.comp_rel);
    let wr = self.r.shape(r, self.comp_atk, self.comp_rel);
    (l * dry + wl * mix, r * dry + wr * mix)
  }
}
