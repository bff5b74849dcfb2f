use std::f32::consts::PI;

/// RBJ shelving biquad, Direct Form I. Used as the distortion stage's
/// pre/post EQ and the reverb's output trim.
#[derive(Clone, Copy)]
pub struct Shelf {
  b0: f32,
  b1: f32,
  b2: f32,
  a1: f32,
  a2: f32,
  z1: f32,
  z2: f32,
}

enum Side {
  Low,
  High,
}

impl Shelf {
  pub fn new() -> Self {
    Self { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0, z1: 0.0, z2: 0.0 }
  }

  pub fn set_low_shelf(&mut self, sr: f32, freq: f32, gain_db: f32) {
    self.set(sr, freq, gain_db, Side::Low);
  }

  pub fn set_high_shelf(&mut self, sr: f32, freq: f32, gain_db: f32) {
    self.set(sr, freq, gain_db, Side::High);
  }

  fn set(&mut self, sr: f32, freq: f32, gain_db: f32, side: Side) {
    // Near-zero gain: bypass
    if gain_db.abs() < 1e-3 {
      self.b0 = 1.0;
      self.b1 = 0.0;
      self.b2 = 0.0;
      self.a1 = 0.0;
      self.a2 = 0.0;
      return;
    }
    let a = 10.0_f32.powf(gain_db / 40.0);
    let w0 = 2.0 * PI * (freq / sr).clamp(0.0, 0.49);
    let cosw0 = w0.cos();
    let sinw0 = w0.sin();
    // Shelf slope S = 1
    let alpha = sinw0 / 2.0 * 2.0_f32.sqrt();
    let beta = 2.0 * a.sqrt() * alpha;
    let (b0, b1, b2, a0, a1, a2) = match side {
      Side::Low => (
        a * ((a + 1.0) - (a - 1.0) * cosw0 + beta),
        2.0 * a * ((a - 1.0) - (a + 1.0) * cosw0),
        a * ((a + 1.0) - (a - 1.0) * cosw0 - beta),
        (a + 1.0) + (a - 1.0) * cosw0 + beta,
        -2.0 * ((a - 1.0) + (a + 1.0) * cosw0),
        (a + 1.0) + (a - 1.0) * cosw0 - beta,
      ),
      Side::High => (
        a * ((a + 1.0) + (a - 1.0) * cosw0 + beta),
        -2.0 * a * ((a - 1.0) + (a + 1.0) * cosw0),
        a * ((a + 1.0) + (a - 1.0) * cosw0 - beta),
        (a + 1.0) - (a - 1.0) * cosw0 + beta,
        2.0 * ((a - 1.0) - (a + 1.0) * cosw0),
        (a + 1.0) - (a - 1.0) * cosw0 - beta,
      ),
    };
    // Normalize
    self.b0 = b0 / a0;
    self.b1 = b1 / a0;
    self.b2 = b2 / a0;
    self.a1 = a1 / a0;
    self.a2 = a2 / a0;
  }

  #[inline]
  pub fn process(&mut self, x: f32) -> f32 {
    let y = self.b0 * x + self.z1;
    self.z1 = self.b1 * x - self.a1 * y + self.z2;
    self.z2 = self.b2 * x - self.a2 * y;
    y
  }
}
