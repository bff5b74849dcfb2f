use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseColor {
  White,
  Pink,
}

// xorshift32, reseeded per generator for stability.
#[derive(Clone)]
struct Rng(u32);

impl Rng {
  fn new(seed: u32) -> Self {
    Self(seed.wrapping_mul(747796405).wrapping_add(2891336453) | 1)
  }
  #[inline]
  fn next_unit(&mut self) -> f32 {
    let mut x = self.0;
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    self.0 = x;
    ((x as f32) * 2.3283064365e-10) * 2.0 - 1.0
  }
}

/// Uniform white noise in [-1, 1].
#[derive(Clone)]
pub struct White {
  rng: Rng,
}

impl White {
  pub fn new(seed: u32) -> Self {
    Self { rng: Rng::new(seed) }
  }
  #[inline]
  pub fn next(&mut self) -> f32 {
    self.rng.next_unit()
  }
}

/// 1/f noise via a fixed 7-pole recursive filter over white input
/// (Paul Kellet's economy pinking filter). The coefficients are part of the
/// sound; do not retune them.
#[derive(Clone)]
pub struct Pink {
  rng: Rng,
  b: [f32; 7],
}

impl Pink {
  pub fn new(seed: u32) -> Self {
    Self { rng: Rng::new(seed), b: [0.0; 7] }
  }
  #[inline]
  pub fn next(&mut self) -> f32 {
    let w = self.rng.next_unit();
    let b = &mut self.b;
    b[0] = 0.99886 * b[0] + w * 0.0555179;
    b[1] = 0.99332 * b[1] + w * 0.0750759;
    b[2] = 0.969 * b[2] + w * 0.1538520;
    b[3] = 0.8665 * b[3] + w * 0.3104856;
    b[4] = 0.55 * b[4] + w * 0.5329522;
    b[5] = -0.7616 * b[5] - w * 0.0168980;
    let out = (b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + w * 0.5362) * 0.11;
    b[6] = w * 0.115926;
    out
  }
}

/// Either color behind one call site; voices hold one per noise branch.
#[derive(Clone)]
pub enum NoiseSource {
  White(White),
  Pink(Pink),
}

impl NoiseSource {
  pub fn new(color: NoiseColor, seed: u32) -> Self {
    match color {
      NoiseColor::White => NoiseSource::White(White::new(seed)),
      NoiseColor::Pink => NoiseSource::Pink(Pink::new(seed)),
    }
  }
  #[inline]
  pub fn next(&mut self) -> f32 {
    match self {
      NoiseSource::White(w) => w.next(),
      NoiseSource::Pink(p) => p.next(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn white_stays_in_range() {
    let mut w = White::new(7);
    for _ in 0..48_000 {
      let s = w.next();
      assert!((-1.0..=1.0).contains(&s), "white sample out of range: {s}");
    }
  }

  #[test]
  fn white_is_not_constant() {
    let mut w = White::new(42);
    let first = w.next();
    assert!((0..1000).any(|_| (w.next() - first).abs() > 1e-3));
  }

  #[test]
  fn pink_is_bounded_and_nonsilent() {
    let mut p = Pink::new(9);
    let mut energy = 0.0f64;
    for _ in 0..48_000 {
      let s = p.next();
      assert!(s.abs() < 1.5, "pink sample blew up: {s}");
      energy += (s as f64) * (s as f64);
    }
    assert!(energy > 1.0, "pink output should carry energy, got {energy}");
  }

  #[test]
  fn pink_rolls_off_high_frequencies() {
    // Crude spectral tilt check: pink noise has far less sample-to-sample
    // difference energy than white noise at equal total energy.
    let mut w = White::new(3);
    let mut p = Pink::new(3);
    let (mut dw, mut dp, mut ew, mut ep) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    let (mut lw, mut lp) = (0.0f32, 0.0f32);
    for _ in 0..48_000 {
      let sw = w.next();
      let sp = p.next();
      dw += ((sw - lw) as f64).powi(2);
      dp += ((sp - lp) as f64).powi(2);
      ew += (sw as f64).powi(2);
      ep += (sp as f64).powi(2);
      lw = sw;
      lp = sp;
    }
    let tilt_white = dw / ew;
    let tilt_pink = dp / ep;
    assert!(
      tilt_pink < tilt_white * 0.5,
      "pink should be darker than white: {tilt_pink} vs {tilt_white}"
    );
  }

  #[test]
  fn seeds_decorrelate_generators() {
    let mut a = White::new(1);
    let mut b = White::new(2);
    assert!((0..64).any(|_| (a.next() - b.next()).abs() > 1e-6));
  }
}
