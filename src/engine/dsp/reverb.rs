use std::sync::Arc;

use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use super::smooth::Smooth;
use crate::engine::noise::White;

/// Partition size of the frequency-domain delay line. The wet path carries
/// one partition of latency, which reads as pre-delay.
pub const PARTITION: usize = 256;
const FFT_LEN: usize = 2 * PARTITION;

/// Impulse-response decay time in seconds.
pub const IR_DECAY: f32 = 2.0;

fn partition_ir(fft: &Arc<dyn Fft<f32>>, ir: &[f32]) -> Vec<Vec<Complex32>> {
  ir.chunks(PARTITION)
    .map(|chunk| {
      let mut buf = vec![Complex32::new(0.0, 0.0); FFT_LEN];
      for (i, &s) in chunk.iter().enumerate() {
        buf[i].re = s;
      }
      fft.process(&mut buf);
      buf
    })
    .collect()
}

struct Channel {
  ir: Vec<Vec<Complex32>>,
  // Ring of past input spectra, newest at `head`.
  fdl: Vec<Vec<Complex32>>,
  head: usize,
  input: Vec<f32>,
  output: Vec<f32>,
  overlap: Vec<f32>,
}

impl Channel {
  fn new(fft: &Arc<dyn Fft<f32>>, ir: &[f32]) -> Self {
    let ir = partition_ir(fft, ir);
    let parts = ir.len();
    Self {
      ir,
      fdl: vec![vec![Complex32::new(0.0, 0.0); FFT_LEN]; parts],
      head: 0,
      input: vec![0.0; PARTITION],
      output: vec![0.0; PARTITION],
      overlap: vec![0.0; PARTITION],
    }
  }

  fn process_block(&mut self, fft: &Arc<dyn Fft<f32>>, ifft: &Arc<dyn Fft<f32>>) {
    let parts = self.ir.len();
    self.head = (self.head + parts - 1) % parts;
    let spectrum = &mut self.fdl[self.head];
    for (i, s) in spectrum.iter_mut().enumerate() {
      let x = if i < PARTITION { self.input[i] } else { 0.0 };
      *s = Complex32::new(x, 0.0);
    }
    fft.process(spectrum);

    // Multiply-accumulate every partition against its matching past block.
    let mut acc = vec![Complex32::new(0.0, 0.0); FFT_LEN];
    for (p, ir_spec) in self.ir.iter().enumerate() {
      let past = &self.fdl[(self.head + p) % parts];
      for ((a, &h), &x) in acc.iter_mut().zip(ir_spec.iter()).zip(past.iter()) {
        *a += h * x;
      }
    }
    ifft.process(&mut acc);
    let norm = 1.0 / FFT_LEN as f32;
    for i in 0..PARTITION {
      self.output[i] = acc[i].re * norm + self.overlap[i];
      self.overlap[i] = acc[PARTITION + i].re * norm;
    }
  }
}

/// Partitioned FFT convolution against a synthesized exponentially-decaying
/// noise impulse response. Wet-only send, like the delay.
pub struct ConvolutionReverb {
  fft: Arc<dyn Fft<f32>>,
  ifft: Arc<dyn Fft<f32>>,
  l: Channel,
  r: Channel,
  pos: usize,
  wet: Smooth,
}

impl ConvolutionReverb {
  pub fn new(sr: f32) -> Self {
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FFT_LEN);
    let ifft = planner.plan_fft_inverse(FFT_LEN);
    let ir_l = Self::synthesize_ir(sr, 0x5eed);
    let ir_r = Self::synthesize_ir(sr, 0x7a11);
    let l = Channel::new(&fft, &ir_l);
    let r = Channel::new(&fft, &ir_r);
    Self { fft, ifft, l, r, pos: 0, wet: Smooth::new(sr, 8.0) }
  }

  /// Decorrelated noise burst with an exponential tail: ir[i] = n * e^(-3i/len).
  fn synthesize_ir(sr: f32, seed: u32) -> Vec<f32> {
    let len = ((sr * IR_DECAY) as usize).max(PARTITION);
    let mut noise = White::new(seed);
    let inv = 1.0 / len as f32;
    (0..len).map(|i| noise.next() * (-3.0 * i as f32 * inv).exp()).collect()
  }

  pub fn tick(&mut self, l: f32, r: f32, wet_target: f32) -> (f32, f32) {
    let wet = self.wet.next(wet_target.clamp(0.0, 1.0));
    let out_l = self.l.output[self.pos] * wet;
    let out_r = self.r.output[self.pos] * wet;
    self.l.input[self.pos] = l;
    self.r.input[self.pos] = r;
    self.pos += 1;
    if self.pos == PARTITION {
      self.l.process_block(&self.fft, &self.ifft);
      self.r.process_block(&self.fft, &self.ifft);
      self.pos = 0;
    }
    (out_l, out_r)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn silence_in_silence_out() {
    let mut rv = ConvolutionReverb::new(8000.0);
    for _ in 0..PARTITION * 8 {
      let (l, r) = rv.tick(0.0, 0.0, 1.0);
      assert_eq!(l, 0.0);
      assert_eq!(r, 0.0);
    }
  }

  #[test]
  fn impulse_grows_a_tail() {
    let sr = 8000.0;
    let mut rv = ConvolutionReverb::new(sr);
    rv.tick(1.0, 1.0, 1.0);
    let mut energy = 0.0f64;
    for _ in 0..(sr as usize) / 2 {
      let (l, _) = rv.tick(0.0, 0.0, 1.0);
      energy += (l as f64) * (l as f64);
    }
    assert!(energy > 1e-4, "impulse should excite the tail, got {energy}");
  }

  #[test]
  fn tail_decays_over_time() {
    let sr = 8000.0;
    let mut rv = ConvolutionReverb::new(sr);
    rv.tick(1.0, 1.0, 1.0);
    let window = (sr * 0.25) as usize;
    let mut early = 0.0f64;
    let mut late = 0.0f64;
    for i in 0..window * 6 {
      let (l, _) = rv.tick(0.0, 0.0, 1.0);
      let e = (l as f64) * (l as f64);
      if i < window {
        early += e;
      } else if i >= window * 5 {
        late += e;
      }
    }
    assert!(late < early * 0.25, "tail should decay: early {early}, late {late}");
  }

  #[test]
  fn wet_latency_is_one_partition() {
    let mut rv = ConvolutionReverb::new(8000.0);
    rv.tick(1.0, 1.0, 1.0);
    let mut first = None;
    for i in 1..PARTITION * 3 {
      let (l, _) = rv.tick(0.0, 0.0, 1.0);
      if l.abs() > 1e-6 && first.is_none() {
        first = Some(i);
      }
    }
    let first = first.unwrap_or(usize::MAX);
    assert!(
      (PARTITION..PARTITION * 2).contains(&first),
      "wet onset should land inside the second partition, got {first}"
    );
  }
}
