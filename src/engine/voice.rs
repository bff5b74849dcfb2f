use std::f32::consts::{FRAC_PI_4, TAU};

use super::dsp::smooth::{LinearRamp, Smooth};
use super::dsp::svf::Svf;
use super::noise::NoiseSource;
use super::settings::{
  EnvelopeSpec, FilterKind, NoiseSpec, OscillatorSpec, Settings, Waveform,
};
use super::tuning::range_multiplier;

/// Release tail never decays past this; below it the voice is inaudible and
/// safe to reap.
const ENV_FLOOR: f32 = 0.001;

/// Extra gain on the bandpass response, which loses most of the signal's
/// energy by construction.
const BANDPASS_MAKEUP: f32 = 4.0;

const MOD_SMOOTH_MS: f32 = 10.0;

#[derive(Clone, Copy, PartialEq)]
enum EnvStage {
  Attack,
  Decay,
  Sustain,
  Release,
  Done,
}

/// ADSR with linear attack/decay and an exponential release toward
/// `ENV_FLOOR`.
#[derive(Clone)]
struct Env {
  sr: f32,
  stage: EnvStage,
  level: f32,
  atk_step: f32,
  dec_step: f32,
  sustain: f32,
  rel_factor: f32,
  release_s: f32,
}

impl Env {
  fn new(sr: f32, spec: &EnvelopeSpec) -> Self {
    let mut env = Self {
      sr,
      stage: EnvStage::Attack,
      level: 0.0,
      atk_step: 0.0,
      dec_step: 0.0,
      sustain: spec.sustain,
      rel_factor: 1.0,
      release_s: spec.release,
    };
    env.set(spec);
    env
  }

  fn set(&mut self, spec: &EnvelopeSpec) {
    self.atk_step = 1.0 / (spec.attack * self.sr).max(1.0);
    self.dec_step = (1.0 - spec.sustain) / (spec.decay * self.sr).max(1.0);
    self.sustain = spec.sustain.clamp(0.0, 1.0);
    self.release_s = spec.release;
  }

  fn release(&mut self) {
    let n = (self.release_s * self.sr).max(1.0);
    self.rel_factor = (ENV_FLOOR / self.level.max(ENV_FLOOR)).powf(1.0 / n);
    self.stage = EnvStage::Release;
  }

  #[inline]
  fn next(&mut self) -> f32 {
    match self.stage {
      EnvStage::Attack => {
        self.level += self.atk_step;
        if self.level >= 1.0 {
          self.level = 1.0;
          self.stage = EnvStage::Decay;
        }
      }
      EnvStage::Decay => {
        self.level -= self.dec_step;
        if self.level <= self.sustain {
          self.level = self.sustain;
          self.stage = EnvStage::Sustain;
        }
      }
      EnvStage::Sustain => self.level = self.sustain,
      EnvStage::Release => {
        self.level *= self.rel_factor;
        if self.level <= ENV_FLOOR {
          self.level = 0.0;
          self.stage = EnvStage::Done;
        }
      }
      EnvStage::Done => self.level = 0.0,
    }
    self.level
  }

  fn is_done(&self) -> bool {
    self.stage == EnvStage::Done
  }
}

#[derive(Clone)]
struct Osc {
  waveform: Waveform,
  phase: f32,
}

impl Osc {
  fn new(waveform: Waveform) -> Self {
    Self { waveform, phase: 0.0 }
  }

  #[inline]
  fn next(&mut self, freq: f32, sr: f32) -> f32 {
    self.phase += freq / sr;
    if self.phase >= 1.0 {
      self.phase -= 1.0;
    }
    let p = self.phase;
    match self.waveform {
      Waveform::Sine => (TAU * p).sin(),
      Waveform::Sawtooth => 2.0 * p - 1.0,
      Waveform::Square => {
        if p < 0.5 {
          1.0
        } else {
          -1.0
        }
      }
      Waveform::Triangle => 4.0 * (p - 0.5).abs() - 1.0,
    }
  }
}

/// Equal-power pan split.
#[inline]
fn pan_gains(pan: f32) -> (f32, f32) {
  let theta = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
  (theta.cos(), theta.sin())
}

/// One sounding oscillator. A slot only exists while its gain is nonzero;
/// zero-gain oscillators are torn down entirely rather than muted.
#[derive(Clone)]
struct OscSlot {
  osc: Osc,
  gain: Smooth,
  gain_target: f32,
  pan_l: f32,
  pan_r: f32,
  /// Fixed ratio applied to the voice frequency: range, semitones, detune.
  freq_mult: f32,
}

impl OscSlot {
  fn new(sr: f32, spec: &OscillatorSpec) -> Self {
    let (pan_l, pan_r) = pan_gains(spec.pan);
    Self {
      osc: Osc::new(spec.waveform),
      // Fade in from zero so a slot born mid-buffer does not click.
      gain: Smooth::new(sr, MOD_SMOOTH_MS),
      gain_target: spec.gain,
      pan_l,
      pan_r,
      freq_mult: Self::multiplier(spec),
    }
  }

  fn multiplier(spec: &OscillatorSpec) -> f32 {
    range_multiplier(&spec.range)
      * 2f32.powf(spec.semitones as f32 / 12.0)
      * 2f32.powf(spec.detune_cents / 1200.0)
  }

  fn update(&mut self, spec: &OscillatorSpec) {
    self.osc.waveform = spec.waveform;
    self.gain_target = spec.gain;
    let (l, r) = pan_gains(spec.pan);
    self.pan_l = l;
    self.pan_r = r;
    self.freq_mult = Self::multiplier(spec);
  }
}

#[derive(Clone)]
struct NoiseBranch {
  src: NoiseSource,
  gain: Smooth,
  gain_target: f32,
  pan_l: f32,
  pan_r: f32,
  tone: Svf,
}

impl NoiseBranch {
  fn new(sr: f32, spec: &NoiseSpec, note_freq: f32, seed: u32) -> Self {
    let (pan_l, pan_r) = pan_gains(spec.pan);
    let mut tone = Svf::new();
    tone.set_params(spec.tone_cutoff(note_freq), 0.707, sr);
    Self {
      src: NoiseSource::new(spec.color, seed),
      gain: Smooth::new(sr, MOD_SMOOTH_MS),
      gain_target: spec.gain,
      pan_l,
      pan_r,
      tone,
    }
  }
}

/// One LFO destination. `connected` mirrors whether the stage exists at all:
/// with the wheel at zero the stage is detached, not merely silent.
#[derive(Clone)]
struct Route {
  connected: bool,
  amount: Smooth,
  target: f32,
}

impl Route {
  fn new(sr: f32) -> Self {
    Self { connected: false, amount: Smooth::new(sr, MOD_SMOOTH_MS), target: 0.0 }
  }

  fn set(&mut self, enabled: bool, mod_amount: f32, depth: f32, scale: f32) {
    self.connected = enabled && mod_amount > 0.0;
    self.target = if self.connected { mod_amount * depth * scale } else { 0.0 };
    if !self.connected {
      self.amount.snap(0.0);
    }
  }

  #[inline]
  fn next(&mut self) -> f32 {
    self.amount.next(self.target)
  }
}

/// A single sounding note: oscillator slots and a noise branch mixed into a
/// stereo bus, shaped by a filter pair and the amplitude envelope, with the
/// LFO routed on top.
pub struct Voice {
  sr: f32,
  env: Env,
  lfo: Osc,
  lfo_rate: f32,
  route_cutoff: Route,
  route_res: Route,
  route_pitch: Route,
  route_vol: Route,
  slots: [Option<OscSlot>; 3],
  noise: Option<NoiseBranch>,
  filter_l: Svf,
  filter_r: Svf,
  filter_kind: FilterKind,
  base_cutoff: Smooth,
  cutoff_target: f32,
  q: Smooth,
  q_target: f32,
  contour: f32,
  glide: LinearRamp,
  released: bool,
  /// Samples left until the voice is reaped, armed at release.
  teardown_in: u64,
  seed: u32,
}

impl Voice {
  pub fn new(sr: f32, note_freq: f32, prev_freq: Option<f32>, s: &Settings, seed: u32) -> Self {
    let glide = match prev_freq {
      Some(from) if s.glide > 0.0 => {
        LinearRamp::new(from, note_freq, (s.glide * 0.5 * sr) as usize)
      }
      _ => LinearRamp::new(note_freq, note_freq, 1),
    };
    let cutoff = s.filter.clamped_cutoff();
    let q = s.filter.q();
    let mut v = Self {
      sr,
      env: Env::new(sr, &s.envelope),
      lfo: Osc::new(s.lfo.waveform),
      lfo_rate: s.lfo.rate,
      route_cutoff: Route::new(sr),
      route_res: Route::new(sr),
      route_pitch: Route::new(sr),
      route_vol: Route::new(sr),
      slots: [None, None, None],
      noise: None,
      filter_l: Svf::new(),
      filter_r: Svf::new(),
      filter_kind: s.filter.kind,
      base_cutoff: Smooth::with_value(sr, MOD_SMOOTH_MS, cutoff),
      cutoff_target: cutoff,
      q: Smooth::with_value(sr, MOD_SMOOTH_MS, q),
      q_target: q,
      contour: s.filter.contour,
      glide,
      released: false,
      teardown_in: u64::MAX,
      seed,
    };
    v.apply_settings(s);
    // New voices start from the configured gains, not a fade-in.
    for slot in v.slots.iter_mut().flatten() {
      let t = slot.gain_target;
      slot.gain.snap(t);
    }
    if let Some(n) = v.noise.as_mut() {
      let t = n.gain_target;
      n.gain.snap(t);
    }
    v
  }

  /// Re-shape the running voice after a settings merge. Slots appear and
  /// disappear with their gains; everything else updates in place.
  pub fn apply_settings(&mut self, s: &Settings) {
    let note_freq = self.glide.target();
    for (i, spec) in s.oscillators.iter().enumerate() {
      match (&mut self.slots[i], spec.gain > 0.0) {
        (slot @ None, true) => *slot = Some(OscSlot::new(self.sr, spec)),
        (Some(slot), true) => slot.update(spec),
        (slot @ Some(_), false) => {
          *slot = None;
          log::debug!("osc{} slot detached (gain 0)", i + 1);
        }
        (None, false) => {}
      }
    }
    match (&mut self.noise, s.noise.gain > 0.0) {
      (n @ None, true) => {
        *n = Some(NoiseBranch::new(self.sr, &s.noise, note_freq, self.seed))
      }
      (Some(n), true) => {
        n.gain_target = s.noise.gain;
        let (l, r) = pan_gains(s.noise.pan);
        n.pan_l = l;
        n.pan_r = r;
        n.tone.set_params(s.noise.tone_cutoff(note_freq), 0.707, self.sr);
        if !matches!(
          (&n.src, s.noise.color),
          (NoiseSource::White(_), super::noise::NoiseColor::White)
            | (NoiseSource::Pink(_), super::noise::NoiseColor::Pink)
        ) {
          n.src = NoiseSource::new(s.noise.color, self.seed);
        }
      }
      (n @ Some(_), false) => {
        *n = None;
        log::debug!("noise branch detached (gain 0)");
      }
      (None, false) => {}
    }

    self.filter_kind = s.filter.kind;
    self.cutoff_target = s.filter.clamped_cutoff();
    self.q_target = s.filter.q();
    self.contour = s.filter.contour;
    self.env.set(&s.envelope);

    self.lfo.waveform = s.lfo.waveform;
    self.lfo_rate = s.lfo.rate;
    let m = s.mod_amount();
    let d = s.lfo.depth;
    self.route_cutoff.set(s.lfo.routing.filter_cutoff, m, d, self.cutoff_target);
    self.route_res.set(s.lfo.routing.filter_resonance, m, d, 30.0);
    self.route_pitch.set(s.lfo.routing.osc_pitch, m, d, 100.0);
    self.route_vol.set(s.lfo.routing.osc_volume, m, d, 1.0);
  }

  /// Start the release tail and arm the teardown countdown.
  pub fn release(&mut self) {
    if self.released {
      return;
    }
    self.released = true;
    self.env.release();
    self.teardown_in = (self.env.release_s * self.sr) as u64 + 1;
  }

  pub fn is_released(&self) -> bool {
    self.released
  }

  /// True once the release tail has fully run out.
  pub fn is_finished(&self) -> bool {
    self.env.is_done() || self.teardown_in == 0
  }

  #[inline]
  pub fn render(&mut self) -> (f32, f32) {
    if self.is_finished() {
      return (0.0, 0.0);
    }
    if self.released {
      self.teardown_in -= 1;
    }

    let env_level = self.env.next();
    let lfo = self.lfo.next(self.lfo_rate, self.sr);
    let pitch_cents = lfo * self.route_pitch.next();
    let freq = self.glide.next() * 2f32.powf(pitch_cents / 1200.0);

    let mut l = 0.0;
    let mut r = 0.0;
    for slot in self.slots.iter_mut().flatten() {
      let sample = slot.osc.next(freq * slot.freq_mult, self.sr) * slot.gain.next(slot.gain_target);
      l += sample * slot.pan_l;
      r += sample * slot.pan_r;
    }
    if let Some(n) = self.noise.as_mut() {
      let sample = n.tone.process(n.src.next()).lp * n.gain.next(n.gain_target);
      l += sample * n.pan_l;
      r += sample * n.pan_r;
    }

    let base = self.base_cutoff.next(self.cutoff_target);
    let contour = env_level * self.contour * base * 0.15;
    let cutoff = (base + contour + lfo * self.route_cutoff.next()).clamp(20.0, 20_000.0);
    // resonance 0 is a neutral (Butterworth) response, never a dead filter
    let q = (self.q.next(self.q_target) + lfo * self.route_res.next()).max(0.707);
    self.filter_l.set_params(cutoff, q, self.sr);
    self.filter_r.set_params(cutoff, q, self.sr);
    let makeup = if self.filter_kind == FilterKind::Bandpass { BANDPASS_MAKEUP } else { 1.0 };
    let fl = self.filter_l.process(l).select(self.filter_kind) * makeup;
    let fr = self.filter_r.process(r).select(self.filter_kind) * makeup;

    let vol = (1.0 + lfo * self.route_vol.next()).max(0.0);
    let g = env_level * vol;
    (fl * g, fr * g)
  }

  #[cfg(test)]
  pub(crate) fn amp_level(&self) -> f32 {
    self.env.level
  }

  #[cfg(test)]
  pub(crate) fn lfo_connected_count(&self) -> usize {
    [&self.route_cutoff, &self.route_res, &self.route_pitch, &self.route_vol]
      .iter()
      .filter(|r| r.connected)
      .count()
  }

  #[cfg(test)]
  pub(crate) fn active_slot_count(&self) -> usize {
    self.slots.iter().flatten().count()
  }

  #[cfg(test)]
  pub(crate) fn q_now(&self) -> f32 {
    self.q.y
  }
}
