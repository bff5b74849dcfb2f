use serde::{Deserialize, Serialize};

use super::noise::NoiseColor;

pub const TONE_LADDER: [f32; 5] = [200.0, 800.0, 2000.0, 5000.0, 20000.0];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Waveform {
  Triangle,
  Sawtooth,
  Square,
  Sine,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
  Lowpass,
  Highpass,
  Bandpass,
  Notch,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OscillatorSpec {
  pub waveform: Waveform,
  /// Semitone offset, [-12, 12].
  pub semitones: i32,
  /// Octave-range selector: "32" | "16" | "8" | "4" | "2".
  pub range: String,
  pub detune_cents: f32,
  /// Per-oscillator gain [0, 1]; a slot with gain 0 holds no oscillator.
  pub gain: f32,
  pub pan: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseSpec {
  pub color: NoiseColor,
  pub gain: f32,
  pub pan: f32,
  /// Index into TONE_LADDER.
  pub tone: usize,
  /// Lock the tone cutoff to the note frequency instead of the fixed ladder.
  pub sync: bool,
}

impl NoiseSpec {
  /// Tone-filter cutoff for a given note frequency.
  pub fn tone_cutoff(&self, note_freq: f32) -> f32 {
    let base = TONE_LADDER[self.tone.min(TONE_LADDER.len() - 1)];
    if self.sync {
      base * (note_freq / 440.0)
    } else {
      base
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
  pub kind: FilterKind,
  pub cutoff: f32,
  /// Raw resonance [0, 1], scaled to a Q per filter type.
  pub resonance: f32,
  /// Envelope contour amount [0, 1].
  pub contour: f32,
}

impl FilterSpec {
  pub fn clamped_cutoff(&self) -> f32 {
    self.cutoff.clamp(20.0, 20_000.0)
  }

  /// Type-dependent Q scaling: notch doubles the base Q, bandpass takes 1.5x.
  pub fn q(&self) -> f32 {
    let base = self.resonance * 30.0;
    match self.kind {
      FilterKind::Bandpass => base * 1.5,
      FilterKind::Notch => base * 2.0,
      _ => base,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeSpec {
  pub attack: f32,
  pub decay: f32,
  pub sustain: f32,
  pub release: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LfoRouting {
  pub filter_cutoff: bool,
  pub filter_resonance: bool,
  pub osc_pitch: bool,
  pub osc_volume: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LfoSpec {
  pub rate: f32,
  pub depth: f32,
  pub waveform: Waveform,
  pub routing: LfoRouting,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectsSpec {
  /// Reverb send amount [0, 100] -> wet gain [0, 1].
  pub reverb: f32,
  /// Delay send amount [0, 100] -> wet gain [0, 1].
  pub delay: f32,
  /// Distortion output gain [0, 100]; crossfade mix is (gain/100)^2.
  pub distortion: f32,
  pub dist_low_db: f32,
  pub dist_high_db: f32,
  pub reverb_low_db: f32,
}

impl EffectsSpec {
  pub fn distortion_mix(&self) -> f32 {
    let g = (self.distortion / 100.0).clamp(0.0, 1.0);
    g * g
  }
  pub fn reverb_send(&self) -> f32 {
    (self.reverb / 100.0).clamp(0.0, 1.0)
  }
  pub fn delay_send(&self) -> f32 {
    (self.delay / 100.0).clamp(0.0, 1.0)
  }
}

/// The live settings snapshot. Single owner is the engine facade; updates
/// arrive as a `SettingsPatch` and are merged atomically before any voice
/// sees them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
  pub tune_cents: f32,
  /// Modulation wheel position [0, 100].
  pub mod_wheel: f32,
  /// Modulation mix [0, 100].
  pub mod_mix: f32,
  /// Glide time [0, 1] seconds; the pitch ramp runs glide * 0.5 s.
  pub glide: f32,
  pub oscillators: [OscillatorSpec; 3],
  pub noise: NoiseSpec,
  pub filter: FilterSpec,
  pub envelope: EnvelopeSpec,
  pub lfo: LfoSpec,
  pub effects: EffectsSpec,
}

impl Default for Settings {
  fn default() -> Self {
    let osc = |waveform, gain| OscillatorSpec {
      waveform,
      semitones: 0,
      range: "8".to_string(),
      detune_cents: 0.0,
      gain,
      pan: 0.0,
    };
    Self {
      tune_cents: 0.0,
      mod_wheel: 0.0,
      mod_mix: 100.0,
      glide: 0.0,
      oscillators: [
        osc(Waveform::Sawtooth, 0.8),
        osc(Waveform::Square, 0.0),
        osc(Waveform::Triangle, 0.0),
      ],
      noise: NoiseSpec { color: NoiseColor::White, gain: 0.0, pan: 0.0, tone: 2, sync: false },
      filter: FilterSpec { kind: FilterKind::Lowpass, cutoff: 2000.0, resonance: 0.0, contour: 0.0 },
      envelope: EnvelopeSpec { attack: 0.05, decay: 0.2, sustain: 0.7, release: 0.3 },
      lfo: LfoSpec {
        rate: 5.0,
        depth: 0.5,
        waveform: Waveform::Sine,
        routing: LfoRouting::default(),
      },
      effects: EffectsSpec {
        reverb: 0.0,
        delay: 0.0,
        distortion: 0.0,
        dist_low_db: 0.0,
        dist_high_db: 0.0,
        reverb_low_db: 0.0,
      },
    }
  }
}

impl Settings {
  /// Effective modulation depth: wheel and mix multiply.
  pub fn mod_amount(&self) -> f32 {
    (self.mod_wheel / 100.0).clamp(0.0, 1.0) * (self.mod_mix / 100.0).clamp(0.0, 1.0)
  }

  pub fn merge(&mut self, patch: SettingsPatch) {
    if let Some(v) = patch.tune_cents {
      self.tune_cents = v;
    }
    if let Some(v) = patch.mod_wheel {
      self.mod_wheel = v;
    }
    if let Some(v) = patch.mod_mix {
      self.mod_mix = v;
    }
    if let Some(v) = patch.glide {
      self.glide = v;
    }
    // Compound fields replace the whole sub-object; callers send the full
    // object they intend to change.
    if let Some(v) = patch.oscillators {
      self.oscillators = v;
    }
    if let Some(v) = patch.noise {
      self.noise = v;
    }
    if let Some(v) = patch.filter {
      self.filter = v;
    }
    if let Some(v) = patch.envelope {
      self.envelope = v;
    }
    if let Some(v) = patch.lfo {
      self.lfo = v;
    }
    if let Some(v) = patch.effects {
      self.effects = v;
    }
  }
}

/// Merge-style delta from the settings container; omitted fields leave the
/// current snapshot untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
  pub tune_cents: Option<f32>,
  pub mod_wheel: Option<f32>,
  pub mod_mix: Option<f32>,
  pub glide: Option<f32>,
  pub oscillators: Option<[OscillatorSpec; 3]>,
  pub noise: Option<NoiseSpec>,
  pub filter: Option<FilterSpec>,
  pub envelope: Option<EnvelopeSpec>,
  pub lfo: Option<LfoSpec>,
  pub effects: Option<EffectsSpec>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn merge_leaves_omitted_fields_untouched() {
    let mut s = Settings::default();
    let before = s.clone();
    s.merge(SettingsPatch { mod_wheel: Some(60.0), ..Default::default() });
    assert_eq!(s.mod_wheel, 60.0);
    assert_eq!(s.filter, before.filter);
    assert_eq!(s.oscillators, before.oscillators);
    assert_eq!(s.glide, before.glide);
  }

  #[test]
  fn compound_fields_replace_wholesale() {
    let mut s = Settings::default();
    let filter =
      FilterSpec { kind: FilterKind::Notch, cutoff: 900.0, resonance: 0.5, contour: 0.2 };
    s.merge(SettingsPatch { filter: Some(filter.clone()), ..Default::default() });
    assert_eq!(s.filter, filter);
  }

  #[test]
  fn patch_parses_from_json() {
    let patch: SettingsPatch =
      serde_json::from_str(r#"{ "glide": 0.2, "effects": { "reverb": 40.0, "delay": 0.0, "distortion": 50.0, "dist_low_db": 0.0, "dist_high_db": 0.0, "reverb_low_db": -3.0 } }"#)
        .expect("patch should deserialize");
    let mut s = Settings::default();
    s.merge(patch);
    assert_eq!(s.glide, 0.2);
    assert_eq!(s.effects.reverb, 40.0);
    assert_eq!(s.mod_mix, 100.0);
  }

  #[test]
  fn settings_round_trip_through_json() {
    let s = Settings::default();
    let json = serde_json::to_string(&s).expect("settings should serialize");
    let back: Settings = serde_json::from_str(&json).expect("settings should deserialize");
    assert_eq!(back, s);
  }

  #[test]
  fn q_scaling_per_filter_type() {
    let mut f = FilterSpec { kind: FilterKind::Lowpass, cutoff: 2000.0, resonance: 0.5, contour: 0.0 };
    assert_eq!(f.q(), 15.0);
    f.kind = FilterKind::Bandpass;
    assert_eq!(f.q(), 22.5);
    f.kind = FilterKind::Notch;
    assert_eq!(f.q(), 30.0, "notch at resonance 0.5 doubles to Q 30");
  }

  #[test]
  fn cutoff_is_clamped() {
    let f = FilterSpec { kind: FilterKind::Lowpass, cutoff: 99_999.0, resonance: 0.0, contour: 0.0 };
    assert_eq!(f.clamped_cutoff(), 20_000.0);
    let f = FilterSpec { cutoff: 1.0, ..f };
    assert_eq!(f.clamped_cutoff(), 20.0);
  }

  #[test]
  fn tone_ladder_and_sync() {
    let mut n = NoiseSpec { color: NoiseColor::Pink, gain: 0.5, pan: 0.0, tone: 3, sync: false };
    assert_eq!(n.tone_cutoff(440.0), 5000.0);
    n.sync = true;
    assert_eq!(n.tone_cutoff(220.0), 2500.0, "synced tone scales by f/440");
    n.tone = 99;
    assert_eq!(n.tone_cutoff(440.0), 20_000.0, "out-of-range tone saturates");
  }

  #[test]
  fn mod_amount_is_product_of_wheel_and_mix() {
    let mut s = Settings::default();
    s.mod_wheel = 50.0;
    s.mod_mix = 50.0;
    assert!((s.mod_amount() - 0.25).abs() < 1e-6);
    s.mod_wheel = 0.0;
    assert_eq!(s.mod_amount(), 0.0);
  }

  #[test]
  fn distortion_mix_is_squared() {
    let fx = Settings::default().effects;
    let fx = EffectsSpec { distortion: 50.0, ..fx };
    assert!((fx.distortion_mix() - 0.25).abs() < 1e-6);
    let fx = EffectsSpec { distortion: 100.0, ..fx };
    assert_eq!(fx.distortion_mix(), 1.0);
  }
}
