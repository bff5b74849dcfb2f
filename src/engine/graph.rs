use std::collections::HashMap;

use super::effects::EffectsChain;
use super::settings::{Settings, SettingsPatch};
use super::tuning::note_to_frequency;
use super::voice::Voice;

struct VoiceEntry {
  voice: Voice,
  started_at: u64,
  released_at: Option<u64>,
}

/// The synth facade: one sounding `Voice` per note name, a master effects
/// chain, and the live settings snapshot. All calls happen on the audio
/// thread; the graph itself is single-threaded by construction.
pub struct SynthGraph {
  sr: f32,
  settings: Settings,
  voices: HashMap<String, VoiceEntry>,
  effects: EffectsChain,
  /// Pitch of the most recent attack; glide ramps start here.
  last_freq: Option<f32>,
  clock: u64,
  // reused each frame to avoid allocating on the audio thread
  reap: Vec<String>,
}

impl SynthGraph {
  pub fn new(sr: f32) -> Self {
    let settings = Settings::default();
    let mut effects = EffectsChain::new(sr);
    effects.apply(&settings.effects);
    Self {
      sr,
      settings,
      voices: HashMap::new(),
      effects,
      last_freq: None,
      clock: 0,
      reap: Vec::with_capacity(8),
    }
  }

  fn seed_for(note: &str) -> u32 {
    note.bytes().fold(0x811c_9dc5u32, |h, b| (h ^ b as u32).wrapping_mul(0x0100_0193))
  }

  /// Start (or restart) a note. A note whose oscillators are all silent
  /// allocates nothing, and an unresolvable name never reaches the voice
  /// table: one NaN sample in the shared delay/reverb state would never
  /// wash out.
  pub fn trigger_attack(&mut self, note: &str) {
    if self.settings.oscillators.iter().all(|o| o.gain <= 0.0) {
      log::debug!("attack {note} skipped: all oscillators silent");
      return;
    }
    let freq = note_to_frequency(note, self.settings.tune_cents);
    if !freq.is_finite() {
      log::warn!("attack {note} skipped: unresolvable note name");
      return;
    }
    // Retrigger replaces the old voice outright.
    if self.voices.remove(note).is_some() {
      log::debug!("retrigger {note}: previous voice torn down");
    }
    let voice = Voice::new(self.sr, freq, self.last_freq, &self.settings, Self::seed_for(note));
    self.voices.insert(
      note.to_string(),
      VoiceEntry { voice, started_at: self.clock, released_at: None },
    );
    self.last_freq = Some(freq);
  }

  /// Begin the release tail. Unknown or already-released notes are no-ops.
  pub fn trigger_release(&mut self, note: &str) {
    let Some(entry) = self.voices.get_mut(note) else {
      return;
    };
    if entry.released_at.is_some() {
      return;
    }
    entry.released_at = Some(self.clock);
    entry.voice.release();
  }

  /// Legato change: release the old note, then attack the new one gliding
  /// from the old pitch. Release-first keeps a self-transition sounding (the
  /// attack retriggers the note it just released). With no predecessor this
  /// is a plain attack.
  pub fn handle_note_transition(&mut self, from: Option<&str>, to: &str) {
    if let Some(from) = from {
      if self.voices.contains_key(from) {
        let freq = note_to_frequency(from, self.settings.tune_cents);
        if freq.is_finite() {
          self.last_freq = Some(freq);
        }
      }
      self.trigger_release(from);
    }
    self.trigger_attack(to);
  }

  /// Merge a patch into the snapshot, then push the result to the effects
  /// chain and every live voice in the same call.
  pub fn update_settings(&mut self, patch: SettingsPatch) {
    self.settings.merge(patch);
    self.effects.apply(&self.settings.effects);
    for entry in self.voices.values_mut() {
      entry.voice.apply_settings(&self.settings);
    }
  }

  /// Drop every voice immediately, release tails included.
  pub fn dispose(&mut self) {
    let n = self.voices.len();
    self.voices.clear();
    self.last_freq = None;
    if n > 0 {
      log::debug!("disposed {n} voice(s)");
    }
  }

  /// Render one stereo frame: sum the voices, reap finished ones, run the
  /// master chain.
  #[inline]
  pub fn render_frame(&mut self) -> (f32, f32) {
    self.clock += 1;
    let mut l = 0.0;
    let mut r = 0.0;
    for (note, entry) in self.voices.iter_mut() {
      let (vl, vr) = entry.voice.render();
      l += vl;
      r += vr;
      // a voice is only reaped once its release actually ran; a finished
      // flag on an unreleased voice would be a state bug, not a teardown
      if entry.voice.is_finished() && entry.voice.is_released() {
        self.reap.push(note.clone());
      }
    }
    for note in self.reap.drain(..) {
      if let Some(entry) = self.voices.remove(&note) {
        log::trace!(
          "voice {note} reaped after {} samples",
          self.clock.saturating_sub(entry.started_at)
        );
      }
    }
    self.effects.process(l, r)
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  #[cfg(test)]
  pub(crate) fn voice_count(&self) -> usize {
    self.voices.len()
  }

  #[cfg(test)]
  pub(crate) fn is_playing(&self, note: &str) -> bool {
    self.voices.get(note).is_some_and(|e| e.released_at.is_none())
  }
}
