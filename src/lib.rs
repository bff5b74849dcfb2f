//! Polyphonic subtractive synth core: note-keyed voices with a three
//! oscillator + noise architecture, LFO modulation routing, and a master
//! distortion/delay/convolution-reverb chain, streamed through cpal.

pub mod engine {
  pub mod audio;
  pub mod dsp;
  pub mod effects;
  pub mod graph;
  pub mod messages;
  pub mod noise;
  pub mod settings;
  pub mod tuning;
  pub mod voice;
}

pub use engine::audio::{AudioEngine, EngineError};
pub use engine::graph::SynthGraph;
pub use engine::messages::EngineMsg;
pub use engine::settings::{Settings, SettingsPatch};
pub use engine::voice::Voice;
