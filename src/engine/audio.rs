use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use thiserror::Error;

use super::graph::SynthGraph;
use super::messages::EngineMsg;

/// Messages applied per callback before anything is starved.
const MSG_DRAIN_CAP: usize = 24;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("no output device available")]
  NoOutputDevice,
  #[error("could not enumerate output configs: {0}")]
  Configs(#[from] cpal::SupportedStreamConfigsError),
  #[error("no usable output config: {0}")]
  DefaultConfig(#[from] cpal::DefaultStreamConfigError),
  #[error("could not build output stream: {0}")]
  BuildStream(#[from] cpal::BuildStreamError),
  #[error("could not start output stream: {0}")]
  PlayStream(#[from] cpal::PlayStreamError),
}

/// Prefer 44100 stereo f32, then 48000, then any stereo f32 config, then
/// whatever the device calls its default.
fn pick_output_config(device: &cpal::Device) -> Result<cpal::SupportedStreamConfig, EngineError> {
  for target in [44_100u32, 48_000] {
    for range in device.supported_output_configs()? {
      if range.channels() != 2 || range.sample_format() != cpal::SampleFormat::F32 {
        continue;
      }
      if range.min_sample_rate().0 <= target && range.max_sample_rate().0 >= target {
        return Ok(range.with_sample_rate(cpal::SampleRate(target)));
      }
    }
  }
  if let Some(range) = device
    .supported_output_configs()?
    .find(|r| r.channels() == 2 && r.sample_format() == cpal::SampleFormat::F32)
  {
    return Ok(range.with_max_sample_rate());
  }
  Ok(device.default_output_config()?)
}

pub struct AudioEngine {
  tx: Sender<EngineMsg>,
  rx: Receiver<EngineMsg>,
  pub sr: f32,
  graph: Option<SynthGraph>,
  stream: Option<cpal::Stream>,
}

impl AudioEngine {
  pub fn new() -> Result<Self, EngineError> {
    let (tx, rx) = unbounded();
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(EngineError::NoOutputDevice)?;
    let config = pick_output_config(&device)?;
    let sr = config.sample_rate().0 as f32;
    log::info!("audio engine initialized at {sr} Hz");
    Ok(Self { tx, rx, sr, graph: Some(SynthGraph::new(sr)), stream: None })
  }

  pub fn start(&mut self) -> Result<(), EngineError> {
    if self.stream.is_some() {
      return Ok(());
    }
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(EngineError::NoOutputDevice)?;
    let config = pick_output_config(&device)?;
    let mut cfg: cpal::StreamConfig = config.into();
    // Larger fixed buffer to reduce underruns
    cfg.buffer_size = cpal::BufferSize::Fixed(1024);
    self.sr = cfg.sample_rate.0 as f32;

    let rx = self.rx.clone();
    // Graph moves into the audio thread; self keeps None while streaming.
    let sr = self.sr;
    let mut graph = self.graph.take().unwrap_or_else(|| SynthGraph::new(sr));

    let err_fn = |e: cpal::StreamError| log::error!("stream error: {e}");
    let stream = device.build_output_stream(
      &cfg,
      move |data: &mut [f32], _| {
        // Drain messages without blocking; tight cap so a burst of control
        // traffic cannot starve the buffer.
        let mut drained = 0usize;
        loop {
          match rx.try_recv() {
            Ok(msg) => apply_msg(&mut graph, msg),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
          }
          drained += 1;
          if drained >= MSG_DRAIN_CAP {
            break;
          }
        }
        for frame in data.chunks_mut(2) {
          let (l, r) = graph.render_frame();
          frame[0] = l;
          if frame.len() > 1 {
            frame[1] = r;
          }
        }
      },
      err_fn,
      None,
    )?;
    stream.play()?;
    self.stream = Some(stream);
    log::info!("output stream running at {} Hz", self.sr);
    Ok(())
  }

  pub fn stop(&mut self) {
    self.stream.take();
  }

  /// Tear down all voices and the stream. The engine can be restarted; a
  /// fresh graph is built on the next `start`.
  pub fn dispose(&mut self) {
    let _ = self.tx.send(EngineMsg::Dispose);
    self.stop();
  }

  pub fn sender(&self) -> Sender<EngineMsg> {
    self.tx.clone()
  }
}

fn apply_msg(graph: &mut SynthGraph, msg: EngineMsg) {
  match msg {
    EngineMsg::NoteOn { note } => graph.trigger_attack(&note),
    EngineMsg::NoteOff { note } => graph.trigger_release(&note),
    EngineMsg::NoteTransition { from, to } => graph.handle_note_transition(from.as_deref(), &to),
    EngineMsg::UpdateSettings(patch) => graph.update_settings(patch),
    EngineMsg::Dispose => graph.dispose(),
    EngineMsg::Quit => {}
  }
}

// Intentionally not Clone; the graph moves into the audio callback.
