use serde::Deserialize;

use super::settings::SettingsPatch;

/// Control-plane messages, drained by the audio callback between buffers.
/// Hosts typically produce these from JSON.
#[derive(Clone, Debug, Deserialize)]
pub enum EngineMsg {
  NoteOn { note: String },
  NoteOff { note: String },
  /// Legato move: release `from`, attack `to` gliding from `from`'s pitch.
  NoteTransition { from: Option<String>, to: String },
  UpdateSettings(SettingsPatch),
  /// Drop all voices immediately, tails included.
  Dispose,
  Quit,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn note_on_parses_from_json() {
    let msg: EngineMsg =
      serde_json::from_str(r#"{ "NoteOn": { "note": "C#4" } }"#).expect("should parse");
    match msg {
      EngineMsg::NoteOn { note } => assert_eq!(note, "C#4"),
      other => panic!("wrong variant: {other:?}"),
    }
  }

  #[test]
  fn update_settings_parses_partial_patch() {
    let msg: EngineMsg =
      serde_json::from_str(r#"{ "UpdateSettings": { "mod_wheel": 42.0 } }"#).expect("should parse");
    match msg {
      EngineMsg::UpdateSettings(patch) => {
        assert_eq!(patch.mod_wheel, Some(42.0));
        assert!(patch.filter.is_none(), "omitted fields stay None");
      }
      other => panic!("wrong variant: {other:?}"),
    }
  }

  #[test]
  fn unit_variants_parse_from_bare_strings() {
    let msg: EngineMsg = serde_json::from_str(r#""Dispose""#).expect("should parse");
    assert!(matches!(msg, EngineMsg::Dispose));
  }
}
