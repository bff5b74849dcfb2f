use once_cell::sync::Lazy;
use std::collections::HashMap;

// Base frequencies at reference octave 4.
static PITCH_CLASSES: Lazy<HashMap<&'static str, f32>> = Lazy::new(|| {
  HashMap::from([
    ("C", 261.63),
    ("C#", 277.18),
    ("D", 293.66),
    ("D#", 311.13),
    ("E", 329.63),
    ("F", 349.23),
    ("F#", 369.99),
    ("G", 392.00),
    ("G#", 415.30),
    ("A", 440.00),
    ("A#", 466.16),
    ("B", 493.88),
  ])
});

/// Resolve a note name like "C#4" to a frequency in Hz, with a global tuning
/// offset in cents. Malformed names yield NaN; callers validate upstream.
pub fn note_to_frequency(note: &str, tune_cents: f32) -> f32 {
  let Some(split) = note.find(|c: char| c.is_ascii_digit()) else { return f32::NAN };
  let (class, octave) = note.split_at(split);
  let Some(&base) = PITCH_CLASSES.get(class) else { return f32::NAN };
  let Ok(octave) = octave.parse::<i32>() else { return f32::NAN };
  base * (2.0_f32).powf((octave - 4) as f32 + tune_cents / 1200.0)
}

/// Octave-range selector to frequency multiplier. Unknown input passes
/// through at unity.
pub fn range_multiplier(range: &str) -> f32 {
  match range {
    "32" => 0.125,
    "16" => 0.25,
    "8" => 0.5,
    "4" => 1.0,
    "2" => 2.0,
    _ => 1.0,
  }
}
