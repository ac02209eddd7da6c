//! Note names for frequency readouts.

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Semitones from C0 to A4.
const A4_INDEX: i32 = 57;

/// Returns the nearest equal-temperament note to `hz` (A4 = 440 Hz), e.g. `"A4"`.
pub fn note_name(hz: f32) -> Option<String> {
    if !(hz > 0.0) || !hz.is_finite() {
        return None;
    }
    let index = (12.0 * (hz / 440.0).log2()).round() as i32 + A4_INDEX;
    if index < 0 {
        return None;
    }
    Some(format!(
        "{}{}",
        NOTE_NAMES[(index % 12) as usize],
        index / 12
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_pitches() {
        assert_eq!(note_name(440.0).as_deref(), Some("A4"));
        assert_eq!(note_name(261.63).as_deref(), Some("C4"));
        assert_eq!(note_name(49.0).as_deref(), Some("G1"));
        assert_eq!(note_name(452.0).as_deref(), Some("A4"));
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(note_name(0.0), None);
        assert_eq!(note_name(-10.0), None);
        assert_eq!(note_name(f32::NAN), None);
        assert_eq!(note_name(5.0), None);
    }
}
