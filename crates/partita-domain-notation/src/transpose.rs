use serde::{Deserialize, Serialize};
use std::fmt;

/// Semitone offset applied when a part is rendered. The notation source is
/// never rewritten; the offset lives only in session state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semitones(pub i32);

impl Semitones {
    pub const ZERO: Semitones = Semitones(0);

    pub fn shift(self, delta: i32) -> Self {
        Self(self.0.saturating_add(delta))
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Semitones {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 > 0 {
            write!(f, "+{}", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}
