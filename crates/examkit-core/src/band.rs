//! Raw score to band conversion.
//!
//! Each skill has a descending threshold table; the band of the first entry
//! whose `min` the correct count reaches is returned. Writing has no table:
//! its band comes from the grading backend.

use serde::{Deserialize, Serialize};

/// Skills scored by counting correct answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Reading,
    Listening,
}

/// One row of a band table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub min: u32,
    pub band: f32,
}

/// Academic reading, 40 questions.
pub const READING_BANDS: &[Threshold] = &[
    Threshold { min: 39, band: 9.0 },
    Threshold { min: 37, band: 8.5 },
    Threshold { min: 35, band: 8.0 },
    Threshold { min: 33, band: 7.5 },
    Threshold { min: 30, band: 7.0 },
    Threshold { min: 27, band: 6.5 },
    Threshold { min: 23, band: 6.0 },
    Threshold { min: 19, band: 5.5 },
    Threshold { min: 15, band: 5.0 },
    Threshold { min: 13, band: 4.5 },
    Threshold { min: 10, band: 4.0 },
    Threshold { min: 8, band: 3.5 },
    Threshold { min: 6, band: 3.0 },
    Threshold { min: 4, band: 2.5 },
    Threshold { min: 0, band: 0.0 },
];

/// Listening, 40 questions.
pub const LISTENING_BANDS: &[Threshold] = &[
    Threshold { min: 39, band: 9.0 },
    Threshold { min: 37, band: 8.5 },
    Threshold { min: 35, band: 8.0 },
    Threshold { min: 32, band: 7.5 },
    Threshold { min: 30, band: 7.0 },
    Threshold { min: 26, band: 6.5 },
    Threshold { min: 23, band: 6.0 },
    Threshold { min: 18, band: 5.5 },
    Threshold { min: 16, band: 5.0 },
    Threshold { min: 13, band: 4.5 },
    Threshold { min: 10, band: 4.0 },
    Threshold { min: 8, band: 3.5 },
    Threshold { min: 6, band: 3.0 },
    Threshold { min: 4, band: 2.5 },
    Threshold { min: 0, band: 0.0 },
];

impl Skill {
    pub fn table(self) -> &'static [Threshold] {
        match self {
            Skill::Reading => READING_BANDS,
            Skill::Listening => LISTENING_BANDS,
        }
    }
}

/// Convert a correct-answer count into a band score.
pub fn band_for(correct: u32, skill: Skill) -> f32 {
    skill
        .table()
        .iter()
        .find(|row| row.min <= correct)
        .map_or(0.0, |row| row.band)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_correct_is_band_zero() {
        assert_eq!(band_for(0, Skill::Reading), 0.0);
        assert_eq!(band_for(0, Skill::Listening), 0.0);
    }

    #[test]
    fn bands_are_monotonic() {
        for skill in [Skill::Reading, Skill::Listening] {
            for n in 1..=60 {
                assert!(
                    band_for(n, skill) >= band_for(n - 1, skill),
                    "{skill:?} not monotonic at {n}"
                );
            }
        }
    }

    #[test]
    fn tables_descend_and_bottom_out() {
        for skill in [Skill::Reading, Skill::Listening] {
            let table = skill.table();
            assert!(table.windows(2).all(|w| w[0].min > w[1].min && w[0].band > w[1].band));
            assert_eq!(table.last(), Some(&Threshold { min: 0, band: 0.0 }));
        }
    }

    #[test]
    fn known_conversions() {
        assert_eq!(band_for(40, Skill::Reading), 9.0);
        assert_eq!(band_for(30, Skill::Reading), 7.0);
        assert_eq!(band_for(32, Skill::Reading), 7.0);
        assert_eq!(band_for(32, Skill::Listening), 7.5);
        assert_eq!(band_for(17, Skill::Listening), 5.0);
        assert_eq!(band_for(3, Skill::Listening), 0.0);
    }
}
