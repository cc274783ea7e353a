use crate::dice::{Dice, DieSides};
use std::str::FromStr;

/////////////////
// parse::Dice //
/////////////////

impl FromStr for Dice {
    type Err = String;

    // [4, 4, 2] or 4,4,2 or "4 4 2"

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.trim_start_matches('[');
        let s = s.trim_end_matches(']');

        let splitters = &[',', ' ', '\n', '\t'];

        s.split(splitters)
            .filter(|s| !s.is_empty())
            .map(parse_face)
            .collect()
    }
}

fn parse_face(face_str: &str) -> Result<u8, String> {
    let face = face_str
        .parse::<u8>()
        .map_err(|err| format!("failed to parse die face: '{}', error: {}", face_str, err))?;

    if face == 0 {
        return Err(format!(
            "die faces start at 1: '{}' is not a valid face",
            face_str
        ));
    }

    Ok(face)
}

/////////////////////
// parse::DieSides //
/////////////////////

impl FromStr for DieSides {
    type Err = String;

    // 6 or d6

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s.strip_prefix('d').unwrap_or(s);
        let sides = digits
            .parse::<u32>()
            .map_err(|err| format!("failed to parse die sides: '{}', error: {}", s, err))?;
        DieSides::new(sides).map_err(|err| err.to_string())
    }
}
