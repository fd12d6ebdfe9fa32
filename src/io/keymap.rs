/*
Computer keyboard as a two-octave piano
=======================================

   2 3   5 6 7            s d   g h j
  q w e r t y u          z x c v b n m
  C4 ........ B4          C3 ........ B3

The bottom row is the lower octave, sharps on the row above each.
*/

const KEY_MAP: [(char, u8); 24] = [
    ('z', 48),
    ('s', 49),
    ('x', 50),
    ('d', 51),
    ('c', 52),
    ('v', 53),
    ('g', 54),
    ('b', 55),
    ('h', 56),
    ('n', 57),
    ('j', 58),
    ('m', 59),
    ('q', 60),
    ('2', 61),
    ('w', 62),
    ('3', 63),
    ('e', 64),
    ('r', 65),
    ('5', 66),
    ('t', 67),
    ('6', 68),
    ('y', 69),
    ('7', 70),
    ('u', 71),
];

/// MIDI note for a keyboard key, case-insensitive.
pub fn key_to_note(key: char) -> Option<u8> {
    let key = key.to_ascii_lowercase();
    KEY_MAP
        .iter()
        .find(|(k, _)| *k == key)
        .map(|&(_, note)| note)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_map_to_octaves() {
        assert_eq!(key_to_note('z'), Some(48));
        assert_eq!(key_to_note('m'), Some(59));
        assert_eq!(key_to_note('q'), Some(60));
        assert_eq!(key_to_note('u'), Some(71));
    }

    #[test]
    fn test_sharps_and_case() {
        assert_eq!(key_to_note('2'), Some(61));
        assert_eq!(key_to_note('J'), Some(58));
        assert_eq!(key_to_note('a'), None);
        assert_eq!(key_to_note(' '), None);
    }
}
