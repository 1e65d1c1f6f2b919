// ABOUTME: GSM 03.38 default alphabet with the single shift escape table
// ABOUTME: Converts between unpacked septets (one per octet) and text

use super::CodingError;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Escape to the extension table.
pub const ESCAPE: u8 = 0x1B;

/// Default alphabet, indexed by septet. Position 0x1B is the escape marker;
/// its entry is only the fallback shown for the reserved sequence 0x1B 0x1B.
const BASE: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å', //
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\u{A0}', 'Æ', 'æ', 'ß', 'É', //
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§', //
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', //
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à', //
];

/// Extension table reached through [`ESCAPE`].
const EXTENSION: [(u8, char); 10] = [
    (0x0A, '\u{0C}'),
    (0x14, '^'),
    (0x28, '{'),
    (0x29, '}'),
    (0x2F, '\\'),
    (0x3C, '['),
    (0x3D, '~'),
    (0x3E, ']'),
    (0x40, '|'),
    (0x65, '€'),
];

struct Tables {
    forward: HashMap<char, u8>,
    forward_escapes: HashMap<char, u8>,
    reverse_escapes: [Option<char>; 128],
}

static TABLES: LazyLock<Tables> = LazyLock::new(|| {
    let forward = BASE
        .iter()
        .enumerate()
        .filter(|&(septet, _)| septet != ESCAPE as usize)
        .map(|(septet, &c)| (c, septet as u8))
        .collect();

    let mut reverse_escapes = [None; 128];
    for &(code, c) in &EXTENSION {
        reverse_escapes[code as usize] = Some(c);
    }

    Tables {
        forward,
        forward_escapes: EXTENSION.iter().map(|&(code, c)| (c, code)).collect(),
        reverse_escapes,
    }
});

/// Decode unpacked septets (one per octet) to text.
///
/// An escape followed by a code missing from the extension table decodes to
/// the default alphabet character for that code.
pub fn decode(septets: &[u8]) -> Result<String, CodingError> {
    let tables = &*TABLES;
    let mut text = String::with_capacity(septets.len());
    let mut bytes = septets.iter().copied();

    while let Some(b) = bytes.next() {
        let b = check_septet(b)?;
        if b != ESCAPE {
            text.push(BASE[b as usize]);
            continue;
        }

        let code = check_septet(bytes.next().ok_or(CodingError::TruncatedEscape)?)?;
        text.push(tables.reverse_escapes[code as usize].unwrap_or(BASE[code as usize]));
    }

    Ok(text)
}

/// Encode text to unpacked septets, using the extension table for
/// characters missing from the default alphabet.
pub fn encode(text: &str) -> Result<Vec<u8>, CodingError> {
    let tables = &*TABLES;
    let mut septets = Vec::with_capacity(text.len());

    for c in text.chars() {
        if let Some(&septet) = tables.forward.get(&c) {
            septets.push(septet);
        } else if let Some(&code) = tables.forward_escapes.get(&c) {
            septets.extend_from_slice(&[ESCAPE, code]);
        } else {
            return Err(CodingError::Unrepresentable(c));
        }
    }

    Ok(septets)
}

pub fn is_representable(c: char) -> bool {
    let tables = &*TABLES;
    tables.forward.contains_key(&c) || tables.forward_escapes.contains_key(&c)
}

fn check_septet(b: u8) -> Result<u8, CodingError> {
    if b < 0x80 {
        Ok(b)
    } else {
        Err(CodingError::InvalidSeptet(b))
    }
}
