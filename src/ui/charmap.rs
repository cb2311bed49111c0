//! Character classification for glyph fallback: case folding, accent stripping
//! and the alphabetic test. Codes are `i32` so signed-byte input and the
//! "not a character" range can pass through unchanged.

const SHARP_S: i32 = 0xDF;
const CAPITAL_SHARP_S: i32 = 0x1E9E;

/// Upper-case counterpart of `code`, or `code` itself if there is no
/// single-code-point mapping.
#[inline(always)]
pub fn upper_for_lower(code: i32) -> i32 {
    if code == SHARP_S {
        return CAPITAL_SHARP_S;
    }
    single_mapping(code, |c| c.to_uppercase())
}

/// Lower-case counterpart of `code`, or `code` itself.
#[inline(always)]
pub fn lower_for_upper(code: i32) -> i32 {
    if code == CAPITAL_SHARP_S {
        return SHARP_S;
    }
    single_mapping(code, |c| c.to_lowercase())
}

#[inline(always)]
fn single_mapping<I, F>(code: i32, map: F) -> i32
where
    I: Iterator<Item = char>,
    F: FnOnce(char) -> I,
{
    let Some(ch) = u32::try_from(code).ok().and_then(char::from_u32) else {
        return code;
    };
    let mut it = map(ch);
    match (it.next(), it.next()) {
        (Some(one), None) => one as i32,
        _ => code,
    }
}

/// Lowercase letter that has an uppercase form to fall back to.
#[inline(always)]
pub fn is_lower(code: i32) -> bool {
    upper_for_lower(code) != code && lower_for_upper(code) == code
}

#[inline(always)]
pub fn is_alpha(code: i32) -> bool {
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .is_some_and(char::is_alphabetic)
}

/// Letters with neither an upper nor a lower form are not counted as cased.
#[inline(always)]
pub fn is_cased(code: i32) -> bool {
    upper_for_lower(code) != code || lower_for_upper(code) != code
}

/* ======================= ACCENT STRIPPING ======================= */

// '.' = no unaccented form.
const LATIN1_BASE: &[u8; 64] =
    b"AAAAAA.CEEEEIIIIDNOOOOO.OUUUUY..aaaaaa.ceeeeiiiidnooooo.ouuuuy.y";

const LATIN_EXT_A_BASE: &[u8; 128] = b"AaAaAaCcCcCcCcDd\
DdEeEeEeEeEeGgGg\
GgGgHhHhIiIiIiIi\
Ii..JjKk.LlLlLlL\
lLlNnNnNn...OoOo\
Oo..RrRrRrSsSsSs\
SsTtTtTtUuUuUuUu\
UuUuWwYyYZzZzZz.";

/// One accent-stripping step. Some letters need more than one step to reach
/// plain ASCII (e.g. U+01D5 -> U+00DC -> 'U'); callers that want the full
/// chain repeat until the result stops changing.
pub fn strip_accent(code: i32) -> i32 {
    let stripped = match code {
        0xC0..=0xFF => LATIN1_BASE[(code - 0xC0) as usize],
        0x100..=0x17F => LATIN_EXT_A_BASE[(code - 0x100) as usize],
        // Pinyin tone letters.
        0x1CD => b'A',
        0x1CE => b'a',
        0x1CF => b'I',
        0x1D0 => b'i',
        0x1D1 => b'O',
        0x1D2 => b'o',
        0x1D3 => b'U',
        0x1D4 => b'u',
        // U with diaeresis and tone: first to U+00DC/U+00FC.
        0x1D5 | 0x1D7 | 0x1D9 | 0x1DB => return 0xDC,
        0x1D6 | 0x1D8 | 0x1DA | 0x1DC => return 0xFC,
        0x1FA => return 0xC5,
        0x1FB => return 0xE5,
        0x1FC => return 0xC6,
        0x1FD => return 0xE6,
        0x1FE => return 0xD8,
        0x1FF => return 0xF8,
        _ => return code,
    };
    if stripped == b'.' {
        code
    } else {
        i32::from(stripped)
    }
}

#[cfg(test)]
mod tests {
    use super::{is_alpha, is_cased, is_lower, lower_for_upper, strip_accent, upper_for_lower};

    #[test]
    fn case_folding_is_single_code_point() {
        assert_eq!(upper_for_lower('a' as i32), 'A' as i32);
        assert_eq!(upper_for_lower(0xE9), 0xC9);
        assert_eq!(upper_for_lower(0xFF), 0x178);
        assert_eq!(upper_for_lower(0xDF), 0x1E9E);
        assert_eq!(lower_for_upper(0x1E9E), 0xDF);
        assert_eq!(upper_for_lower('1' as i32), '1' as i32);
        assert_eq!(upper_for_lower(-5), -5);
        assert_eq!(upper_for_lower(0xD800), 0xD800, "surrogates are not chars");
    }

    #[test]
    fn lowercase_needs_an_uppercase_partner() {
        assert!(is_lower('q' as i32));
        assert!(!is_lower('Q' as i32));
        assert!(!is_lower(0xAA), "feminine ordinal has no capital");
        assert!(is_cased('Q' as i32) && is_cased('q' as i32));
        assert!(!is_cased('-' as i32));
        assert!(is_alpha(0xE9) && !is_alpha('7' as i32) && !is_alpha(-1));
    }

    #[test]
    fn accent_stripping_chains_to_ascii() {
        assert_eq!(strip_accent(0xE9), 'e' as i32);
        assert_eq!(strip_accent(0xC7), 'C' as i32);
        assert_eq!(strip_accent(0x141), 'L' as i32);
        assert_eq!(strip_accent(0x17E), 'z' as i32);
        assert_eq!(strip_accent(0xC6), 0xC6, "ligatures stay put");
        assert_eq!(strip_accent(0xDF), 0xDF);

        let mut code = 0x1D7;
        let mut steps = Vec::new();
        loop {
            let next = strip_accent(code);
            if next == code {
                break;
            }
            steps.push(next);
            code = next;
        }
        assert_eq!(steps, vec![0xDC, 'U' as i32]);
    }
}
