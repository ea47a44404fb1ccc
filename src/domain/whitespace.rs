//! Whitespace as browsers see it.
//!
//! Form input is judged by the same whitespace set a browser's `trim()` and
//! `\s` use. That set differs from Rust's `char::is_whitespace`: it includes
//! U+FEFF and excludes U+0085.

pub const FORM_WHITESPACE: &[char] = &[
    '\u{0009}', '\u{000A}', '\u{000B}', '\u{000C}', '\u{000D}', '\u{0020}', '\u{00A0}',
    '\u{1680}', '\u{2000}', '\u{2001}', '\u{2002}', '\u{2003}', '\u{2004}', '\u{2005}',
    '\u{2006}', '\u{2007}', '\u{2008}', '\u{2009}', '\u{200A}', '\u{2028}', '\u{2029}',
    '\u{202F}', '\u{205F}', '\u{3000}', '\u{FEFF}',
];

pub fn is_form_whitespace(c: char) -> bool {
    FORM_WHITESPACE.contains(&c)
}

/// True when nothing is left once form whitespace is trimmed off.
pub fn is_blank(s: &str) -> bool {
    s.trim_matches(is_form_whitespace).is_empty()
}

/// A regex character class matching any form whitespace character.
pub fn regex_class() -> String {
    FORM_WHITESPACE
        .iter()
        .map(|c| format!(r"\x{{{:X}}}", *c as u32))
        .collect()
}
