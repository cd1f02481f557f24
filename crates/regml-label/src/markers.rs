//! Marker alphabet catalog.
//!
//! Label segments below the section level are drawn from ordered marker
//! alphabets. Sibling computation searches the alphabets in a fixed
//! priority order: lowercase letters, decimal numbers, lowercase roman
//! numerals, uppercase letters, then the emphasized (tag-wrapped)
//! decimal and roman variants.

/// Literal segment marking an interpretation branch.
pub const INTERP: &str = "Interp";

/// Literal segment marking a subpart branch.
pub const SUBPART: &str = "Subpart";

/// How far the generated numeric and roman alphabets run.
const DEPTH: usize = 50;

/// Lowercase roman numeral for `n` (1-based).
///
/// # Example
///
/// ```
/// use regml_label::roman_lower;
///
/// assert_eq!(roman_lower(4), "iv");
/// assert_eq!(roman_lower(9), "ix");
/// assert_eq!(roman_lower(38), "xxxviii");
/// ```
pub fn roman_lower(n: usize) -> String {
    const TABLE: [(usize, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut rest = n;
    let mut out = String::new();
    for (value, glyph) in TABLE {
        while rest >= value {
            out.push_str(glyph);
            rest -= value;
        }
    }
    out
}

/// Wrap a marker in the emphasis tag used for italicized paragraph levels.
///
/// # Example
///
/// ```
/// use regml_label::emphasized;
///
/// assert_eq!(emphasized("1"), "<E T=\"03\">1</E>");
/// ```
pub fn emphasized(marker: &str) -> String {
    format!("<E T=\"03\">{marker}</E>")
}

/// The marker alphabets, in sibling-search priority order.
///
/// Ambiguous segments (`i`, `v`, `x`, ...) resolve to the earliest
/// alphabet that contains them, so `i` is the ninth lowercase letter,
/// not the first roman numeral.
pub fn marker_alphabets() -> Vec<Vec<String>> {
    let lowercase: Vec<String> = ('a'..='z').map(|c| c.to_string()).collect();
    let decimal: Vec<String> = (1..=DEPTH).map(|i| i.to_string()).collect();
    let roman: Vec<String> = (1..=DEPTH).map(roman_lower).collect();
    let uppercase: Vec<String> = ('A'..='Z').map(|c| c.to_string()).collect();
    let em_decimal: Vec<String> = decimal.iter().map(|m| emphasized(m)).collect();
    let em_roman: Vec<String> = roman.iter().map(|m| emphasized(m)).collect();
    vec![lowercase, decimal, roman, uppercase, em_decimal, em_roman]
}
