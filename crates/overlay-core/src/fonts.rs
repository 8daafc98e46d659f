//! Font family resolution
//!
//! Annotations carry a free-form CSS-style family name ("Arial",
//! "Times New Roman", "monospace"). Flattened text is written with one of the
//! PDF standard 14 fonts, so the family is mapped onto the closest of those.

/// Families the resolver recognises, lowercase
const SERIF_HINTS: [&str; 4] = ["times", "georgia", "garamond", "serif"];
const MONO_HINTS: [&str; 5] = ["courier", "mono", "consolas", "monaco", "menlo"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Helvetica,
    Times,
    Courier,
    Symbol,
    ZapfDingbats,
}

/// Resolve a family name (optionally carrying "Bold"/"Italic" in the name)
/// to a standard 14 base font. Unknown names resolve to Helvetica.
pub fn standard_font_for(font_family: &str) -> &'static str {
    let lower = font_family.to_lowercase();
    let bold = lower.contains("bold");
    let italic = lower.contains("italic") || lower.contains("oblique");

    match classify(&lower) {
        Family::Times => match (bold, italic) {
            (true, true) => "Times-BoldItalic",
            (true, false) => "Times-Bold",
            (false, true) => "Times-Italic",
            (false, false) => "Times-Roman",
        },
        Family::Courier => match (bold, italic) {
            (true, true) => "Courier-BoldOblique",
            (true, false) => "Courier-Bold",
            (false, true) => "Courier-Oblique",
            (false, false) => "Courier",
        },
        Family::Helvetica => match (bold, italic) {
            (true, true) => "Helvetica-BoldOblique",
            (true, false) => "Helvetica-Bold",
            (false, true) => "Helvetica-Oblique",
            (false, false) => "Helvetica",
        },
        Family::Symbol => "Symbol",
        Family::ZapfDingbats => "ZapfDingbats",
    }
}

fn classify(lower: &str) -> Family {
    // CSS generic families first, "sans-serif" would otherwise hit "serif"
    match lower.trim() {
        "sans-serif" | "cursive" | "fantasy" | "system-ui" => return Family::Helvetica,
        "serif" => return Family::Times,
        "monospace" => return Family::Courier,
        _ => {}
    }

    if lower.contains("symbol") {
        return Family::Symbol;
    }
    if lower.contains("zapf") || lower.contains("dingbat") {
        return Family::ZapfDingbats;
    }
    if MONO_HINTS.iter().any(|hint| lower.contains(hint)) {
        return Family::Courier;
    }
    if lower.contains("sans") {
        return Family::Helvetica;
    }
    if SERIF_HINTS.iter().any(|hint| lower.contains(hint)) {
        return Family::Times;
    }
    Family::Helvetica
}

/// Encode text for a simple font using WinAnsiEncoding.
/// Characters with no WinAnsi code point become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match c {
        ' '..='~' | '\u{A0}'..='\u{FF}' => c as u8,
        '\t' => b' ',
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => b'?',
    }
}
