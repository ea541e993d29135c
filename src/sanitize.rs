use regex::{Captures, Regex};
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*?>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(nbsp|amp|lt|gt|quot|apos|#39|#x27|mdash|ndash|hellip|ldquo|rdquo|lsquo|rsquo);")
        .unwrap()
});

fn entity(name: &str) -> &'static str {
    match name {
        "nbsp" => " ",
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" | "#39" | "#x27" => "'",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "hellip" => "\u{2026}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        _ => "",
    }
}

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200b}'..='\u{200d}' | '\u{feff}')
}

/// Best-effort text cleanup: strip tags, flatten whitespace, decode the
/// common named entities. Not an HTML parser; broken markup may survive.
pub fn sanitize(raw: &str) -> String {
    let text = TAG.replace_all(raw, " ");
    let text = WHITESPACE.replace_all(&text, " ");
    // one pass, so "&amp;lt;" stays "&lt;"
    let text = ENTITY.replace_all(&text, |caps: &Captures| entity(&caps[1]));
    let text: String = text.chars().filter(|&c| !is_invisible(c)).collect();
    // entities such as &nbsp; can reintroduce runs of spaces
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}
