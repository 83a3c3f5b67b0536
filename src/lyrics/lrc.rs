use lazy_static::lazy_static;
use regex::Regex;

use super::LyricLine;

lazy_static! {
    static ref TIMESTAMPED: Regex = Regex::new(r"^\[(\d{2}):(\d{2}\.\d{2,3})\](.*)$").unwrap();
}

/// Parses `[mm:ss.xx]text` lines in source order. Header tags, blank spacer
/// lines and anything else that doesn't match are dropped.
pub fn parse(raw: &str) -> Vec<LyricLine> {
    raw.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<LyricLine> {
    let captures = TIMESTAMPED.captures(line)?;
    let minutes = captures[1].parse::<f64>().ok()?;
    let seconds = captures[2].parse::<f64>().ok()?;
    let text = captures[3].trim();
    if text.is_empty() {
        return None;
    }
    Some(LyricLine {
        time: minutes * 60.0 + seconds,
        text: text.to_owned(),
    })
}
