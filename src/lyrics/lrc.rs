use std::time::Duration;

use regex::Regex;

use super::TimedLine;

const TIMESTAMP: &str = r#"\[(\d+):(\d{2})(?:[.:](\d{1,3}))?\]"#;

/// Parse LRC text into lines sorted by offset.
///
/// A line may carry several timestamps (`[00:12.00][01:40.50]chorus`); each one yields an
/// entry. Fractions are read as decimals, so `.5`, `.50` and `.500` are all half a second.
/// Metadata tags such as `[ar:...]` and lines with no text are skipped.
pub fn parse_lrc(lrc: &str) -> Vec<TimedLine> {
    let Ok(re) = Regex::new(TIMESTAMP) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for raw_line in lrc.lines() {
        let mut offsets = Vec::new();
        for cap in re.captures_iter(raw_line) {
            let minutes: u64 = cap[1].parse().unwrap_or(0);
            let seconds: u64 = cap[2].parse().unwrap_or(0);
            let fraction = cap.get(3).map_or("0", |m| m.as_str());
            let millis: u64 = format!("{:0<3}", fraction)[..3].parse().unwrap_or(0);

            offsets.push(Duration::from_millis(
                minutes * 60_000 + seconds * 1_000 + millis,
            ));
        }

        if offsets.is_empty() {
            continue;
        }

        let text = re.replace_all(raw_line, "").trim().to_string();
        if text.is_empty() {
            continue;
        }

        for offset in offsets {
            lines.push(TimedLine {
                offset,
                text: text.clone(),
            });
        }
    }

    lines.sort_by_key(|l| l.offset);
    lines
}
