use tracing::debug;

use super::SubtitleFormat;

// ---------------------------------------------------------------------------
// Subtitle format conversion
// ---------------------------------------------------------------------------
//
// SRT and VTT share the same block shape — an index line, a time-range line,
// and one or more text lines, separated by blank lines — differing in the
// millisecond separator (`,` vs `.`) and VTT's required `WEBVTT` header.
// Conversion is best-effort over a well-known but loosely validated input:
// malformed blocks are skipped, never errored.

/// Convert subtitle content to VTT. Content already in VTT form passes
/// through unchanged, so re-feeding converter output is a no-op.
pub fn to_vtt(source: SubtitleFormat, content: &str) -> String {
    match source {
        SubtitleFormat::Vtt => content.to_string(),
        SubtitleFormat::Srt => srt_to_vtt(content),
    }
}

fn srt_to_vtt(content: &str) -> String {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::from("WEBVTT\n\n");
    let mut skipped = 0usize;

    for block in normalized.trim().split("\n\n") {
        let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();

        // index line + time line + at least one text line
        if lines.len() < 3 {
            skipped += 1;
            continue;
        }

        // SRT: 00:00:01,000 --> 00:00:04,000
        // VTT: 00:00:01.000 --> 00:00:04.000
        let time_line = lines[1].replace(',', ".");

        let text_lines: Vec<String> = lines[2..]
            .iter()
            .map(|line| strip_markup(line))
            .filter(|line| !line.is_empty())
            .collect();

        if text_lines.is_empty() {
            skipped += 1;
            continue;
        }

        out.push_str(&time_line);
        out.push('\n');
        out.push_str(&text_lines.join("\n"));
        out.push_str("\n\n");
    }

    if skipped > 0 {
        debug!(skipped, "dropped malformed subtitle blocks during conversion");
    }

    out
}

/// Remove inline markup tags (`<i>`, `<font ...>`, ...) and trim whitespace.
fn strip_markup(line: &str) -> String {
    let mut cleaned = String::with_capacity(line.len());
    let mut in_tag = false;
    for ch in line.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => cleaned.push(ch),
            _ => {}
        }
    }
    cleaned.trim().to_string()
}
