use crate::types::{BookmarkMap, SpeechResult, Transcript};

/// Format seconds as MM:SS.mmm timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let mins = millis / 60_000;
    let secs = (millis / 1000) % 60;
    format!("{:02}:{:02}.{:03}", mins, secs, millis % 1000)
}

/// One line per boundary: start time and token
pub fn format_transcript_with_timestamps(transcript: &Transcript) -> String {
    transcript
        .boundaries
        .iter()
        .map(|b| format!("[{}] {}", format_timestamp(b.start), b.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bookmarks ordered by time, then name
pub fn format_bookmarks(bookmarks: &BookmarkMap) -> String {
    let mut rows: Vec<(&String, &f64)> = bookmarks.iter().collect();
    rows.sort_by(|a, b| a.1.total_cmp(b.1).then_with(|| a.0.cmp(b.0)));

    rows.iter()
        .map(|(name, time)| format!("{}  {}", format_timestamp(**time), name))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_speech_readable(result: &SpeechResult) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "**Duration:** {} | **Words:** {} | **Bookmarks:** {}\n\n",
        format_timestamp(result.duration),
        result.transcript.boundaries.len(),
        result.bookmarks.len()
    ));
    output.push_str(&format!("Audio: {}\n", result.audio_path.display()));

    if !result.bookmarks.is_empty() {
        output.push_str("\n## Bookmarks\n\n");
        output.push_str(&format_bookmarks(&result.bookmarks));
        output.push('\n');
    }

    output
}
