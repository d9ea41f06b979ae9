//! Result formatting

use crate::audio::SpeechSegment;
use crate::lid::LanguageScore;

/// Format as aligned text, one language per line
pub fn format_text(languages: &[LanguageScore]) -> String {
    languages
        .iter()
        .map(|l| format!("{:<8} {:>6.2}%", l.language, l.percentage))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format as a JSON list of `[language, percentage]` pairs
pub fn format_json(languages: &[LanguageScore]) -> String {
    let pairs: Vec<(&str, f64)> = languages
        .iter()
        .map(|l| (l.language.as_str(), l.percentage))
        .collect();

    serde_json::to_string(&pairs).unwrap_or_else(|_| "[]".to_string())
}

/// Contents of `predictions.txt`: the status line, then the JSON result if any
pub fn format_predictions(status: i32, languages: Option<&[LanguageScore]>) -> String {
    let mut output = format!("ret:{}\n", status);
    if let Some(languages) = languages.filter(|l| !l.is_empty()) {
        output.push_str(&format_json(languages));
        output.push('\n');
    }
    output
}

/// One-line summary of a speech segment
pub fn format_segment(segment: &SpeechSegment) -> String {
    format!(
        "#{} [{} --> {}] score {:.3}",
        segment.index + 1,
        format_seconds(segment.start),
        format_seconds(segment.end()),
        segment.score
    )
}

/// Format seconds as HH:MM:SS.mmm (hours omitted when zero)
pub fn format_seconds(seconds: f32) -> String {
    let ms = (seconds.max(0.0) * 1000.0).round() as i64;
    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    let millis = ms % 1000;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, secs, millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result() -> Vec<LanguageScore> {
        vec![
            LanguageScore {
                language: "eng".to_string(),
                percentage: 75.0,
            },
            LanguageScore {
                language: "fra".to_string(),
                percentage: 25.0,
            },
        ]
    }

    #[test]
    fn test_format_text() {
        let formatted = format_text(&make_result());
        let lines: Vec<&str> = formatted.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("eng"));
        assert!(lines[0].ends_with("75.00%"));
        assert!(lines[1].ends_with("25.00%"));
    }

    #[test]
    fn test_format_json() {
        assert_eq!(format_json(&make_result()), r#"[["eng",75.0],["fra",25.0]]"#);
    }

    #[test]
    fn test_format_predictions() {
        let result = make_result();
        assert_eq!(
            format_predictions(3, Some(result.as_slice())),
            "ret:3\n[[\"eng\",75.0],[\"fra\",25.0]]\n"
        );
        assert_eq!(format_predictions(-4, None), "ret:-4\n");
        assert_eq!(format_predictions(0, Some(&[][..])), "ret:0\n");
    }

    #[test]
    fn test_format_segment() {
        let segment = SpeechSegment {
            index: 0,
            start: 61.5,
            duration: 5.0,
            samples: Vec::new(),
            sample_rate: 16000,
            score: 0.8123,
        };
        assert_eq!(format_segment(&segment), "#1 [01:01.500 --> 01:06.500] score 0.812");
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "00:00.000");
        assert_eq!(format_seconds(1.5), "00:01.500");
        assert_eq!(format_seconds(3661.5), "01:01:01.500");
    }
}
