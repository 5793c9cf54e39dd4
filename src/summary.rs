//! Derivation of a short human-readable summary from an alert message.

use crate::alert::Alert;
use crate::severity;

/// How many characters of the first line survive into a derived summary.
const SUMMARY_MAX_CHARS: usize = 60;

/// Returns the alert's summary: the explicit one verbatim if supplied,
/// otherwise a short form derived from the message.
///
/// Derivation takes the first line of the message, caps it at 60 characters,
/// cuts it at the first `.` within that prefix, and prepends the severity
/// prefix, in exactly that order. HTML messages are not derived from (there
/// is no HTML stripping here), so they yield an empty summary.
pub(crate) fn derive(alert: &Alert) -> String {
    if let Some(explicit) = alert.explicit_summary() {
        return explicit.to_string();
    }

    if alert.message().is_empty() || alert.is_html() {
        return String::new();
    }

    let first_line = alert.message().lines().next().unwrap_or("");
    let mut summary: String = first_line.chars().take(SUMMARY_MAX_CHARS).collect();
    if let Some(sentence_end) = summary.find('.') {
        summary.truncate(sentence_end);
    }

    let prefix = *severity::summary_prefix_map().resolve(alert.severity());
    format!("{prefix}{summary}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Severity;

    #[test]
    fn test_explicit_summary_bypasses_derivation() {
        let alert = Alert::new("A very long message. With sentences.")
            .with_summary("short form")
            .with_severity(Severity::Error);
        // No severity prefix, no truncation: explicit summaries are verbatim.
        assert_eq!(derive(&alert), "short form");
    }

    #[test]
    fn test_empty_message_yields_empty_summary() {
        let alert = Alert::new("");
        assert_eq!(derive(&alert), "");
    }

    #[test]
    fn test_html_message_yields_empty_summary() {
        let alert = Alert::new("<b>bold claim</b>").with_html(true);
        assert_eq!(derive(&alert), "");
    }

    #[test]
    fn test_takes_first_line_only() {
        let alert = Alert::new("first line\nsecond line");
        assert_eq!(derive(&alert), "first line");
    }

    #[test]
    fn test_caps_at_sixty_characters() {
        let long = "x".repeat(80);
        let alert = Alert::new(long);
        assert_eq!(derive(&alert), "x".repeat(60));
    }

    #[test]
    fn test_cuts_at_first_sentence() {
        let alert = Alert::new("Deploy finished. Took 4 minutes.");
        assert_eq!(derive(&alert), "Deploy finished");
    }

    #[test]
    fn test_length_cap_applies_before_sentence_cap() {
        // The first '.' sits beyond the 60-character cap, so it must not
        // shorten the summary.
        let message = format!("{}. trailing", "y".repeat(70));
        let alert = Alert::new(message);
        assert_eq!(derive(&alert), "y".repeat(60));
    }

    #[test]
    fn test_severity_prefix_is_prepended_last() {
        let alert =
            Alert::new("disk almost full. go clean it up").with_severity(Severity::Warning);
        assert_eq!(derive(&alert), "WARNING: disk almost full");

        let alert = Alert::new("everything is on fire").with_severity(Severity::Critical);
        assert_eq!(derive(&alert), "**CRITICAL ERROR**: everything is on fire");
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let alert = Alert::new("first line. second sentence\nnext line")
            .with_severity(Severity::Error);
        let first = derive(&alert);
        let second = derive(&alert);
        assert_eq!(first, second);
        assert_eq!(first, "ERROR: first line");
    }
}
