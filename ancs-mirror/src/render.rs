//! Console presentation of engine output

use ancs_client::{EngineOutput, NotificationSummary};
use data_encoding::HEXLOWER;

/// Messages longer than this are cut short on screen
pub const MESSAGE_PREVIEW_CHARS: usize = 200;

pub fn format_output(output: &EngineOutput) -> String {
    match output {
        EngineOutput::Notice(event) => format!("[ns] {event}"),
        EngineOutput::Summary(summary) => format_summary(summary),
        EngineOutput::Error(e) => format!("[error] {e}"),
    }
}

pub fn format_summary(summary: &NotificationSummary) -> String {
    let mut lines = vec![format!("[ds] Notification Attributes (uid={}):", summary.uid)];

    if let Some(app_id) = &summary.app_id {
        lines.push(format!("     App: {app_id}"));
    }
    if let Some(title) = &summary.title {
        lines.push(format!("   Title: {title}"));
    }
    if let Some(message) = &summary.message {
        lines.push(format!(" Message: {}", preview(message)));
    }
    if summary.is_empty() {
        lines.push(format!("   (no attributes) raw={}", HEXLOWER.encode(&summary.raw)));
    }

    lines.join("\n")
}

/// Cut `message` to [`MESSAGE_PREVIEW_CHARS`] characters, marking the cut
pub fn preview(message: &str) -> String {
    match message.char_indices().nth(MESSAGE_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &message[..cut]),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ancs_client::{Category, EventFlags, EventKind, NotificationEvent};

    #[test]
    fn test_summary_lines() {
        let summary = NotificationSummary {
            uid: 7,
            app_id: Some("com.apple.MobileSMS".to_string()),
            title: Some("Alice".to_string()),
            message: Some("Hi!".to_string()),
            raw: Vec::new(),
        };

        assert_eq!(
            format_summary(&summary),
            "[ds] Notification Attributes (uid=7):\n     App: com.apple.MobileSMS\n   Title: Alice\n Message: Hi!"
        );
    }

    #[test]
    fn test_empty_summary() {
        let summary = NotificationSummary { uid: 3, raw: vec![0x03, 0x00, 0x00, 0x00, 0x2F, 0x00, 0x00], ..Default::default() };

        assert_eq!(
            format_summary(&summary),
            "[ds] Notification Attributes (uid=3):\n   (no attributes) raw=030000002f0000"
        );
    }

    #[test]
    fn test_preview_counts_chars() {
        let short = "é".repeat(MESSAGE_PREVIEW_CHARS);
        assert_eq!(preview(&short), short);

        let long = "é".repeat(MESSAGE_PREVIEW_CHARS + 1);
        let cut = preview(&long);
        assert_eq!(cut.chars().count(), MESSAGE_PREVIEW_CHARS + 1);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_notice_line() {
        let event = NotificationEvent {
            kind: EventKind::Modified,
            flags: EventFlags::SILENT,
            category: Category::Email,
            category_count: 3,
            uid: 12,
        };

        assert_eq!(
            format_output(&EngineOutput::Notice(event)),
            "[ns] Modified: uid=12 category=Email (count=3) flags=0b00000001"
        );
    }
}
