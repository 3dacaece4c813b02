//! Notification content construction.
//!
//! This module provides the titles and bodies shown on each phase
//! transition, plus a small builder for ad-hoc content.

/// Maximum length for titles and bodies.
const MAX_TEXT_LENGTH: usize = 200;

/// Title and body of a desktop notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

/// Builder for constructing notification content.
#[derive(Debug, Default)]
pub struct NotificationContentBuilder {
    title: String,
    body: String,
}

impl NotificationContentBuilder {
    /// Creates a new notification content builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the notification title.
    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.title = sanitize_text(title);
        self
    }

    /// Sets the notification body text.
    #[must_use]
    pub fn body(mut self, body: &str) -> Self {
        self.body = sanitize_text(body);
        self
    }

    /// Builds and returns the notification content.
    #[must_use]
    pub fn build(self) -> NotificationContent {
        NotificationContent {
            title: self.title,
            body: self.body,
        }
    }
}

/// Truncates text and strips control characters.
pub fn sanitize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control())
        .take(MAX_TEXT_LENGTH)
        .collect()
}

/// Formats a minute count without a trailing ".0" (20 → "20", 0.5 → "0.5").
pub fn format_minutes(minutes: f64) -> String {
    if minutes.fract() == 0.0 {
        format!("{}", minutes as u64)
    } else {
        format!("{}", minutes)
    }
}

/// Content shown when a focus cycle is started by the user.
#[must_use]
pub fn create_focus_started_content(work_minutes: f64) -> NotificationContent {
    NotificationContentBuilder::new()
        .title("Focus started")
        .body(&format!("Next break in {} min", format_minutes(work_minutes)))
        .build()
}

/// Content shown when a break begins.
#[must_use]
pub fn create_break_time_content() -> NotificationContent {
    NotificationContentBuilder::new()
        .title("Break time")
        .body("Look ~6 m (20 ft) away & blink slowly.")
        .build()
}

/// Content shown when a break ends and focus resumes.
#[must_use]
pub fn create_back_to_focus_content(work_minutes: f64) -> NotificationContent {
    NotificationContentBuilder::new()
        .title("Back to focus")
        .body(&format!("Next break in {} min", format_minutes(work_minutes)))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_started() {
        let content = create_focus_started_content(20.0);
        assert_eq!(content.title, "Focus started");
        assert_eq!(content.body, "Next break in 20 min");
    }

    #[test]
    fn test_break_time() {
        let content = create_break_time_content();
        assert_eq!(content.title, "Break time");
        assert!(content.body.contains("blink"));
    }

    #[test]
    fn test_back_to_focus_fractional_minutes() {
        let content = create_back_to_focus_content(0.5);
        assert_eq!(content.title, "Back to focus");
        assert_eq!(content.body, "Next break in 0.5 min");
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("a\u{7}b\nc"), "abc");
        assert_eq!(sanitize_text(&"x".repeat(500)).len(), MAX_TEXT_LENGTH);
    }

    #[test]
    fn test_builder() {
        let content = NotificationContentBuilder::new()
            .title("Title")
            .body("Body")
            .build();
        assert_eq!(
            content,
            NotificationContent {
                title: "Title".to_string(),
                body: "Body".to_string(),
            }
        );
    }
}
