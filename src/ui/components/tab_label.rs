use crate::core::config::types::TabLockIndicator;
use crate::ui::theme::ACCENT;

/// What a tab header shows. `markup` is set only when the text itself
/// carries the lock state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabLabel {
    pub text: String,
    pub show_pin: bool,
    pub markup: Option<String>,
}

impl TabLabel {
    pub fn new(title: &str, locked: bool, indicator: TabLockIndicator) -> Self {
        match indicator {
            TabLockIndicator::Icon => Self {
                text: title.to_string(),
                show_pin: locked,
                markup: None,
            },
            TabLockIndicator::Asterisk => Self {
                text: if locked {
                    format!("* {title}")
                } else {
                    title.to_string()
                },
                show_pin: false,
                markup: None,
            },
            TabLockIndicator::StyledText => Self {
                text: title.to_string(),
                show_pin: false,
                markup: locked.then(|| {
                    format!(
                        "<span foreground=\"{}\">{}</span>",
                        ACCENT.to_hex_rgb8(),
                        escape_markup(title)
                    )
                }),
            },
        }
    }
}

fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicators() {
        let icon = TabLabel::new("src", true, TabLockIndicator::Icon);
        assert_eq!(icon.text, "src");
        assert!(icon.show_pin);

        let star = TabLabel::new("src", true, TabLockIndicator::Asterisk);
        assert_eq!(star.text, "* src");
        assert!(!star.show_pin);
        assert_eq!(TabLabel::new("src", false, TabLockIndicator::Asterisk).text, "src");

        let styled = TabLabel::new("a&b", true, TabLockIndicator::StyledText);
        assert_eq!(
            styled.markup.as_deref(),
            Some("<span foreground=\"#3b82f6\">a&amp;b</span>")
        );
        assert!(TabLabel::new("a", false, TabLockIndicator::StyledText).markup.is_none());
    }
}
