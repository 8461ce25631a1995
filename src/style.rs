use crossterm::style::{Color, Stylize};
use crossterm::tty::IsTty;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Title,
    Prompt,
    Example,
    Success,
    Result,
    Warning,
    Error,
    Farewell,
    Plain,
}

impl Tag {
    fn color(self) -> Option<Color> {
        match self {
            Tag::Title => Some(Color::Cyan),
            Tag::Prompt => Some(Color::Blue),
            Tag::Example => Some(Color::White),
            Tag::Success | Tag::Result => Some(Color::Green),
            Tag::Warning => Some(Color::Yellow),
            Tag::Error => Some(Color::Red),
            Tag::Farewell => Some(Color::Magenta),
            Tag::Plain => None,
        }
    }
}

/// Maps semantic tags to terminal colors, or to nothing when output is not a terminal.
#[derive(Debug, Clone, Copy)]
pub struct Styler {
    enabled: bool,
}

impl Styler {
    pub fn new(enabled: bool) -> Self {
        Styler { enabled }
    }

    pub fn detect() -> Self {
        Self::new(std::io::stdout().is_tty())
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    pub fn paint(&self, tag: Tag, text: &str) -> String {
        match tag.color() {
            Some(color) if self.enabled => text.with(color).to_string(),
            _ => text.to_string(),
        }
    }

    /// A title between two rules as wide as the text itself.
    pub fn banner(&self, tag: Tag, text: &str) -> String {
        let rule = "=".repeat(text.width());
        let framed = format!("{}\n{}\n{}", rule, text, rule);
        self.paint(tag, &framed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_styler_is_a_no_op() {
        let styler = Styler::plain();
        assert_eq!(styler.paint(Tag::Error, "oops"), "oops");
        assert_eq!(styler.paint(Tag::Plain, "text"), "text");
    }

    #[test]
    fn enabled_styler_wraps_in_escape_codes() {
        let styler = Styler::new(true);
        let painted = styler.paint(Tag::Error, "oops");
        assert!(painted.contains("oops"));
        assert!(painted.starts_with("\u{1b}["));
        assert_ne!(painted, "oops");
        // plain tag stays untouched even when enabled
        assert_eq!(styler.paint(Tag::Plain, "text"), "text");
    }

    #[test]
    fn banner_rules_match_text_width() {
        let styler = Styler::plain();
        assert_eq!(
            styler.banner(Tag::Title, "  Exiting.  "),
            "============\n  Exiting.  \n============"
        );
    }
}
