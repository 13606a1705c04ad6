//! Helpers for composing menu screens.

/// Assembles screen text from header lines, free text and menus
#[derive(Debug, Default, Clone)]
pub struct DisplayBuilder {
    parts: Vec<String>,
}

impl DisplayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Header lines followed by a blank line
    pub fn header<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let header = lines
            .into_iter()
            .map(|line| line.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        self.parts.push(header);
        self.parts.push(String::new());
        self
    }

    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.parts.push(content.into());
        self
    }

    pub fn menu(mut self, build: impl FnOnce(MenuBuilder) -> MenuBuilder) -> Self {
        self.parts.push(build(MenuBuilder::new()).build());
        self
    }

    pub fn blank_line(mut self) -> Self {
        self.parts.push(String::new());
        self
    }

    pub fn build(self) -> String {
        self.parts.join("\n")
    }
}

/// Numbered menu options
#[derive(Debug, Default, Clone)]
pub struct MenuBuilder {
    options: Vec<String>,
}

impl MenuBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn option(mut self, key: impl std::fmt::Display, text: impl AsRef<str>) -> Self {
        self.options.push(format!("{}. {}", key, text.as_ref()));
        self
    }

    pub fn back_option(self, text: impl AsRef<str>) -> Self {
        self.option("0", text)
    }

    pub fn home_option(self, text: impl AsRef<str>) -> Self {
        self.option("00", text)
    }

    pub fn exit_option(self, text: impl AsRef<str>) -> Self {
        self.option("000", text)
    }

    pub fn build(self) -> String {
        self.options.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_menu() {
        let text = DisplayBuilder::new()
            .header(["Welcome John", "Acme Corp"])
            .menu(|m| m.option(1, "Profile").option(2, "Settings").exit_option("Exit"))
            .build();

        assert_eq!(text, "Welcome John\nAcme Corp\n\n1. Profile\n2. Settings\n000. Exit");
    }

    #[test]
    fn test_navigation_options() {
        let text = MenuBuilder::new()
            .back_option("Back")
            .home_option("Main Menu")
            .build();
        assert_eq!(text, "0. Back\n00. Main Menu");
    }

    #[test]
    fn test_text_and_blank_lines() {
        let text = DisplayBuilder::new()
            .text("Balance: KES 1000")
            .blank_line()
            .text("0. Back")
            .build();
        assert_eq!(text, "Balance: KES 1000\n\n0. Back");
    }
}
