/// Parsed argument text of a roster slash command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterCommand {
    Start,
    Stop,
}

impl RosterCommand {
    /// The word `off` (lowercase, exact) anywhere in the arguments stops
    /// monitoring; anything else starts or renews it.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if text.split_whitespace().any(|word| word == "off") {
            Self::Stop
        } else {
            Self::Start
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("", RosterCommand::Start)]
    #[case("   ", RosterCommand::Start)]
    #[case("on", RosterCommand::Start)]
    #[case("offline", RosterCommand::Start)]
    #[case("off", RosterCommand::Stop)]
    #[case("  off ", RosterCommand::Stop)]
    #[case("OFF", RosterCommand::Start)]
    #[case("Off", RosterCommand::Start)]
    #[case("off!", RosterCommand::Start)]
    #[case("please turn it off", RosterCommand::Stop)]
    fn parses_argument_text(#[case] text: &str, #[case] expected: RosterCommand) {
        assert_eq!(RosterCommand::parse(text), expected);
    }
}
