use std::fmt;

use serde::{Deserialize, Serialize};

/// A recognized spoken command category.
///
/// The vocabulary is closed: four primary intents plus the four numeric
/// help-menu options. Labels the server may emit outside this set are kept
/// verbatim in `Unrecognized` so the fallback feedback string can echo them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Yes,
    No,
    Help,
    Emergency,
    HelpOption(HelpOption),
    Unrecognized(String),
}

/// Numeric sub-options available from the help menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HelpOption {
    Water = 1,
    Food = 2,
    Washroom = 3,
    Pain = 4,
}

impl HelpOption {
    pub const ALL: [HelpOption; 4] = [
        HelpOption::Water,
        HelpOption::Food,
        HelpOption::Washroom,
        HelpOption::Pain,
    ];
}

impl Intent {
    /// Parse a wire label as produced by the classification server.
    pub fn from_label(label: &str) -> Self {
        match label {
            "YES" => Intent::Yes,
            "NO" => Intent::No,
            "HELP" => Intent::Help,
            "EMERGENCY" => Intent::Emergency,
            "1" => Intent::HelpOption(HelpOption::Water),
            "2" => Intent::HelpOption(HelpOption::Food),
            "3" => Intent::HelpOption(HelpOption::Washroom),
            "4" => Intent::HelpOption(HelpOption::Pain),
            other => Intent::Unrecognized(other.to_string()),
        }
    }

    /// The wire label for this intent, inverse of [`Intent::from_label`].
    pub fn label(&self) -> String {
        match self {
            Intent::Yes => "YES".to_string(),
            Intent::No => "NO".to_string(),
            Intent::Help => "HELP".to_string(),
            Intent::Emergency => "EMERGENCY".to_string(),
            Intent::HelpOption(option) => (*option as u8).to_string(),
            Intent::Unrecognized(label) => label.clone(),
        }
    }

    /// The fixed feedback string shown when this intent's action executes.
    ///
    /// Unrecognized labels fall back to a generic `Action: <label>` string.
    pub fn action_feedback(&self) -> String {
        match self {
            Intent::Yes => "Confirmed: YES ✓".to_string(),
            Intent::No => "Confirmed: NO ✗".to_string(),
            Intent::HelpOption(HelpOption::Water) => "Requesting: WATER 💧".to_string(),
            Intent::HelpOption(HelpOption::Food) => "Requesting: FOOD 🍽️".to_string(),
            Intent::HelpOption(HelpOption::Washroom) => "Requesting: WASHROOM 🚻".to_string(),
            Intent::HelpOption(HelpOption::Pain) => "Requesting: PAIN HELP 💊".to_string(),
            other => format!("Action: {}", other.label()),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_roundtrip() {
        for label in ["YES", "NO", "HELP", "EMERGENCY", "1", "2", "3", "4"] {
            let intent = Intent::from_label(label);
            assert_eq!(intent.label(), label);
            assert!(!matches!(intent, Intent::Unrecognized(_)));
        }
    }

    #[test]
    fn test_unknown_label_preserved() {
        let intent = Intent::from_label("MAYBE");
        assert_eq!(intent, Intent::Unrecognized("MAYBE".to_string()));
        assert_eq!(intent.label(), "MAYBE");
    }

    #[test]
    fn test_action_feedback_strings() {
        assert_eq!(Intent::Yes.action_feedback(), "Confirmed: YES ✓");
        assert_eq!(Intent::No.action_feedback(), "Confirmed: NO ✗");
        assert_eq!(
            Intent::from_label("1").action_feedback(),
            "Requesting: WATER 💧"
        );
        assert_eq!(
            Intent::from_label("2").action_feedback(),
            "Requesting: FOOD 🍽️"
        );
        assert_eq!(
            Intent::from_label("3").action_feedback(),
            "Requesting: WASHROOM 🚻"
        );
        assert_eq!(
            Intent::from_label("4").action_feedback(),
            "Requesting: PAIN HELP 💊"
        );
    }

    #[test]
    fn test_action_feedback_fallback() {
        assert_eq!(
            Intent::from_label("MAYBE").action_feedback(),
            "Action: MAYBE"
        );
        // HELP and EMERGENCY never execute as direct actions, but the table
        // still has a defined answer for them.
        assert_eq!(Intent::Help.action_feedback(), "Action: HELP");
    }
}
