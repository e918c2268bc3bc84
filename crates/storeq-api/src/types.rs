//! Reply and command types shared by the core and the transports

use serde::{Deserialize, Serialize};
use std::fmt;

/// Commands a user can issue with a leading slash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotCommand {
    /// Begin the query form
    Start,
    /// Begin the report dialogue (`/reportes` or `/reports`)
    Reports,
    /// Static help text
    Help,
    /// Abort whatever dialogue is active
    Cancel,
    /// Leave the current optional field empty
    Skip,
}

impl BotCommand {
    /// Commands advertised to the transport, with their menu descriptions
    pub const MENU: [(BotCommand, &'static str); 4] = [
        (BotCommand::Start, "Iniciar consulta de transacciones"),
        (BotCommand::Reports, "Generar reportes de conexiones"),
        (BotCommand::Help, "Mostrar ayuda"),
        (BotCommand::Cancel, "Cancelar operación actual"),
    ];

    /// Parse a raw message as a slash command.
    ///
    /// Accepts an optional `@botname` suffix and trailing arguments, which
    /// are ignored. Returns `None` for plain text and for unknown commands.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word).to_lowercase();

        match name.as_str() {
            "start" => Some(Self::Start),
            "reportes" | "reports" => Some(Self::Reports),
            "help" | "ayuda" => Some(Self::Help),
            "cancel" => Some(Self::Cancel),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Reports => "reportes",
            Self::Help => "help",
            Self::Cancel => "cancel",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())
    }
}

/// Quick-reply buttons offered with a reply, as rows of labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceSet {
    pub rows: Vec<Vec<String>>,
}

impl ChoiceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row of buttons; empty rows are dropped
    pub fn row<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<String> = labels.into_iter().map(Into::into).collect();
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.rows.iter().flatten().any(|l| l == label)
    }

    /// All labels in row order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }
}

/// A document sent alongside a reply (rendered report)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content: String,
}

/// One outgoing chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,

    /// Buttons to show; `None` leaves the current keyboard alone, an empty set removes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<ChoiceSet>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices: None,
            attachment: None,
        }
    }

    pub fn with_choices(mut self, choices: ChoiceSet) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_commands() {
        assert_eq!(BotCommand::parse("/start"), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("  /START  "), Some(BotCommand::Start));
        assert_eq!(BotCommand::parse("/reportes"), Some(BotCommand::Reports));
        assert_eq!(BotCommand::parse("/reports@storeq_bot"), Some(BotCommand::Reports));
        assert_eq!(BotCommand::parse("/skip now"), Some(BotCommand::Skip));
        assert_eq!(BotCommand::parse("/unknown"), None);
        assert_eq!(BotCommand::parse("start"), None);
        assert_eq!(BotCommand::parse("/"), None);
    }

    #[test]
    fn command_display_round_trips() {
        for (cmd, _) in BotCommand::MENU {
            assert_eq!(BotCommand::parse(&cmd.to_string()), Some(cmd));
        }
    }

    #[test]
    fn choice_set_skips_empty_rows() {
        let choices = ChoiceSet::new()
            .row(["Hoy", "Ayer"])
            .row(Vec::<String>::new())
            .row(["❌ Cancelar"]);

        assert_eq!(choices.rows.len(), 2);
        assert!(choices.contains("Ayer"));
        assert_eq!(choices.labels().count(), 3);
    }

    #[test]
    fn reply_omits_empty_fields_in_json() {
        let json = serde_json::to_string(&Reply::text("hola")).unwrap();
        assert_eq!(json, r#"{"text":"hola"}"#);
    }
}
