//! Classification of raw chat text into dialogue inputs

use storeq_api::BotCommand;

/// Button label for stepping back in the query form
pub const BACK_LABEL: &str = "↩️ Volver atrás";

/// Button label for stepping back in the report dialogue
pub const REPORT_BACK_LABEL: &str = "↩️ Volver";

/// Button label that aborts the query form
pub const CANCEL_LABEL: &str = "❌ Finalizar consulta";

/// Button label that aborts the report dialogue
pub const REPORT_CANCEL_LABEL: &str = "❌ Cancelar";

/// One user turn, after global navigation has been recognized.
///
/// Stage-specific shortcuts (quick dates, "no value", report kinds) stay
/// inside [`Input::Text`]; the stage handlers interpret them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// `/start`, `/reportes`, `/help`
    Command(BotCommand),
    Cancel,
    Back,
    /// `/skip`
    Skip,
    Text(String),
}

impl Input {
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Some(command) = BotCommand::parse(trimmed) {
            return match command {
                BotCommand::Cancel => Input::Cancel,
                BotCommand::Skip => Input::Skip,
                other => Input::Command(other),
            };
        }

        if trimmed == CANCEL_LABEL || trimmed == REPORT_CANCEL_LABEL {
            return Input::Cancel;
        }
        if trimmed == BACK_LABEL || trimmed == REPORT_BACK_LABEL {
            return Input::Back;
        }

        match trimmed.to_lowercase().as_str() {
            "cancel" | "cancelar" | "finalizar" => Input::Cancel,
            "back" | "volver" | "atrás" | "atras" => Input::Back,
            _ => Input::Text(trimmed.to_string()),
        }
    }
}
