//! User-facing texts and quick-reply keyboards

use storeq_api::{BotCommand, ChoiceSet, Reply};
use storeq_util::StoreId;

use crate::{
    validate::{DATE_EXAMPLE, NO_VALUE_LABEL, STORE_ID_EXAMPLE},
    FieldError, FormFields, QueryDate, QueryRequest, QuickDate, ReportKind, Stage, BACK_LABEL,
    CANCEL_LABEL, REPORT_BACK_LABEL, REPORT_CANCEL_LABEL,
};

/// Date keyboard button that asks for format instructions
pub const MANUAL_DATE_LABEL: &str = "📅 Ingresar fecha manual";

/// Store keyboard button that selects every store
pub const ALL_STORES_LABEL: &str = "🏪 Todos los locales";

const NOT_SPECIFIED: &str = "No especificada";

fn form_keyboard(include_back: bool) -> ChoiceSet {
    let keyboard = ChoiceSet::new();
    let keyboard = if include_back {
        keyboard.row([BACK_LABEL])
    } else {
        keyboard
    };
    keyboard.row([CANCEL_LABEL])
}

fn date_keyboard() -> ChoiceSet {
    let [today, yesterday, two, three] = QuickDate::ALL.map(|q| q.label());
    ChoiceSet::new()
        .row([today, yesterday])
        .row([two, three])
        .row([MANUAL_DATE_LABEL])
        .row([BACK_LABEL])
        .row([CANCEL_LABEL])
}

fn optional_keyboard() -> ChoiceSet {
    ChoiceSet::new()
        .row([NO_VALUE_LABEL])
        .row([BACK_LABEL])
        .row([CANCEL_LABEL])
}

fn report_type_keyboard() -> ChoiceSet {
    ChoiceSet::new()
        .row([ReportKind::Flat.label(), ReportKind::Grouped.label()])
        .row([REPORT_CANCEL_LABEL])
}

/// Stores two per row, then "all", then navigation
pub fn store_keyboard(stores: &[StoreId]) -> ChoiceSet {
    let mut keyboard = ChoiceSet::new();
    for pair in stores.chunks(2) {
        keyboard = keyboard.row(pair.iter().map(StoreId::as_str));
    }
    keyboard
        .row([ALL_STORES_LABEL])
        .row([REPORT_BACK_LABEL, REPORT_CANCEL_LABEL])
}

/// Terminal replies remove any quick-reply keyboard
fn closing(reply: Reply) -> Reply {
    reply.with_choices(ChoiceSet::new())
}

fn optional_text(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_SPECIFIED)
}

pub fn welcome() -> Reply {
    Reply::text(format!(
        "🤖 Bienvenido al Bot de Consultas KFC 🍗\n\n\
         Te ayudaré a consultar el estado de las transacciones de forma sencilla.\n\n\
         Por favor, ingresa el número de local (ejemplo: {}):",
        STORE_ID_EXAMPLE
    ))
    .with_choices(form_keyboard(false))
}

/// Prompt for `stage`, mentioning whatever the form already holds
pub fn stage_prompt(stage: Stage, form: &FormFields, stores: &[StoreId]) -> Reply {
    match stage {
        Stage::CollectStore => Reply::text(format!(
            "Por favor, ingresa el número de local (ejemplo: {}):",
            STORE_ID_EXAMPLE
        ))
        .with_choices(form_keyboard(false)),
        Stage::CollectDate => {
            let mut text = String::new();
            if let Some(store) = &form.store_id {
                text.push_str(&format!("🏪 Local actual: {}\n", store));
            }
            text.push_str("📅 Selecciona la fecha de la transacción:");
            Reply::text(text).with_choices(date_keyboard())
        }
        Stage::CollectReference => {
            let mut text = String::new();
            if let Some(store) = &form.store_id {
                text.push_str(&format!("🏪 Local: {}\n", store));
            }
            if let Some(date) = &form.date {
                text.push_str(&format!("📅 Fecha: {}\n", date));
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(
                "🔢 ¿Tienes un número de referencia? (Opcional)\n\nSi no tienes, presiona 'No tengo'",
            );
            Reply::text(text).with_choices(optional_keyboard())
        }
        Stage::CollectAuthorization => Reply::text(
            "✅ ¿Tienes un número de autorización? (Opcional)\n\nSi no tienes, presiona 'No tengo'",
        )
        .with_choices(optional_keyboard()),
        Stage::ReportSelectType => report_menu(),
        Stage::ReportSelectStore => Reply::text(format!(
            "Selecciona el local para el reporte:\n\n📍 Locales disponibles: {}",
            stores.len()
        ))
        .with_choices(store_keyboard(stores)),
    }
}

pub fn store_accepted(store: &StoreId) -> Reply {
    Reply::text(format!(
        "🏪 Local registrado: {}\n\n📅 Ahora selecciona la fecha de la transacción:",
        store
    ))
    .with_choices(date_keyboard())
}

pub fn date_accepted(date: &QueryDate) -> Reply {
    Reply::text(format!(
        "📅 Fecha seleccionada: {}\n\n\
         🔢 ¿Tienes un número de referencia? (Opcional)\n\n\
         Si no tienes, presiona 'No tengo'",
        date
    ))
    .with_choices(optional_keyboard())
}

pub fn reference_accepted(reference: Option<&str>) -> Reply {
    Reply::text(format!(
        "🔢 Referencia: {}\n\n\
         ✅ ¿Tienes un número de autorización? (Opcional)\n\n\
         Si no tienes, presiona 'No tengo'",
        optional_text(reference)
    ))
    .with_choices(optional_keyboard())
}

pub fn manual_date_hint() -> Reply {
    Reply::text(format!(
        "📅 Por favor ingresa la fecha en formato DD/MM/AAAA\nEjemplo: {}",
        DATE_EXAMPLE
    ))
    .with_choices(form_keyboard(true))
}

/// Validation failure, re-asking the same stage
pub fn invalid_input(stage: Stage, error: &FieldError) -> Reply {
    let retry = match error {
        FieldError::InvalidFormat { .. } => {
            "Ejemplos válidos: kfc001, kfc023, kfc156".to_string()
        }
        FieldError::InvalidDate { .. } => "Por favor ingresa la fecha nuevamente:".to_string(),
    };
    let keyboard = match stage {
        Stage::CollectDate => date_keyboard(),
        _ => form_keyboard(stage.previous().is_some()),
    };
    Reply::text(format!("❌ {}\n\n{}", error, retry)).with_choices(keyboard)
}

pub fn back_at_first_stage(stage: Stage) -> Reply {
    let prompt = stage_prompt(stage, &FormFields::default(), &[]);
    Reply {
        text: format!("No hay un paso anterior.\n\n{}", prompt.text),
        ..prompt
    }
}

pub fn going_back(stage: Stage, form: &FormFields, stores: &[StoreId]) -> Reply {
    let prompt = stage_prompt(stage, form, stores);
    Reply {
        text: format!("↩️ Volviendo...\n\n{}", prompt.text),
        ..prompt
    }
}

pub fn skip_not_allowed(stage: Stage, form: &FormFields, stores: &[StoreId]) -> Reply {
    let prompt = stage_prompt(stage, form, stores);
    Reply {
        text: format!(
            "⚠️ /skip solo se puede usar para la referencia o la autorización.\n\n{}",
            prompt.text
        ),
        ..prompt
    }
}

pub fn summary(request: &QueryRequest) -> Reply {
    Reply::text(format!(
        "📋 Resumen de tu consulta:\n\n\
         🏪 Local: {}\n\
         📅 Fecha: {}\n\
         🔢 Referencia: {}\n\
         ✅ Autorización: {}\n\n\
         🔍 Procesando consulta...",
        request.store_id,
        request.date,
        optional_text(request.reference.as_deref()),
        optional_text(request.authorization.as_deref())
    ))
}

pub fn query_results(request: &QueryRequest, connection_id: &str, rows: &[String]) -> Reply {
    let body = if rows.is_empty() {
        "No se encontraron resultados.".to_string()
    } else {
        rows.join("\n")
    };
    closing(Reply::text(format!(
        "📊 Resultados de la Consulta\n\n\
         🔗 ID de Conexión: {}\n\
         🏪 Local: {}\n\
         📅 Fecha: {}\n\
         🔢 Referencia: {}\n\
         ✅ Autorización: {}\n\n\
         {}\n\n\
         🔄 ¿Quieres hacer otra consulta? Usa /start",
        connection_id,
        request.store_id,
        request.date,
        optional_text(request.reference.as_deref()),
        optional_text(request.authorization.as_deref()),
        body
    )))
}

pub fn query_failed(error: &str) -> Reply {
    closing(Reply::text(format!(
        "❌ Error en la consulta\n\n\
         No se pudo completar la consulta. Error: {}\n\n\
         🔧 Por favor verifica:\n\
         - Que el local exista\n\
         - Que la fecha sea correcta\n\
         - Que tengas conexión a la red\n\n\
         🔄 Intenta nuevamente con /start",
        error
    )))
}

pub fn form_cancelled() -> Reply {
    closing(Reply::text(
        "❌ Consulta finalizada\n\n\
         Todos los datos han sido descartados.\n\n\
         🔄 Si quieres iniciar una nueva consulta, usa /start\n\n\
         👋 ¡Hasta pronto!",
    ))
}

pub fn report_cancelled() -> Reply {
    closing(Reply::text("❌ Generación de reporte cancelada."))
}

pub fn nothing_to_cancel() -> Reply {
    Reply::text("No hay ninguna consulta activa. Usa /start para comenzar.")
}

pub fn no_session() -> Reply {
    Reply::text("Usa /start para iniciar una consulta o /reportes para generar un reporte.")
}

pub fn rate_limited() -> Reply {
    Reply::text("⏳ Estás enviando demasiados mensajes. Espera un momento e intenta de nuevo.")
}

pub fn help() -> Reply {
    let mut text = String::from("🤖 Bot de Consultas KFC - Comandos Disponibles\n\n");
    for (command, description) in BotCommand::MENU {
        text.push_str(&format!("{} - {}\n", command, description));
    }
    text.push_str(
        "\n🔄 Flujo de consulta:\n\
         1. 🏪 Ingresa el local (ej: kfc004)\n\
         2. 📅 Selecciona la fecha\n\
         3. 🔢 Ingresa referencia (opcional)\n\
         4. ✅ Ingresa autorización (opcional)\n\n\
         📊 Sistema de Reportes:\n\
         - Genera reportes CSV con todas las conexiones\n\
         - Estadísticas por local y fecha\n\
         - Datos de consultas realizadas\n\n\
         🔧 Soporte: Si tienes problemas, contacta al administrador.",
    );
    Reply::text(text)
}

pub fn report_menu() -> Reply {
    Reply::text(format!(
        "📊 Sistema de Reportes\n\n\
         Selecciona el tipo de reporte que deseas generar:\n\n\
         • {}: Archivo CSV con todos los datos de conexiones\n\
         • {}: Archivo de texto con estadísticas y análisis",
        ReportKind::Flat.label(),
        ReportKind::Grouped.label()
    ))
    .with_choices(report_type_keyboard())
}

pub fn unknown_report_type(input: &str) -> Reply {
    let menu = report_menu();
    Reply {
        text: format!("❌ Tipo de reporte no reconocido: '{}'\n\n{}", input, menu.text),
        ..menu
    }
}

pub fn unknown_store(input: &str, stores: &[StoreId]) -> Reply {
    Reply::text(format!(
        "❌ El local '{}' no tiene conexiones registradas. Selecciona uno de la lista:",
        input
    ))
    .with_choices(store_keyboard(stores))
}

pub fn store_selection(kind: ReportKind, stores: &[StoreId]) -> Reply {
    Reply::text(format!(
        "📊 {}\n\nSelecciona el local para el reporte:\n\n📍 Locales disponibles: {}",
        kind.label(),
        stores.len()
    ))
    .with_choices(store_keyboard(stores))
}

pub fn no_report_data() -> Reply {
    closing(Reply::text(
        "📊 Sistema de Reportes\n\n\
         ❌ No hay datos de conexiones registrados todavía.\n\n\
         Los reportes se generan automáticamente cuando los usuarios realizan consultas con /start",
    ))
}

pub fn generating(kind: ReportKind, selection: &str) -> Reply {
    Reply::text(format!(
        "⏳ Generando {}...\n\n🔍 Local: {}\nPor favor espera mientras se procesan los datos...",
        kind.label(),
        selection
    ))
}

pub fn report_empty() -> Reply {
    closing(Reply::text("ℹ️ No se encontraron datos de conexiones para los filtros aplicados"))
}

pub fn report_failed(error: &str) -> Reply {
    closing(Reply::text(format!("❌ Error al generar reporte\n\n{}", error)))
}

pub fn report_done() -> Reply {
    closing(Reply::text("✅ Reporte completado\n\n¿Necesitas otro reporte? Usa /reportes nuevamente."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_keyboard_layout() {
        let reply = stage_prompt(Stage::CollectDate, &FormFields::default(), &[]);
        let keyboard = reply.choices.unwrap();
        assert_eq!(keyboard.rows[0], ["Hoy", "Ayer"]);
        assert_eq!(keyboard.rows[1], ["Hace 2 días", "Hace 3 días"]);
        assert_eq!(keyboard.rows[2], [MANUAL_DATE_LABEL]);
        assert_eq!(keyboard.rows[3], [BACK_LABEL]);
        assert_eq!(keyboard.rows[4], [CANCEL_LABEL]);
    }

    #[test]
    fn first_stage_offers_no_back() {
        let keyboard = welcome().choices.unwrap();
        assert!(!keyboard.contains(BACK_LABEL));
        assert!(keyboard.contains(CANCEL_LABEL));
    }

    #[test]
    fn stores_two_per_row() {
        let stores: Vec<_> = ["KFC001", "KFC002", "KFC003"].into_iter().map(StoreId::new).collect();
        let keyboard = store_keyboard(&stores);
        assert_eq!(keyboard.rows[0], ["KFC001", "KFC002"]);
        assert_eq!(keyboard.rows[1], ["KFC003"]);
        assert_eq!(keyboard.rows[2], [ALL_STORES_LABEL]);
        assert_eq!(keyboard.rows[3], [REPORT_BACK_LABEL, REPORT_CANCEL_LABEL]);
    }

    #[test]
    fn help_lists_every_menu_command() {
        let text = help().text;
        for (command, _) in BotCommand::MENU {
            assert!(text.contains(&command.to_string()));
        }
    }

    #[test]
    fn missing_optional_fields_read_not_specified() {
        let request = QueryRequest {
            store_id: StoreId::new("KFC004"),
            date: QueryDate::new(chrono::NaiveDate::from_ymd_opt(2024, 8, 27).unwrap()),
            reference: None,
            authorization: Some("AUTH123".into()),
        };
        let text = summary(&request).text;
        assert!(text.contains("🔢 Referencia: No especificada"));
        assert!(text.contains("✅ Autorización: AUTH123"));
        assert!(text.contains("📅 Fecha: 27/08/2024"));
    }
}
