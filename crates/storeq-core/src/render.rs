//! Turn built reports into downloadable documents

use chrono::{DateTime, Local};
use std::fmt::{self, Write as _};
use storeq_api::Attachment;
use storeq_store::{write_csv, ConnectionRecord};
use storeq_util::{format_date_display, format_file_timestamp, format_iso_date, TIME_FORMAT};

use crate::{GroupedReport, Report, ReportKind, ReportResult, StoreFilter};

const FILE_PREFIX: &str = "reporte_conexiones";

/// `reporte_conexiones_<store|todos>_<YYYYMMDD_HHMMSS>.<csv|txt>`
pub fn report_filename(kind: ReportKind, filter: &StoreFilter, generated_at: &DateTime<Local>) -> String {
    let extension = match kind {
        ReportKind::Flat => "csv",
        ReportKind::Grouped => "txt",
    };
    format!(
        "{}_{}_{}.{}",
        FILE_PREFIX,
        filter,
        format_file_timestamp(generated_at),
        extension
    )
}

/// Message sent alongside the document
pub fn report_caption(report: &Report) -> String {
    format!(
        "Reporte generado exitosamente. {} registros encontrados.",
        report.records().len()
    )
}

pub fn render_csv(records: &[ConnectionRecord]) -> ReportResult<String> {
    let mut buf = Vec::new();
    write_csv(&mut buf, records)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn render_detailed(
    grouped: &GroupedReport,
    filter: &StoreFilter,
    generated_at: &DateTime<Local>,
) -> Result<String, fmt::Error> {
    let mut out = String::new();

    writeln!(out, "REPORTE DETALLADO DE CONEXIONES")?;
    writeln!(out, "===============================")?;
    writeln!(
        out,
        "Generado: {} {}",
        format_date_display(generated_at.date_naive()),
        generated_at.format(TIME_FORMAT)
    )?;
    writeln!(
        out,
        "Local: {}",
        match filter.store_id() {
            Some(id) => id.to_string(),
            None => "Todos los locales".to_string(),
        }
    )?;
    writeln!(out, "Total de conexiones: {}", grouped.records.len())?;
    writeln!(out)?;

    writeln!(out, "RESUMEN POR LOCAL")?;
    writeln!(out, "-----------------")?;
    for summary in &grouped.by_store {
        writeln!(
            out,
            "{}: {} conexiones (primera: {}, última: {})",
            summary.store_id,
            summary.count,
            format_iso_date(summary.first_request),
            format_iso_date(summary.last_request)
        )?;
    }
    writeln!(out)?;

    writeln!(out, "RESUMEN POR FECHA")?;
    writeln!(out, "-----------------")?;
    for day in &grouped.by_date {
        writeln!(out, "{}: {} conexiones", format_iso_date(day.request_date), day.count)?;
    }
    writeln!(out)?;

    writeln!(out, "DETALLE DE CONEXIONES")?;
    writeln!(out, "---------------------")?;
    for record in &grouped.records {
        writeln!(
            out,
            "{} {} | {} | consulta {} | usuario {} | {} | {}",
            format_iso_date(record.request_date),
            record.request_time.format(TIME_FORMAT),
            record.store_id,
            format_date_display(record.queried_date),
            record.user_id,
            record.status,
            record.connection_id
        )?;
    }

    Ok(out)
}

/// Render a report as the attachment delivered to the user
pub fn render_attachment(
    report: &Report,
    filter: &StoreFilter,
    generated_at: &DateTime<Local>,
) -> ReportResult<Attachment> {
    let content = match report {
        Report::Flat(records) => render_csv(records)?,
        Report::Grouped(grouped) => render_detailed(grouped, filter, generated_at)?,
    };

    Ok(Attachment {
        filename: report_filename(report.kind(), filter, generated_at),
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{summarize_by_date, summarize_by_store, ReportError};
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use storeq_store::RecordStatus;
    use storeq_util::{ConnectionId, StoreId, UserId};

    fn generated_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 8, 28, 9, 5, 7).unwrap()
    }

    fn record(conn: &str, store: &str, day: u32) -> ConnectionRecord {
        ConnectionRecord {
            connection_id: ConnectionId::new(conn),
            store_id: StoreId::new(store),
            queried_date: NaiveDate::from_ymd_opt(2024, 8, 20).unwrap(),
            request_date: NaiveDate::from_ymd_opt(2024, 8, day).unwrap(),
            request_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            user_id: UserId::new("1001"),
            status: RecordStatus::Success,
        }
    }

    #[test]
    fn filenames() {
        assert_eq!(
            report_filename(ReportKind::Flat, &StoreFilter::All, &generated_at()),
            "reporte_conexiones_todos_20240828_090507.csv"
        );
        assert_eq!(
            report_filename(
                ReportKind::Grouped,
                &StoreFilter::Store(StoreId::new("KFC004")),
                &generated_at()
            ),
            "reporte_conexiones_KFC004_20240828_090507.txt"
        );
    }

    #[test]
    fn empty_csv_is_header_only() {
        let csv = render_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("ID_Conexion,"));
    }

    #[test]
    fn render_failure_reads_as_report_error() {
        let err = ReportError::from(fmt::Error);
        assert_eq!(err.to_string(), "Error generando el documento del reporte");
    }

    #[test]
    fn flat_report_is_csv_with_header() {
        let report = Report::Flat(vec![record("c1", "KFC004", 27)]);
        let attachment = render_attachment(&report, &StoreFilter::All, &generated_at()).unwrap();

        let mut lines = attachment.content.lines();
        assert_eq!(
            lines.next(),
            Some("ID_Conexion,Local,Fecha_Consulta,Fecha_Solicitud,Hora_Solicitud,Usuario,Estado")
        );
        assert_eq!(
            lines.next(),
            Some("c1,KFC004,20240820,2024-08-27,10:30:00,1001,success")
        );
        assert_eq!(report_caption(&report), "Reporte generado exitosamente. 1 registros encontrados.");
    }

    #[test]
    fn detailed_report_sections() {
        let records = vec![
            record("c1", "KFC004", 27),
            record("c2", "KFC004", 26),
            record("c3", "KFC001", 26),
        ];
        let grouped = GroupedReport {
            by_store: summarize_by_store(&records),
            by_date: summarize_by_date(&records),
            records,
        };

        let text = render_detailed(&grouped, &StoreFilter::All, &generated_at()).unwrap();

        assert!(text.contains("Local: Todos los locales"));
        assert!(text.contains("Total de conexiones: 3"));
        assert!(text.contains("KFC004: 2 conexiones (primera: 2024-08-26, última: 2024-08-27)"));
        assert!(text.contains("2024-08-26: 2 conexiones"));
        let by_store = text.find("RESUMEN POR LOCAL").unwrap();
        let by_date = text.find("RESUMEN POR FECHA").unwrap();
        assert!(by_store < by_date);
    }
}
