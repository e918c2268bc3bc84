//! CSV export of connection records in the persisted field order

use std::io::{self, Write};
use storeq_util::{format_date_key, format_iso_date, TIME_FORMAT};

use crate::ConnectionRecord;

/// Column headers, in persisted order
pub const CSV_HEADERS: [&str; 7] = [
    "ID_Conexion",
    "Local",
    "Fecha_Consulta",
    "Fecha_Solicitud",
    "Hora_Solicitud",
    "Usuario",
    "Estado",
];

/// Quote a field if it contains a separator, quote, or line break
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_row<W: Write>(out: &mut W, fields: &[&str]) -> io::Result<()> {
    let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
    writeln!(out, "{}", line.join(","))
}

/// Write records as CSV with a header row
pub fn write_csv<'a, W, I>(out: &mut W, records: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a ConnectionRecord>,
{
    write_row(out, &CSV_HEADERS)?;

    for record in records {
        let queried = format_date_key(record.queried_date);
        let request_date = format_iso_date(record.request_date);
        let request_time = record.request_time.format(TIME_FORMAT).to_string();

        write_row(
            out,
            &[
                record.connection_id.as_str(),
                record.store_id.as_str(),
                &queried,
                &request_date,
                &request_time,
                record.user_id.as_str(),
                record.status.as_str(),
            ],
        )?;
    }

    Ok(())
}
