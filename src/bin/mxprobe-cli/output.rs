use anyhow::Result;
#[cfg(not(feature = "with-serde"))]
use anyhow::bail;

use crate::args::Format;
use crate::check::CheckRow;
use crate::mx::MxSummary;

pub fn write_checks(rows: &[CheckRow], format: Format) -> Result<()> {
    match format {
        Format::Human => {
            for row in rows {
                write_check_human(row);
            }
            Ok(())
        }
        Format::Json => write_json(rows),
        Format::Ndjson => write_ndjson(rows),
    }
}

pub fn write_mx(summary: &MxSummary, format: Format) -> Result<()> {
    match format {
        Format::Human => {
            println!("{}  {}", summary.domain, summary.human_summary());
            Ok(())
        }
        Format::Json => write_json(summary),
        Format::Ndjson => write_ndjson(std::slice::from_ref(summary)),
    }
}

fn write_check_human(row: &CheckRow) {
    println!("[{}] {}", row.verdict, row.address);
    if let Some(error) = &row.error {
        println!("        reason: {error}");
    }
    if !row.candidates.is_empty() {
        println!("        mx: {}", row.candidates.join(", "));
    }
    for probe in &row.transcript {
        println!("        -- {}", probe.host);
        for event in &probe.events {
            println!("           {event}");
        }
    }
}

#[cfg(feature = "with-serde")]
fn write_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json<T: ?Sized>(_: &T) -> Result<()> {
    bail!("format=json requires the 'with-serde' feature")
}

#[cfg(feature = "with-serde")]
fn write_ndjson<T: serde::Serialize>(rows: &[T]) -> Result<()> {
    for row in rows {
        println!("{}", serde_json::to_string(row)?);
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson<T>(_: &[T]) -> Result<()> {
    bail!("format=ndjson requires the 'with-serde' feature")
}
