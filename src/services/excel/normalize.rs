use calamine::Data;
use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::types::CleanGrid;
use super::utils::{detect_column_type, is_blank};

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// Serial day 0 of the 1900 date system, shifted for the 1900 leap-year bug.
fn excel_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    // 2958465 is 9999-12-31, the last date Excel can represent.
    if !serial.is_finite() || serial.abs() > 2_958_466.0 {
        return None;
    }
    let millis = (serial * 86_400_000.0).round() as i64;
    excel_epoch()?.checked_add_signed(Duration::milliseconds(millis))
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Display/serialization string of a single cell. Never fails; anything that
/// cannot be interpreted falls back to its plain textual form.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            excel_serial_to_datetime(serial)
                .map(|d| d.format(DATETIME_FORMAT).to_string())
                .unwrap_or_else(|| format_float(serial))
        }
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(|d| d.format(DATETIME_FORMAT).to_string())
            .unwrap_or_else(|| s.clone()),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

/// Stringifies every cell of the cleaned grid column by column and tags each
/// column with its coarse type.
pub fn normalize_columns(grid: &CleanGrid) -> (Vec<&'static str>, Vec<Vec<String>>) {
    let dtypes = (0..grid.width())
        .map(|idx| detect_column_type(grid.column(idx)))
        .collect();

    let rows = grid
        .rows
        .iter()
        .map(|row| {
            (0..grid.width())
                .map(|idx| match row.get(idx) {
                    Some(cell) if !is_blank(cell) => cell_to_string(cell),
                    _ => String::new(),
                })
                .collect()
        })
        .collect();

    (dtypes, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;

    #[test]
    fn test_excel_serial_dates() {
        let dt = excel_serial_to_datetime(45292.5).unwrap();
        assert_eq!(dt.format(DATETIME_FORMAT).to_string(), "2024-01-01 12:00:00");

        let dt = excel_serial_to_datetime(1.0).unwrap();
        assert_eq!(dt.format(DATETIME_FORMAT).to_string(), "1899-12-31 00:00:00");

        assert!(excel_serial_to_datetime(f64::NAN).is_none());
    }

    #[test]
    fn test_scalars_to_string() {
        assert_eq!(cell_to_string(&Data::Float(5.0)), "5");
        assert_eq!(cell_to_string(&Data::Float(2.75)), "2.75");
        assert_eq!(cell_to_string(&Data::Int(-3)), "-3");
        assert_eq!(cell_to_string(&Data::Bool(true)), "TRUE");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::Error(CellErrorType::Div0)), "#DIV/0!");
    }

    #[test]
    fn test_iso_datetime_text() {
        assert_eq!(
            cell_to_string(&Data::DateTimeIso("2023-05-06T07:08:09".into())),
            "2023-05-06 07:08:09"
        );
        assert_eq!(
            cell_to_string(&Data::DateTimeIso("2023-05-06".into())),
            "2023-05-06 00:00:00"
        );
        assert_eq!(cell_to_string(&Data::DateTimeIso("garbled".into())), "garbled");
    }

    #[test]
    fn test_normalize_columns_pads_and_tags() {
        let grid = CleanGrid {
            headers: vec!["Qty".into(), "Item".into()],
            rows: vec![
                vec![Data::Float(1.0), Data::String("Desk".into())],
                vec![Data::Int(2)],
            ],
        };
        let (dtypes, rows) = normalize_columns(&grid);
        assert_eq!(dtypes, vec!["numeric", "string"]);
        assert_eq!(rows[0], vec!["1".to_string(), "Desk".to_string()]);
        assert_eq!(rows[1], vec!["2".to_string(), String::new()]);
    }
}
