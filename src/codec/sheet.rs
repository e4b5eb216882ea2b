//! Spreadsheets: workbook model, `calamine` reading, CSV and JSON output.
//!
//! Only the first sheet of a workbook is exported. CSV output follows the
//! usual spreadsheet export conventions (comma separator, RFC 4180 quoting,
//! `\n` between rows, `TRUE`/`FALSE` for booleans). JSON output is an array
//! of row objects keyed by the header row.

use super::CodecError;
use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::Timelike;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Cursor;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Text as a spreadsheet would display it in a CSV export.
    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Bool(true) => "TRUE".into(),
            Cell::Bool(false) => "FALSE".into(),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Cell::Empty => Value::Null,
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Value::from(*n as i64),
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}

/// Integral values print without a fractional part.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Number of columns in the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn first_sheet(&self) -> Option<&Sheet> {
        self.sheets.first()
    }
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(_) => match data.as_datetime() {
            Some(dt) if dt.num_seconds_from_midnight() == 0 => Cell::Text(dt.format("%Y-%m-%d").to_string()),
            Some(dt) => Cell::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Cell::Text(data.to_string()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#{e:?}")),
    }
}

/// Read every sheet of an `.xlsx`/`.xls`/`.ods` workbook.
///
/// Rows are anchored at A1 so leading blank rows and columns survive.
pub fn read_workbook(input: &[u8]) -> Result<Workbook, CodecError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(input.to_vec()))?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names().to_vec() {
        let range = workbook.worksheet_range(&name)?;
        let (row_off, col_off) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_off];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; col_off];
            cells.extend(row.iter().map(cell_from_data));
            while cells.last().is_some_and(Cell::is_empty) {
                cells.pop();
            }
            rows.push(cells);
        }
        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        sheets.push(Sheet { name, rows });
    }
    if sheets.is_empty() {
        return Err(CodecError::Malformed("workbook has no sheets".into()));
    }
    Ok(Workbook { sheets })
}

/// First sheet as CSV, without a trailing newline.
pub fn to_csv(sheet: &Sheet) -> Result<String, CodecError> {
    let width = sheet.width();
    if width == 0 {
        return Ok(String::new());
    }
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new());
    for row in &sheet.rows {
        let mut fields: Vec<String> = row.iter().map(Cell::display).collect();
        fields.resize(width, String::new());
        writer.write_record(&fields)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CodecError::Io(e.into_error()))?;
    let mut text = String::from_utf8(bytes)
        .map_err(|e| CodecError::Malformed(format!("CSV output is not UTF-8: {e}")))?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Header keys for the first row: blanks become `__EMPTY`, `__EMPTY_1`, …
/// and repeated names gain `_1`, `_2`, … suffixes.
fn header_keys(header: &[Cell], width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut keys = Vec::with_capacity(width);
    for col in 0..width {
        let raw = header.get(col).map(Cell::display).unwrap_or_default();
        let base = if raw.is_empty() { "__EMPTY".to_string() } else { raw };
        let key = match seen.get(&base).copied() {
            None => {
                seen.insert(base.clone(), 1);
                base
            }
            Some(mut n) => {
                let mut candidate = format!("{base}_{n}");
                while seen.contains_key(&candidate) {
                    n += 1;
                    candidate = format!("{base}_{n}");
                }
                seen.insert(base, n + 1);
                seen.insert(candidate.clone(), 1);
                candidate
            }
        };
        keys.push(key);
    }
    keys
}

/// First sheet as a pretty-printed JSON array of row objects.
///
/// Only non-empty cells appear in a row object; rows with no non-empty cell
/// are left out.
pub fn to_json(sheet: &Sheet) -> Result<String, CodecError> {
    let Some((header, body)) = sheet.rows.split_first() else {
        return Ok("[]".into());
    };
    let keys = header_keys(header, sheet.width());
    let records: Vec<Value> = body
        .iter()
        .filter_map(|row| {
            let mut object = Map::new();
            for (key, cell) in keys.iter().zip(row) {
                if !cell.is_empty() {
                    object.insert(key.clone(), cell.to_json());
                }
            }
            (!object.is_empty()).then_some(Value::Object(object))
        })
        .collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Interpret a CSV field the way a spreadsheet import would.
fn parse_field(field: &str) -> Cell {
    if field.is_empty() {
        return Cell::Empty;
    }
    match field.to_ascii_uppercase().as_str() {
        "TRUE" => return Cell::Bool(true),
        "FALSE" => return Cell::Bool(false),
        _ => {}
    }
    let numeric_chars = field
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if numeric_chars && field.chars().any(|c| c.is_ascii_digit()) {
        if let Ok(n) = field.parse::<f64>() {
            if n.is_finite() {
                return Cell::Number(n);
            }
        }
    }
    Cell::Text(field.to_string())
}

/// Parse CSV text into a one-sheet workbook named `Sheet1`.
pub fn from_csv(input: &str) -> Result<Workbook, CodecError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut cells: Vec<Cell> = record.iter().map(parse_field).collect();
        while cells.last().is_some_and(Cell::is_empty) {
            cells.pop();
        }
        rows.push(cells);
    }
    Ok(Workbook {
        sheets: vec![Sheet {
            name: "Sheet1".into(),
            rows,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(rows: Vec<Vec<Cell>>) -> Sheet {
        Sheet {
            name: "Sheet1".into(),
            rows,
        }
    }

    fn t(s: &str) -> Cell {
        Cell::Text(s.into())
    }

    #[test]
    fn csv_quotes_and_pads() {
        let s = sheet(vec![
            vec![t("name"), t("note")],
            vec![t("a,b"), t("say \"hi\"")],
            vec![Cell::Number(1.5)],
            vec![Cell::Bool(true), Cell::Number(3.0)],
        ]);
        assert_eq!(
            to_csv(&s).unwrap(),
            "name,note\n\"a,b\",\"say \"\"hi\"\"\"\n1.5,\nTRUE,3"
        );
    }

    #[test]
    fn json_uses_header_keys_and_skips_blank_rows() {
        let s = sheet(vec![
            vec![t("id"), t(""), t("id")],
            vec![Cell::Number(1.0), t("x"), Cell::Number(2.25)],
            vec![],
            vec![Cell::Empty, Cell::Bool(false)],
        ]);
        let json: Value = serde_json::from_str(&to_json(&s).unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"id": 1, "__EMPTY": "x", "id_1": 2.25},
                {"__EMPTY": false}
            ])
        );
    }

    #[test]
    fn json_is_pretty_printed_in_column_order() {
        let s = sheet(vec![vec![t("b"), t("a")], vec![Cell::Number(2.0), Cell::Number(1.0)]]);
        assert_eq!(to_json(&s).unwrap(), "[\n  {\n    \"b\": 2,\n    \"a\": 1\n  }\n]");
    }

    #[test]
    fn header_keys_disambiguate() {
        let header = vec![t("a"), t("a"), t(""), t(""), t("a_1")];
        assert_eq!(
            header_keys(&header, 5),
            vec!["a", "a_1", "__EMPTY", "__EMPTY_1", "a_1_1"]
        );
    }

    #[test]
    fn csv_fields_are_coerced() {
        let wb = from_csv("\u{feff}n,flag,text,blank\n-4.5e1,true,12a,\n").unwrap();
        let rows = &wb.first_sheet().unwrap().rows;
        assert_eq!(rows[0], vec![t("n"), t("flag"), t("text"), t("blank")]);
        assert_eq!(rows[1], vec![Cell::Number(-45.0), Cell::Bool(true), t("12a")]);
    }

    #[test]
    fn csv_round_trip_keeps_values() {
        let s = sheet(vec![
            vec![t("city"), t("pop")],
            vec![t("Oslo, NO"), Cell::Number(709037.0)],
            vec![t("Bergen"), Cell::Number(0.5)],
        ]);
        let back = from_csv(&to_csv(&s).unwrap()).unwrap();
        assert_eq!(back.first_sheet().unwrap().rows, s.rows);
    }

    #[test]
    fn empty_sheet_json_is_empty_array() {
        assert_eq!(to_json(&sheet(vec![])).unwrap(), "[]");
    }
}
