//! Minimal SpreadsheetML writer.
//!
//! Produces the smallest package Excel, LibreOffice and `calamine` all open:
//! content types, package and workbook relationships, a workbook, a default
//! stylesheet and one worksheet per sheet. Strings are stored inline so no
//! shared-string table is needed.

use super::sheet::{Cell, Workbook};
use super::CodecError;
use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTENT_TYPES_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs></styleSheet>"#;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Column letters for a zero-based index: 0 → `A`, 25 → `Z`, 26 → `AA`.
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

/// Sheet names are limited to 31 characters and may not contain `[]:*?/\`.
fn sanitize_sheet_name(name: &str, index: usize) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if cleaned.trim().is_empty() {
        format!("Sheet{}", index + 1)
    } else {
        cleaned
    }
}

fn worksheet_xml(rows: &[Vec<Cell>]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{MAIN_NS}"><sheetData>"#
    );
    for (r, row) in rows.iter().enumerate() {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        let row_num = r + 1;
        let _ = write!(xml, r#"<row r="{row_num}">"#);
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{row_num}", column_name(c));
            match cell {
                Cell::Empty => {}
                Cell::Text(s) if s.is_empty() => {}
                Cell::Text(s) => {
                    let _ = write!(
                        xml,
                        r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                        escape(s.as_str())
                    );
                }
                Cell::Number(n) => {
                    let _ = write!(xml, r#"<c r="{reference}"><v>{n}</v></c>"#);
                }
                Cell::Bool(b) => {
                    let _ = write!(xml, r#"<c r="{reference}" t="b"><v>{}</v></c>"#, u8::from(*b));
                }
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Serialise `workbook` as an `.xlsx` package.
pub fn write(workbook: &Workbook) -> Result<Vec<u8>, CodecError> {
    if workbook.sheets.is_empty() {
        return Err(CodecError::Malformed("workbook has no sheets".into()));
    }

    let mut content_types = CONTENT_TYPES_HEAD.to_string();
    let mut sheets_xml = String::new();
    let mut rels_xml = String::new();
    for i in 1..=workbook.sheets.len() {
        let _ = write!(
            content_types,
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        );
        let _ = write!(
            rels_xml,
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        );
    }
    content_types.push_str("</Types>");
    let styles_rel = workbook.sheets.len() + 1;
    let _ = write!(
        rels_xml,
        r#"<Relationship Id="rId{styles_rel}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#
    );

    for (i, sheet) in workbook.sheets.iter().enumerate() {
        let _ = write!(
            sheets_xml,
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape(sanitize_sheet_name(&sheet.name, i).as_str()),
            i + 1,
            i + 1
        );
    }

    let workbook_xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>{sheets_xml}</sheets></workbook>"#
    );
    let workbook_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels_xml}</Relationships>"#
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let part = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, body: &str| -> Result<(), CodecError> {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
        Ok(())
    };
    part(&mut zip, "[Content_Types].xml", &content_types)?;
    part(&mut zip, "_rels/.rels", ROOT_RELS)?;
    part(&mut zip, "xl/workbook.xml", &workbook_xml)?;
    part(&mut zip, "xl/_rels/workbook.xml.rels", &workbook_rels)?;
    part(&mut zip, "xl/styles.xml", STYLES)?;
    for (i, sheet) in workbook.sheets.iter().enumerate() {
        part(
            &mut zip,
            &format!("xl/worksheets/sheet{}.xml", i + 1),
            &worksheet_xml(&sheet.rows),
        )?;
    }
    Ok(zip.finish()?.into_inner())
}
