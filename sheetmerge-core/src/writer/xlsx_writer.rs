// ! XLSX writer functionality for creating workbooks and appending sheets

use crate::table::{CellValue, Table};
use anyhow::{Context, Result, bail};
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_DOC_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const CT_WORKBOOK: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CT_WORKSHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CT_RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Result of appending a sheet to an existing workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// A new worksheet part was added
    Appended,
    /// An existing sheet with the same name was overwritten
    Replaced,
    /// A sheet with the same name exists and replacing was not allowed
    Conflict,
}

/// A `<sheet>` entry of xl/workbook.xml
#[derive(Debug, Clone)]
struct SheetEntry {
    name: String,
    sheet_id: u32,
    rel_id: String,
}

/// Spreadsheet column letters for a 0-based index (0 -> A, 26 -> AA)
pub fn column_name(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Render a table as worksheet XML.
///
/// Row 1 holds the column names. With `write_index` the first column holds
/// the row labels under a blank header cell. Null cells are omitted.
pub fn render_worksheet(table: &Table, write_index: bool) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut root = BytesStart::new("worksheet");
    root.push_attribute(("xmlns", NS_MAIN));
    writer.write_event(Event::Start(root))?;
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

    let offset = usize::from(write_index);
    if table.column_count() > 0 {
        start_row(&mut writer, 1)?;
        for (idx, name) in table.columns().iter().enumerate() {
            write_text_cell(&mut writer, &cell_ref(idx + offset, 1), name)?;
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }

    for (pos, row) in table.rows().iter().enumerate() {
        let row_number = pos + 2;
        start_row(&mut writer, row_number)?;
        if write_index {
            write_number_cell(&mut writer, &cell_ref(0, row_number), row.label as f64)?;
        }
        for (idx, cell) in row.cells.iter().enumerate() {
            let reference = cell_ref(idx + offset, row_number);
            match cell {
                Some(CellValue::Number(n)) => write_number_cell(&mut writer, &reference, *n)?,
                Some(CellValue::Text(s)) => write_text_cell(&mut writer, &reference, s)?,
                Some(CellValue::Bool(b)) => write_bool_cell(&mut writer, &reference, *b)?,
                None => {}
            }
        }
        writer.write_event(Event::End(BytesEnd::new("row")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(writer.into_inner().into_inner())
}

fn cell_ref(col: usize, row: usize) -> String {
    format!("{}{}", column_name(col), row)
}

fn start_row<W: Write>(writer: &mut Writer<W>, row_number: usize) -> Result<()> {
    let mut row = BytesStart::new("row");
    row.push_attribute(("r", row_number.to_string().as_str()));
    writer.write_event(Event::Start(row))?;
    Ok(())
}

fn write_text_cell<W: Write>(writer: &mut Writer<W>, reference: &str, text: &str) -> Result<()> {
    let mut cell = BytesStart::new("c");
    cell.push_attribute(("r", reference));
    cell.push_attribute(("t", "inlineStr"));
    writer.write_event(Event::Start(cell))?;
    writer.write_event(Event::Start(BytesStart::new("is")))?;
    let mut t = BytesStart::new("t");
    if text.trim() != text {
        t.push_attribute(("xml:space", "preserve"));
    }
    writer.write_event(Event::Start(t))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new("t")))?;
    writer.write_event(Event::End(BytesEnd::new("is")))?;
    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

fn write_number_cell<W: Write>(writer: &mut Writer<W>, reference: &str, value: f64) -> Result<()> {
    // NaN and infinities have no worksheet representation
    if !value.is_finite() {
        return Ok(());
    }
    let abs = value.abs();
    let text = if abs != 0.0 && !(1e-5..1e15).contains(&abs) {
        format!("{:e}", value)
    } else {
        value.to_string()
    };
    write_value_cell(writer, reference, None, &text)
}

fn write_bool_cell<W: Write>(writer: &mut Writer<W>, reference: &str, value: bool) -> Result<()> {
    write_value_cell(writer, reference, Some("b"), if value { "1" } else { "0" })
}

fn write_value_cell<W: Write>(
    writer: &mut Writer<W>,
    reference: &str,
    cell_type: Option<&str>,
    value: &str,
) -> Result<()> {
    let mut cell = BytesStart::new("c");
    cell.push_attribute(("r", reference));
    if let Some(t) = cell_type {
        cell.push_attribute(("t", t));
    }
    writer.write_event(Event::Start(cell))?;
    writer.write_event(Event::Start(BytesStart::new("v")))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new("v")))?;
    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

/// Create a new workbook at `path` holding a single worksheet
pub fn create_workbook(path: &Path, sheet: &str, worksheet: &[u8]) -> Result<()> {
    let content_types = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="{NS_CONTENT_TYPES}"><Default Extension="rels" ContentType="{CT_RELS}"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/{WORKBOOK_PART}" ContentType="{CT_WORKBOOK}"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="{CT_WORKSHEET}"/></Types>"#
    );
    let root_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{REL_OFFICE_DOCUMENT}" Target="{WORKBOOK_PART}"/></Relationships>"#
    );
    let workbook = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{NS_MAIN}" xmlns:r="{NS_DOC_REL}"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape(sheet)
    );
    let workbook_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{NS_PKG_REL}"><Relationship Id="rId1" Type="{REL_WORKSHEET}" Target="worksheets/sheet1.xml"/></Relationships>"#
    );

    let parts: [(&str, &[u8]); 5] = [
        (CONTENT_TYPES_PART, content_types.as_bytes()),
        ("_rels/.rels", root_rels.as_bytes()),
        (WORKBOOK_PART, workbook.as_bytes()),
        (WORKBOOK_RELS_PART, workbook_rels.as_bytes()),
        ("xl/worksheets/sheet1.xml", worksheet),
    ];

    write_atomically(path, |zip_writer| {
        for (name, content) in parts {
            zip_writer.start_file(name, SimpleFileOptions::default())?;
            zip_writer.write_all(content)?;
        }
        Ok(())
    })
}

/// Add `worksheet` to the existing workbook at `path` under the name `sheet`.
///
/// Every part other than the workbook, its relationships and the content
/// types is copied unchanged. Sheet names are compared case-insensitively,
/// the way Excel does.
pub fn append_sheet(path: &Path, sheet: &str, worksheet: &[u8], replace: bool) -> Result<AppendOutcome> {
    // Read fully so no handle stays open while the file is replaced
    let bytes = fs::read(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .with_context(|| format!("{} is not a zip archive", path.display()))?;

    let workbook_xml = read_file_from_zip(&mut archive, WORKBOOK_PART)?;
    let rels_xml = read_file_from_zip(&mut archive, WORKBOOK_RELS_PART)?;
    let sheets = parse_sheet_entries(&workbook_xml)?;
    let rels = parse_relationships(&rels_xml)?;

    let existing = sheets
        .iter()
        .find(|entry| entry.name.to_lowercase() == sheet.to_lowercase());

    if let Some(entry) = existing {
        if !replace {
            return Ok(AppendOutcome::Conflict);
        }
        let target = rels
            .get(&entry.rel_id)
            .map(|target| resolve_target(target))
            .with_context(|| format!("No relationship {} for sheet '{}'", entry.rel_id, entry.name))?;

        let mut replacements = HashMap::new();
        replacements.insert(target, worksheet.to_vec());
        copy_with_replacements(path, &mut archive, replacements, None)?;
        return Ok(AppendOutcome::Replaced);
    }

    let names: HashSet<String> = archive.file_names().map(str::to_string).collect();
    let part_number = (1..)
        .find(|n| !names.contains(&format!("xl/worksheets/sheet{}.xml", n)))
        .unwrap_or(1);
    let part_name = format!("xl/worksheets/sheet{}.xml", part_number);
    let sheet_id = sheets.iter().map(|s| s.sheet_id).max().unwrap_or(0) + 1;
    let rel_id = next_relationship_id(&rels);

    let mut sheet_elem = BytesStart::new("sheet");
    sheet_elem.push_attribute(("name", sheet));
    sheet_elem.push_attribute(("sheetId", sheet_id.to_string().as_str()));
    sheet_elem.push_attribute(("r:id", rel_id.as_str()));
    let workbook_xml = insert_before_end(&workbook_xml, b"sheets", &sheet_elem)?;

    let mut rel_elem = BytesStart::new("Relationship");
    rel_elem.push_attribute(("Id", rel_id.as_str()));
    rel_elem.push_attribute(("Type", REL_WORKSHEET));
    let rel_target = format!("worksheets/sheet{}.xml", part_number);
    rel_elem.push_attribute(("Target", rel_target.as_str()));
    let rels_xml = insert_before_end(&rels_xml, b"Relationships", &rel_elem)?;

    let content_types_xml = read_file_from_zip(&mut archive, CONTENT_TYPES_PART)?;
    let mut override_elem = BytesStart::new("Override");
    let override_part = format!("/{}", part_name);
    override_elem.push_attribute(("PartName", override_part.as_str()));
    override_elem.push_attribute(("ContentType", CT_WORKSHEET));
    let content_types_xml = insert_before_end(&content_types_xml, b"Types", &override_elem)?;

    let mut replacements = HashMap::new();
    replacements.insert(WORKBOOK_PART.to_string(), workbook_xml.into_bytes());
    replacements.insert(WORKBOOK_RELS_PART.to_string(), rels_xml.into_bytes());
    replacements.insert(CONTENT_TYPES_PART.to_string(), content_types_xml.into_bytes());
    copy_with_replacements(path, &mut archive, replacements, Some((part_name, worksheet)))?;

    Ok(AppendOutcome::Appended)
}

// Helper functions

/// Rewrite the archive to `path`, swapping in replaced parts and appending
/// an optional new part at the end
fn copy_with_replacements(
    path: &Path,
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    mut replacements: HashMap<String, Vec<u8>>,
    added: Option<(String, &[u8])>,
) -> Result<()> {
    write_atomically(path, |zip_writer| {
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            if file.is_dir() {
                zip_writer.add_directory(name.as_str(), SimpleFileOptions::default())?;
                continue;
            }

            zip_writer.start_file(name.as_str(), SimpleFileOptions::default())?;
            if let Some(content) = replacements.remove(&name) {
                zip_writer.write_all(&content)?;
            } else {
                let mut buffer = Vec::new();
                file.read_to_end(&mut buffer)?;
                zip_writer.write_all(&buffer)?;
            }
        }

        if let Some(name) = replacements.keys().next() {
            bail!("Workbook has no part named {}", name);
        }

        if let Some((name, content)) = added {
            zip_writer.start_file(name.as_str(), SimpleFileOptions::default())?;
            zip_writer.write_all(content)?;
        }
        Ok(())
    })
}

/// Build the archive in a sibling temp file and move it over `path`
fn write_atomically<F>(path: &Path, build: F) -> Result<()>
where
    F: FnOnce(&mut ZipWriter<File>) -> Result<()>,
{
    let tmp_path = temp_sibling(path);
    let result = (|| -> Result<()> {
        let file = File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        let mut zip_writer = ZipWriter::new(file);
        build(&mut zip_writer)?;
        zip_writer.finish()?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to move {} into place", tmp_path.display()))?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook".to_string());
    path.with_file_name(format!(".{}.tmp", file_name))
}

fn read_file_from_zip<R: Read + Seek>(archive: &mut ZipArchive<R>, filename: &str) -> Result<String> {
    let mut file = archive
        .by_name(filename)
        .with_context(|| format!("Workbook has no {}", filename))?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

fn parse_sheet_entries(workbook_xml: &str) -> Result<Vec<SheetEntry>> {
    let mut reader = Reader::from_str(workbook_xml);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = String::new();
                let mut sheet_id = 0;
                let mut rel_id = String::new();

                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"name" => name = attr.unescape_value()?.into_owned(),
                        b"sheetId" => sheet_id = attr.unescape_value()?.parse()?,
                        key if attr.key.local_name().as_ref() == b"id" && key != b"id" => {
                            rel_id = attr.unescape_value()?.into_owned();
                        }
                        _ => {}
                    }
                }
                sheets.push(SheetEntry {
                    name,
                    sheet_id,
                    rel_id,
                });
            }
            _ => {}
        }
    }

    Ok(sheets)
}

/// Relationship id -> target
fn parse_relationships(rels_xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(rels_xml);
    let mut rels = HashMap::new();

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = String::new();
                let mut target = String::new();
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"Id" => id = attr.unescape_value()?.into_owned(),
                        b"Target" => target = attr.unescape_value()?.into_owned(),
                        _ => {}
                    }
                }
                rels.insert(id, target);
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Zip entry name for a workbook relationship target
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn next_relationship_id(rels: &HashMap<String, String>) -> String {
    let mut next = rels
        .keys()
        .filter_map(|id| id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()))
        .max()
        .unwrap_or(0)
        + 1;
    while rels.contains_key(&format!("rId{}", next)) {
        next += 1;
    }
    format!("rId{}", next)
}

/// Copy `xml`, emitting `element` as the last child of the first `parent`
fn insert_before_end(xml: &str, parent: &[u8], element: &BytesStart<'_>) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut inserted = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::End(e) if !inserted && e.local_name().as_ref() == parent => {
                writer.write_event(Event::Empty(element.borrow()))?;
                writer.write_event(Event::End(e))?;
                inserted = true;
            }
            Event::Empty(e) if !inserted && e.local_name().as_ref() == parent => {
                writer.write_event(Event::Start(e.borrow()))?;
                writer.write_event(Event::Empty(element.borrow()))?;
                writer.write_event(Event::End(e.to_end()))?;
                inserted = true;
            }
            event => writer.write_event(event)?,
        }
    }

    if !inserted {
        bail!("No <{}> element found", String::from_utf8_lossy(parent));
    }
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}
