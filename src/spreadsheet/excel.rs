//! Microsoft Office Excel package helpers
use crate::error::ExplorerError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

/// XML tag name for relationship elements in Excel files
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Signature of OLE compound files (legacy `.xls` and encrypted `.xlsx`)
const COMPOUND_FILE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Relationship type suffixes
pub(crate) const REL_WORKSHEET: &str = "/worksheet";
pub(crate) const REL_DRAWING: &str = "/drawing";
pub(crate) const REL_IMAGE: &str = "/image";
pub(crate) const REL_HYPERLINK: &str = "/hyperlink";

/// Opens the ZIP container of an Excel workbook held in memory
///
/// # Arguments
/// * `bytes` - Raw workbook content
///
/// # Returns
/// Zip archive handle over the bytes
pub(super) fn open(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>, ExplorerError> {
    // Legacy binary workbooks and password protected packages are OLE containers
    if is_compound_file(bytes) {
        Err(SpreadsheetError::SpreadsheetBinaryFormatError)?;
    }
    Ok(ZipArchive::new(Cursor::new(bytes))?)
}

/// Loads relationships of one kind from a `.rels` part
///
/// # Arguments
/// * `zip` - Zip archive handle
/// * `path` - Path to the relationships XML file within the archive
/// * `kind` - Relationship type suffix to keep (e.g. `/worksheet`)
///
/// # Returns
/// Mapping of relationship IDs to raw targets; empty when the part is missing
pub(crate) fn load_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
    kind: &str,
) -> Result<HashMap<String, String>, ExplorerError> {
    let mut relationships: HashMap<String, String> = HashMap::new();
    let mut reader = match zip.xml_reader(path)? {
        Some(reader) => reader,
        None => return Ok(relationships),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let relationship_type = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if relationship_type.map(|it| it.ends_with(kind)).unwrap_or(false) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), target.to_string());
                }
            }
        }
    });
    Ok(relationships)
}

/// Returns the `.rels` part path belonging to a package part
///
/// `xl/worksheets/sheet1.xml` → `xl/worksheets/_rels/sheet1.xml.rels`
pub(crate) fn relationships_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((directory, file)) => format!("{directory}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Maps format indexes to cell types using custom and built-in formats
///
/// # Arguments
/// * `format_indexes` - List of format identifiers
/// * `custom_formats` - Custom format mappings defined in the workbook
/// * `is_1904` - Whether the workbook uses the 1904 date system
///
/// # Returns
/// Vector of cell types corresponding to each format index
pub(super) fn load_number_formats(format_indexes: Vec<String>, custom_formats: HashMap<String, CellType>, is_1904: bool) -> Vec<CellType> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect()
}

/// Resolves a relationship target against the directory of the part that owns it
///
/// # Arguments
/// * `base` - Path of the owning part (e.g. `xl/worksheets/sheet1.xml`)
/// * `target` - Target as written in the relationship (`../drawings/drawing1.xml`, `/xl/media/a.png`)
///
/// # Returns
/// Normalized path suitable for accessing files within the zip archive
pub(crate) fn to_zip_path(base: &str, target: &str) -> String {
    let target = target.replace('\\', "/");
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = match base.rsplit_once('/') {
        Some((directory, _)) => directory.split('/').filter(|segment| !segment.is_empty()).collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => (),
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}

/// Checks whether the bytes start with the OLE compound file signature
fn is_compound_file(bytes: &[u8]) -> bool {
    bytes.starts_with(&COMPOUND_FILE_SIGNATURE)
}
