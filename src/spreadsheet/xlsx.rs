use crate::error::ExplorerError;
use crate::error::ResultMessage;
use crate::helpers::xml::read_text;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::drawing;
use crate::spreadsheet::drawing::Media;
use crate::spreadsheet::drawing::Picture;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::excel::relationships_path;
use crate::spreadsheet::excel::to_zip_path;
use crate::spreadsheet::excel::REL_DRAWING;
use crate::spreadsheet::excel::REL_HYPERLINK;
use crate::spreadsheet::excel::REL_IMAGE;
use crate::spreadsheet::excel::REL_WORKSHEET;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::sheet::SheetRow;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use zip::ZipArchive;

// XML tag names for parsing SpreadsheetML parts (matched by local name)
const TAG_CUSTOM_FORMATS: &[u8] = b"numFmts"; // Custom number formats container
const TAG_CUSTOM_FORMAT: &[u8] = b"numFmt";   // Individual custom number format
const TAG_FORMAT_INDEXES: &[u8] = b"cellXfs";  // Cell format indexes container
const TAG_FORMAT_INDEX: &[u8] = b"xf";         // Individual cell format index
const TAG_SHARED_STRING_ITEM: &[u8] = b"si";   // Shared string table item
const TAG_PHONETIC_TEXT: &[u8] = b"rPh";       // Phonetic text for Asian languages
const TAG_RICH_TEXT_RUN: &[u8] = b"r";         // Formatted run of rich text
const TAG_TEXT: &[u8] = b"t";                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: &[u8] = b"workbookPr"; // Workbook properties
const TAG_SHEET: &[u8] = b"sheet";             // Worksheet definition
const TAG_ROW: &[u8] = b"row";                 // Row in worksheet
const TAG_CELL: &[u8] = b"c";                  // Cell in worksheet
const TAG_INLINE_STRING: &[u8] = b"is";        // Inline string value
const TAG_VALUE: &[u8] = b"v";                 // Cell value content
const TAG_FORMULA: &[u8] = b"f";               // Cell formula
const TAG_DRAWING: &[u8] = b"drawing";         // Drawing part reference
const TAG_HYPERLINK: &[u8] = b"hyperlink";     // Hyperlink attached to a cell range

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELATIONSHIPS_PATH: &str = "xl/_rels/workbook.xml.rels";
const STYLES_PATH: &str = "xl/styles.xml";
const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";
const MEDIA_DIRECTORY: &str = "xl/media/";

/// Entry of the shared string table
struct SharedString {
    text: String,
    /// Whether the entry is made of formatted runs
    is_rich: bool,
}

/// Cell collected while its child elements are being read
struct PendingCell {
    row: usize,
    col: usize,
    kind: Option<String>,
    format: CellType,
    formula: Option<String>,
    raw: Option<String>,
    is_rich: bool,
}

/// Hyperlink element of a worksheet, resolved once the sheet relationships are known
struct PendingHyperlink {
    reference: String,
    id: Option<String>,
    location: Option<String>,
}

/// An anchored picture together with the media part it embeds
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct AnchoredPicture {
    pub(crate) picture: Picture,
    /// ZIP path of the embedded media part
    pub(crate) media: String,
}

/// Represents an Excel XLSX workbook held in memory
pub(crate) struct XlsxWorkbook<'a> {
    /// ZIP archive containing the XLSX package
    zip: ZipArchive<Cursor<&'a [u8]>>,
    /// Parsed number formats for date detection, indexed by style ID
    number_formats: Vec<CellType>,
    /// List of worksheets with (name, zip_path) pairs in workbook order
    sheets: Vec<(String, String)>,
}

impl<'a> XlsxWorkbook<'a> {
    /// Opens an XLSX workbook and parses its structure
    ///
    /// # Arguments
    /// * `bytes` - Raw workbook content
    ///
    /// # Returns
    /// The opened workbook, or an error when the bytes are not a readable
    /// package or the package declares no worksheet
    pub(crate) fn open(bytes: &'a [u8]) -> Result<XlsxWorkbook<'a>, ExplorerError> {
        let mut zip = excel::open(bytes)?;
        let (sheets, is_1904) = load_workbook(&mut zip).with_prefix(WORKBOOK_PATH)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::SpreadsheetEmptyError)?;
        }
        let number_formats = load_number_formats(&mut zip, is_1904).with_prefix(STYLES_PATH)?;
        log::debug!("Opened workbook with {} sheet(s)", sheets.len());
        Ok(XlsxWorkbook {
            zip,
            number_formats,
            sheets,
        })
    }

    /// Names of the worksheets in workbook order
    pub(crate) fn sheet_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.sheets.iter().map(|(name, _)| name.as_str())
    }

    /// Reads the first worksheet of the workbook
    pub(crate) fn read_first_sheet(&mut self) -> Result<Sheet, ExplorerError> {
        let (name, path) = self
            .sheets
            .first()
            .cloned()
            .ok_or(SpreadsheetError::SpreadsheetEmptyError)?;
        let shared_strings = self.load_shared_strings().with_prefix(SHARED_STRINGS_PATH)?;
        self.read_sheet(&name, &path, &shared_strings).with_prefix(&path)
    }

    /// Loads the shared string table; an absent table is empty
    fn load_shared_strings(&mut self) -> Result<Vec<SharedString>, ExplorerError> {
        let mut shared_strings = Vec::<SharedString>::new();
        let mut reader = match self.zip.xml_reader(SHARED_STRINGS_PATH)? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };

        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == TAG_SHARED_STRING_ITEM => {
                let (text, is_rich) = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
                shared_strings.push(SharedString { text, is_rich });
            }
        });
        Ok(shared_strings)
    }

    /// Parses one worksheet into rows of decoded cells
    ///
    /// Cells are decoded by their type attribute and number format. A cell
    /// whose value cannot be decoded is logged and kept out of the sheet.
    /// Hyperlinks and the drawing reference are resolved through the sheet
    /// relationships after the cell data is read.
    fn read_sheet(&mut self, name: &str, path: &str, shared_strings: &[SharedString]) -> Result<Sheet, ExplorerError> {
        let mut sheet = Sheet::new(name);
        let mut drawing_id = None::<String>;
        let mut hyperlinks = Vec::<PendingHyperlink>::new();
        let mut pending = None::<PendingCell>;

        let mut reader = self.zip.xml_reader(path)?
            .ok_or_else(|| SpreadsheetError::FileError(path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == TAG_ROW => {
                let number = event.parse_attribute_value::<usize>("r")
                    .unwrap_or(None)
                    .filter(|number| *number > 0)
                    .unwrap_or_else(|| sheet.rows.last().map(|row| row.number.saturating_add(1)).unwrap_or(1));
                let height = event.parse_attribute_value::<f64>("ht").unwrap_or(None);
                sheet.rows.push(SheetRow::new(number, height));
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_CELL => {
                let current_row = sheet.rows.last().map(|row| row.number.saturating_sub(1)).unwrap_or(0);
                let next_col = sheet.rows.last()
                    .and_then(|row| row.cells.last())
                    .map(|cell| cell.col + 1)
                    .unwrap_or(0);
                let (row, col) = event.get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((current_row, next_col));
                let kind = event.get_attribute_value("t")?.map(|kind| kind.to_string());
                let format = match kind.as_deref() {
                    None | Some("n") => event.parse_attribute_value::<usize>("s")
                        .unwrap_or(None)
                        .and_then(|index| self.number_formats.get(index).copied())
                        .unwrap_or_default(),
                    _ => CellType::default(),
                };
                if sheet.rows.last().map(|last| last.number != row + 1).unwrap_or(true) {
                    sheet.rows.push(SheetRow::new(row + 1, None));
                }
                pending = Some(PendingCell { row, col, kind, format, formula: None, raw: None, is_rich: false });
            }
            Event::Start(event) if pending.is_some() && event.local_name().as_ref() == TAG_FORMULA => {
                let formula = read_text(&mut reader, TAG_FORMULA)?;
                if let Some(cell) = pending.as_mut() {
                    cell.formula = Some(formula);
                }
            }
            Event::Start(event) if pending.is_some() && event.local_name().as_ref() == TAG_VALUE => {
                let (raw, _) = read_string_value(&mut reader, TAG_VALUE, true)?;
                if let Some(cell) = pending.as_mut() {
                    cell.raw = Some(raw);
                }
            }
            Event::Start(event) if pending.is_some() && event.local_name().as_ref() == TAG_INLINE_STRING => {
                let (raw, is_rich) = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
                if let Some(cell) = pending.as_mut() {
                    cell.raw = Some(raw);
                    cell.is_rich = is_rich;
                }
            }
            Event::End(event) if event.local_name().as_ref() == TAG_CELL => {
                if let Some(cell) = pending.take() {
                    let (row, col) = (cell.row, cell.col);
                    let value = decode_cell(cell, shared_strings);
                    if !value.is_empty() {
                        if let Some(sheet_row) = sheet.rows.last_mut() {
                            sheet_row.cells.push(Cell { row, col, value });
                        }
                    }
                }
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_DRAWING => {
                drawing_id = event.get_local_attribute_value("id")?.map(|id| id.to_string());
            }
            Event::Start(event) if event.local_name().as_ref() == TAG_HYPERLINK => {
                if let Some(reference) = event.get_attribute_value("ref")? {
                    hyperlinks.push(PendingHyperlink {
                        reference: reference.to_string(),
                        id: event.get_local_attribute_value("id")?.map(|id| id.to_string()),
                        location: event.get_attribute_value("location")?.map(|location| location.to_string()),
                    });
                }
            }
        });
        drop(reader);

        let relationships = relationships_path(path);
        if let Some(id) = drawing_id {
            let drawings = load_relationships(&mut self.zip, &relationships, REL_DRAWING)?;
            sheet.drawing = drawings.get(&id).map(|target| to_zip_path(path, target));
            if sheet.drawing.is_none() {
                log::warn!("Drawing relationship '{}' of sheet '{}' not found", id, name);
            }
        }
        if !hyperlinks.is_empty() {
            let targets = load_relationships(&mut self.zip, &relationships, REL_HYPERLINK)?;
            attach_hyperlinks(&mut sheet, hyperlinks, &targets);
        }
        Ok(sheet)
    }

    /// Reads the pictures anchored in the drawing of a sheet
    ///
    /// Pictures whose image relationship cannot be resolved are logged and
    /// skipped. A sheet without drawing has no pictures.
    pub(crate) fn read_pictures(&mut self, sheet: &Sheet) -> Result<Vec<AnchoredPicture>, ExplorerError> {
        let drawing_path = match &sheet.drawing {
            Some(path) => path.as_str(),
            None => return Ok(Vec::new()),
        };
        let pictures = match self.zip.xml_reader(drawing_path)? {
            Some(mut reader) => drawing::read_pictures(&mut reader).with_prefix(drawing_path)?,
            None => {
                log::warn!("Drawing part '{}' is missing", drawing_path);
                return Ok(Vec::new());
            }
        };
        let images = load_relationships(&mut self.zip, &relationships_path(drawing_path), REL_IMAGE)?;
        let anchored = pictures
            .into_iter()
            .filter_map(|picture| match images.get(&picture.embed) {
                Some(target) => Some(AnchoredPicture {
                    media: to_zip_path(drawing_path, target),
                    picture,
                }),
                None => {
                    log::warn!("Image relationship '{}' of '{}' not found", picture.embed, drawing_path);
                    None
                }
            })
            .collect();
        Ok(anchored)
    }

    /// Paths of the media parts of the package, in archive order
    pub(crate) fn media_paths(&self) -> Vec<String> {
        self.zip.names_under(MEDIA_DIRECTORY)
    }

    /// Reads one media part; None when the part does not exist
    pub(crate) fn read_media(&mut self, path: &str) -> Result<Option<Media>, ExplorerError> {
        let media = self.zip.read_bytes(path)?.map(|bytes| Media {
            path: path.to_owned(),
            bytes,
        });
        Ok(media)
    }
}

/// Loads workbook structure and worksheet information from XLSX file
///
/// Parses the workbook.xml file to extract worksheet names and their corresponding
/// XML file paths, and determines the date system (1900 vs 1904) used in the file.
///
/// # Returns
/// Tuple of (worksheets, is_1904_date_system) where worksheets are (name, zip_path) pairs
fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<(Vec<(String, String)>, bool), ExplorerError> {
    let relationships = load_relationships(zip, WORKBOOK_RELATIONSHIPS_PATH, REL_WORKSHEET)?;
    let mut reader = zip.xml_reader(WORKBOOK_PATH)?
        .ok_or_else(|| SpreadsheetError::FileError(WORKBOOK_PATH.to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_SHEET => {
            let name = event.get_attribute_value("name")?;
            let id = event.get_local_attribute_value("id")?;
            if let Some((name, id)) = name.zip(id) {
                match relationships.get(id.as_ref()) {
                    Some(target) => sheets.push((name.to_string(), to_zip_path(WORKBOOK_PATH, target))),
                    None => log::warn!("Worksheet '{}' has no part, skipping", name),
                }
            }
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads number formats and cell styles from XLSX styles.xml file
///
/// # Arguments
/// * `zip` - ZIP archive containing the XLSX file
/// * `is_1904` - Whether the file uses the 1904 date system
///
/// # Returns
/// Vector of CellType values indexed by style ID
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>, is_1904: bool) -> Result<Vec<CellType>, ExplorerError> {
    let mut reader = match zip.xml_reader(STYLES_PATH)? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();

    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.local_name().as_ref() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                let style = CellType::parse_custom_number_format(&format, is_1904);
                custom_formats.insert(id.to_string(), style);
            }
        }

        Event::Start(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.local_name().as_ref() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.local_name().as_ref() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?.unwrap_or(Cow::Borrowed("0"));
            format_indexes.push(id.to_string());
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

/// Reads string value from XML content, handling text and CDATA sections
///
/// Extracts string content from XML elements, skipping phonetic text annotations
/// and properly handling both text nodes and CDATA sections.
///
/// # Returns
/// Extracted string value and whether it was assembled from rich text runs
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: &[u8],
    is_text_content: bool,
) -> Result<(String, bool), ExplorerError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut is_rich = false;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.local_name().as_ref() == end_tag => break,
        Event::Start(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.local_name().as_ref() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.local_name().as_ref() == TAG_RICH_TEXT_RUN => is_rich = true,
        Event::Start(event) if !is_phonetic_text && event.local_name().as_ref() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.local_name().as_ref() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok((text, is_rich))
}

/// Turns a collected cell into its value, wrapping formulas around their cached result
fn decode_cell(cell: PendingCell, shared_strings: &[SharedString]) -> CellValue {
    let reference = index_to_reference(cell.row, cell.col);
    let value = match (cell.kind.as_deref(), cell.raw) {
        (_, None) => CellValue::Empty,
        (Some("s"), Some(raw)) => {
            match raw.trim().parse::<usize>().ok().and_then(|index| shared_strings.get(index)) {
                Some(SharedString { text, is_rich: true }) => CellValue::RichText(text.to_owned()),
                Some(SharedString { text, .. }) => CellValue::Text(text.to_owned()),
                None => {
                    log::warn!("Cell {} refers to unknown shared string '{}'", reference, raw);
                    CellValue::Empty
                }
            }
        }
        (Some("inlineStr"), Some(raw)) if cell.is_rich => CellValue::RichText(raw),
        (Some("inlineStr"), Some(raw)) | (Some("str"), Some(raw)) => CellValue::Text(raw),
        (_, Some(raw)) if raw.trim().is_empty() => CellValue::Empty,
        (kind, Some(raw)) => match CellValue::decode(kind, raw, cell.format) {
            Ok(value) => value,
            Err(error) => {
                log::warn!("Discarding malformed cell {}: {}", reference, error);
                CellValue::Empty
            }
        },
    };
    match cell.formula {
        Some(formula) if !formula.is_empty() => CellValue::Formula {
            formula,
            result: Box::new(value),
        },
        _ => value,
    }
}

/// Wraps linked cells of the sheet into hyperlink values
///
/// External links take their target from the sheet relationships; links to a
/// place inside the workbook become `#location`.
fn attach_hyperlinks(sheet: &mut Sheet, hyperlinks: Vec<PendingHyperlink>, targets: &HashMap<String, String>) {
    for hyperlink in hyperlinks {
        let target = hyperlink
            .id
            .as_ref()
            .and_then(|id| targets.get(id).cloned())
            .or_else(|| hyperlink.location.map(|location| format!("#{location}")));
        let target = match target {
            Some(target) => target,
            None => {
                log::warn!("Hyperlink at {} has no target", hyperlink.reference);
                continue;
            }
        };
        // A link may span a range; it belongs to its top-left cell
        let first = hyperlink.reference.split(':').next().unwrap_or_default();
        let cell = reference_to_index(first).and_then(|(row, col)| sheet.cell_mut(row, col));
        if let Some(cell) = cell {
            let value = std::mem::replace(&mut cell.value, CellValue::Empty);
            let text = value.display_text().unwrap_or_else(|| target.to_owned());
            cell.value = CellValue::Hyperlink { text, target };
        }
    }
}
