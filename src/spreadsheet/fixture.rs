//! Test-only builder writing small but genuine `.xlsx` packages.

use std::fmt::Write as _;
use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

/// Content of media parts written by [`WorkbookFixture::corrupt_media`].
const CORRUPT_CONTENT: &[u8] = b"corrupt-media-part-content";

/// 1x1 transparent PNG
pub(crate) const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Cell content written by the fixture.
#[derive(Clone, Debug)]
pub(crate) enum FixtureCell {
    Blank,
    /// Shared string (`t="s"`)
    Shared(String),
    /// Inline string (`t="inlineStr"`)
    Inline(String),
    /// Inline rich text made of several runs
    Rich(Vec<String>),
    Number(f64),
    Boolean(bool),
    /// Error literal (`t="e"`)
    Error(String),
    /// Formula text with its cached numeric result
    Formula(String, f64),
    /// Serial number styled with the built-in date format 14
    Date(f64),
}

impl From<&str> for FixtureCell {
    fn from(text: &str) -> Self {
        FixtureCell::Shared(text.to_owned())
    }
}

impl From<f64> for FixtureCell {
    fn from(number: f64) -> Self {
        FixtureCell::Number(number)
    }
}

impl From<bool> for FixtureCell {
    fn from(value: bool) -> Self {
        FixtureCell::Boolean(value)
    }
}

struct FixtureRow {
    height: Option<f64>,
    cells: Vec<FixtureCell>,
}

struct FixturePicture {
    row: usize,
    col: usize,
    media: String,
}

/// Builder of a single-sheet workbook.
#[derive(Default)]
pub(crate) struct WorkbookFixture {
    sheet_name: Option<String>,
    without_sheets: bool,
    rows: Vec<FixtureRow>,
    hyperlinks: Vec<(String, String)>,
    locations: Vec<(String, String)>,
    pictures: Vec<FixturePicture>,
    media: Vec<(String, Vec<u8>)>,
    corrupt_media: Vec<String>,
}

impl WorkbookFixture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A workbook package declaring no worksheet at all.
    pub(crate) fn without_sheets() -> Self {
        Self { without_sheets: true, ..Self::default() }
    }

    pub(crate) fn sheet_name(mut self, name: &str) -> Self {
        self.sheet_name = Some(name.to_owned());
        self
    }

    /// Appends the next row (row numbers start at 1).
    pub(crate) fn row<I: IntoIterator<Item = FixtureCell>>(mut self, cells: I) -> Self {
        self.rows.push(FixtureRow { height: None, cells: cells.into_iter().collect() });
        self
    }

    /// Appends the next row with a custom height in points.
    pub(crate) fn tall_row<I: IntoIterator<Item = FixtureCell>>(mut self, height: f64, cells: I) -> Self {
        self.rows.push(FixtureRow { height: Some(height), cells: cells.into_iter().collect() });
        self
    }

    /// Links a cell to an external URL.
    pub(crate) fn hyperlink(mut self, reference: &str, url: &str) -> Self {
        self.hyperlinks.push((reference.to_owned(), url.to_owned()));
        self
    }

    /// Links a cell to a location inside the workbook.
    pub(crate) fn location(mut self, reference: &str, location: &str) -> Self {
        self.locations.push((reference.to_owned(), location.to_owned()));
        self
    }

    /// Anchors a picture at a 0-based (row, col) and stores its media part.
    pub(crate) fn picture(mut self, row: usize, col: usize, media: &str, bytes: &[u8]) -> Self {
        self.pictures.push(FixturePicture { row, col, media: media.to_owned() });
        self.media(media, bytes)
    }

    /// Stores a media part whose checksum does not match its content.
    pub(crate) fn corrupt_media(mut self, media: &str) -> Self {
        self.corrupt_media.push(media.to_owned());
        self
    }

    /// Anchors a picture to a media part that fails to read.
    pub(crate) fn corrupt_picture(mut self, row: usize, col: usize, media: &str) -> Self {
        self.pictures.push(FixturePicture { row, col, media: media.to_owned() });
        self.corrupt_media(media)
    }

    /// Stores a media part without anchoring it.
    pub(crate) fn media(mut self, media: &str, bytes: &[u8]) -> Self {
        self.media.push((media.to_owned(), bytes.to_vec()));
        self
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut add = |name: &str, content: &[u8]| {
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        };

        add("[Content_Types].xml", CONTENT_TYPES.as_bytes());
        add("_rels/.rels", ROOT_RELATIONSHIPS.as_bytes());
        add("xl/workbook.xml", self.workbook_xml().as_bytes());
        add("xl/_rels/workbook.xml.rels", WORKBOOK_RELATIONSHIPS.as_bytes());
        add("xl/styles.xml", STYLES.as_bytes());

        if !self.without_sheets {
            let mut shared_strings = Vec::<String>::new();
            let sheet = self.sheet_xml(&mut shared_strings);
            add("xl/worksheets/sheet1.xml", sheet.as_bytes());
            add("xl/sharedStrings.xml", shared_strings_xml(&shared_strings).as_bytes());
            add("xl/worksheets/_rels/sheet1.xml.rels", self.sheet_relationships_xml().as_bytes());
            if !self.pictures.is_empty() {
                add("xl/drawings/drawing1.xml", self.drawing_xml().as_bytes());
                add("xl/drawings/_rels/drawing1.xml.rels", self.drawing_relationships_xml().as_bytes());
            }
        }
        for (name, bytes) in &self.media {
            add(&format!("xl/media/{name}"), bytes);
        }
        for name in &self.corrupt_media {
            let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
            writer.start_file(format!("xl/media/{name}"), stored).unwrap();
            writer.write_all(CORRUPT_CONTENT).unwrap();
        }

        let mut bytes = writer.finish().unwrap().into_inner();
        let mut start = 0;
        while let Some(offset) = bytes[start..].windows(CORRUPT_CONTENT.len()).position(|window| window == CORRUPT_CONTENT) {
            bytes[start + offset] ^= 0xFF;
            start += offset + CORRUPT_CONTENT.len();
        }
        bytes
    }

    fn workbook_xml(&self) -> String {
        let sheets = if self.without_sheets {
            String::new()
        } else {
            let name = self.sheet_name.as_deref().unwrap_or("Sheet1");
            format!(r#"<sheet name="{}" sheetId="1" r:id="rId1"/>"#, escape(name))
        };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><workbookPr/><sheets>{sheets}</sheets></workbook>"#
        )
    }

    fn sheet_xml(&self, shared_strings: &mut Vec<String>) -> String {
        let mut data = String::new();
        for (index, row) in self.rows.iter().enumerate() {
            let number = index + 1;
            match row.height {
                Some(height) => write!(data, r#"<row r="{number}" ht="{height}" customHeight="1">"#).unwrap(),
                None => write!(data, r#"<row r="{number}">"#).unwrap(),
            }
            for (col, cell) in row.cells.iter().enumerate() {
                let reference = format!("{}{}", column_letters(col), number);
                let xml = match cell {
                    FixtureCell::Blank => continue,
                    FixtureCell::Shared(text) => {
                        shared_strings.push(text.to_owned());
                        format!(r#"<c r="{reference}" t="s"><v>{}</v></c>"#, shared_strings.len() - 1)
                    }
                    FixtureCell::Inline(text) => {
                        format!(r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#, escape(text))
                    }
                    FixtureCell::Rich(runs) => {
                        let runs: String = runs
                            .iter()
                            .map(|run| format!(r#"<r><rPr><b/></rPr><t xml:space="preserve">{}</t></r>"#, escape(run)))
                            .collect();
                        format!(r#"<c r="{reference}" t="inlineStr"><is>{runs}</is></c>"#)
                    }
                    FixtureCell::Number(number) => format!(r#"<c r="{reference}"><v>{number}</v></c>"#),
                    FixtureCell::Boolean(value) => {
                        format!(r#"<c r="{reference}" t="b"><v>{}</v></c>"#, if *value { 1 } else { 0 })
                    }
                    FixtureCell::Error(error) => format!(r#"<c r="{reference}" t="e"><v>{}</v></c>"#, escape(error)),
                    FixtureCell::Formula(formula, result) => {
                        format!(r#"<c r="{reference}"><f>{}</f><v>{result}</v></c>"#, escape(formula))
                    }
                    FixtureCell::Date(serial) => format!(r#"<c r="{reference}" s="1"><v>{serial}</v></c>"#),
                };
                data.push_str(&xml);
            }
            data.push_str("</row>");
        }

        let drawing = if self.pictures.is_empty() { "" } else { r#"<drawing r:id="rId1"/>"# };
        let mut hyperlinks = String::new();
        if !self.hyperlinks.is_empty() || !self.locations.is_empty() {
            hyperlinks.push_str("<hyperlinks>");
            for (index, (reference, _)) in self.hyperlinks.iter().enumerate() {
                write!(hyperlinks, r#"<hyperlink ref="{reference}" r:id="rIdLink{index}"/>"#).unwrap();
            }
            for (reference, location) in &self.locations {
                write!(hyperlinks, r#"<hyperlink ref="{reference}" location="{}" display="link"/>"#, escape(location)).unwrap();
            }
            hyperlinks.push_str("</hyperlinks>");
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheetData>{data}</sheetData>{hyperlinks}{drawing}</worksheet>"#
        )
    }

    fn sheet_relationships_xml(&self) -> String {
        let mut relationships = String::new();
        if !self.pictures.is_empty() {
            relationships.push_str(r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/>"#);
        }
        for (index, (_, url)) in self.hyperlinks.iter().enumerate() {
            write!(
                relationships,
                r#"<Relationship Id="rIdLink{index}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="{}" TargetMode="External"/>"#,
                escape(url)
            )
            .unwrap();
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#
        )
    }

    fn drawing_xml(&self) -> String {
        let mut anchors = String::new();
        for (index, picture) in self.pictures.iter().enumerate() {
            write!(
                anchors,
                r#"<xdr:oneCellAnchor><xdr:from><xdr:col>{}</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>{}</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from><xdr:ext cx="952500" cy="952500"/><xdr:pic><xdr:nvPicPr><xdr:cNvPr id="{}" name="Picture {}"/><xdr:cNvPicPr/></xdr:nvPicPr><xdr:blipFill><a:blip r:embed="rIdImage{index}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill><xdr:spPr/></xdr:pic><xdr:clientData/></xdr:oneCellAnchor>"#,
                picture.col,
                picture.row,
                index + 2,
                index + 1
            )
            .unwrap();
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">{anchors}</xdr:wsDr>"#
        )
    }

    fn drawing_relationships_xml(&self) -> String {
        let mut relationships = String::new();
        for (index, picture) in self.pictures.iter().enumerate() {
            write!(
                relationships,
                r#"<Relationship Id="rIdImage{index}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/{}"/>"#,
                picture.media
            )
            .unwrap();
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#
        )
    }
}

fn shared_strings_xml(strings: &[String]) -> String {
    let items: String = strings
        .iter()
        .map(|text| format!(r#"<si><t xml:space="preserve">{}</t><rPh sb="0" eb="1"><t>フリガナ</t></rPh></si>"#, escape(text)))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">{items}</sst>"#,
        strings.len()
    )
}

fn column_letters(col: usize) -> String {
    let mut column = col + 1;
    let mut letters = Vec::new();
    while column > 0 {
        column -= 1;
        letters.push((b'A' + (column % 26) as u8) as char);
        column /= 26;
    }
    letters.iter().rev().collect()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;
