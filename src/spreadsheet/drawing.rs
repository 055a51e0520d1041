//! DrawingML worksheet drawings: picture anchors and their media parts.

use crate::error::ExplorerError;
use crate::helpers::xml::read_text;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::match_xml_events;
use quick_xml::events::Event;
use std::io::BufRead;

const TAG_ONE_CELL_ANCHOR: &[u8] = b"oneCellAnchor";
const TAG_TWO_CELL_ANCHOR: &[u8] = b"twoCellAnchor";
const TAG_ABSOLUTE_ANCHOR: &[u8] = b"absoluteAnchor";
const TAG_FROM: &[u8] = b"from";
const TAG_ROW: &[u8] = b"row";
const TAG_COL: &[u8] = b"col";
const TAG_PICTURE: &[u8] = b"pic";
const TAG_BLIP: &[u8] = b"blip";

/// A picture anchored to a worksheet cell.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Picture {
    /// Anchor row (0-based)
    pub(crate) row: usize,
    /// Anchor column (0-based)
    pub(crate) col: usize,
    /// Relationship id of the picture's image part
    pub(crate) embed: String,
}

/// A binary media part of the package.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Media {
    /// ZIP path of the part (e.g. `xl/media/image1.png`)
    pub(crate) path: String,
    pub(crate) bytes: Vec<u8>,
}

impl Media {
    /// Lowercased file extension of the part, if any.
    pub(crate) fn extension(&self) -> Option<String> {
        let file_name = self.path.rsplit('/').next().unwrap_or(&self.path);
        file_name
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_ascii_lowercase())
    }

    /// MIME type inferred from the extension; PNG when unknown.
    pub(crate) fn mime_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            _ => "image/png",
        }
    }
}

/// Anchor being assembled while walking a drawing part.
#[derive(Default)]
struct PendingAnchor {
    row: Option<usize>,
    col: Option<usize>,
    embed: Option<String>,
    in_from: bool,
    in_picture: bool,
}

/// Reads the cell-anchored pictures of a drawing part, in document order.
/// Absolute anchors carry no cell position and are skipped; anchors holding
/// shapes or charts instead of pictures are ignored.
pub(crate) fn read_pictures<R: BufRead>(reader: &mut XmlReader<R>) -> Result<Vec<Picture>, ExplorerError> {
    let mut pictures = Vec::new();
    let mut anchor: Option<PendingAnchor> = None;
    match_xml_events!(reader => {
        Event::Start(event) if is_cell_anchor(event.local_name().as_ref()) => {
            anchor = Some(PendingAnchor::default());
        }
        Event::Start(event) if event.local_name().as_ref() == TAG_ABSOLUTE_ANCHOR => {
            log::debug!("Skipping absolute drawing anchor without cell position");
        }
        Event::End(event) if is_cell_anchor(event.local_name().as_ref()) => {
            if let Some(PendingAnchor { row: Some(row), col, embed: Some(embed), .. }) = anchor.take() {
                pictures.push(Picture { row, col: col.unwrap_or(0), embed });
            }
        }
        Event::Start(event) if anchor.is_some() && event.local_name().as_ref() == TAG_FROM => {
            if let Some(pending) = anchor.as_mut() {
                pending.in_from = true;
            }
        }
        Event::End(event) if anchor.is_some() && event.local_name().as_ref() == TAG_FROM => {
            if let Some(pending) = anchor.as_mut() {
                pending.in_from = false;
            }
        }
        Event::Start(event) if anchor.as_ref().map(|pending| pending.in_from).unwrap_or(false)
            && (event.local_name().as_ref() == TAG_ROW || event.local_name().as_ref() == TAG_COL) => {
            let is_row = event.local_name().as_ref() == TAG_ROW;
            let end_tag = if is_row { TAG_ROW } else { TAG_COL };
            let text = read_text(reader, end_tag)?;
            let position = text.trim().parse::<usize>().ok();
            if let Some(pending) = anchor.as_mut() {
                if is_row {
                    pending.row = position;
                } else {
                    pending.col = position;
                }
            }
        }
        Event::Start(event) if anchor.is_some() && event.local_name().as_ref() == TAG_PICTURE => {
            if let Some(pending) = anchor.as_mut() {
                pending.in_picture = true;
            }
        }
        Event::Start(event) if anchor.as_ref().map(|pending| pending.in_picture).unwrap_or(false)
            && event.local_name().as_ref() == TAG_BLIP => {
            let embed = event.get_local_attribute_value("embed")?.map(|value| value.to_string());
            if let Some(pending) = anchor.as_mut() {
                if pending.embed.is_none() {
                    pending.embed = embed;
                }
            }
        }
    });
    Ok(pictures)
}

fn is_cell_anchor(name: &[u8]) -> bool {
    name == TAG_ONE_CELL_ANCHOR || name == TAG_TWO_CELL_ANCHOR
}
