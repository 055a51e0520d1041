//! Association of embedded pictures with worksheet rows.

use crate::error::ExplorerError;
use crate::options::Options;
use crate::spreadsheet::drawing::Media;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxWorkbook;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::HashMap;

/// Resolves the embedded images of a sheet into a mapping from 1-based row
/// number to inline image payload.
///
/// Pictures anchored to cells are used when the sheet has any. Otherwise,
/// when the package still stores media, each tall data row is paired with
/// the next media part in archive order. That fallback assumes both
/// sequences line up and can mis-assign images when they do not.
///
/// Failures are logged and yield no images; they never fail ingestion.
pub(crate) fn resolve_images(workbook: &mut XlsxWorkbook, sheet: &Sheet, options: &Options) -> HashMap<usize, String> {
    match try_resolve_images(workbook, sheet, options) {
        Ok(images) => images,
        Err(error) => {
            log::warn!("Ignoring embedded images of sheet '{}': {}", sheet.name, error);
            HashMap::new()
        }
    }
}

fn try_resolve_images(workbook: &mut XlsxWorkbook, sheet: &Sheet, options: &Options) -> Result<HashMap<usize, String>, ExplorerError> {
    let mut images = HashMap::new();

    let pictures = workbook.read_pictures(sheet)?;
    if !pictures.is_empty() {
        log::debug!("Mapping {} anchored picture(s) of sheet '{}'", pictures.len(), sheet.name);
        for anchored in pictures {
            let Some(row) = anchored.picture.row.checked_add(1) else {
                log::warn!("Picture '{}' is anchored outside the sheet", anchored.media);
                continue;
            };
            if let Some(media) = load_media(workbook, &anchored.media) {
                images.insert(row, to_data_url(&media));
            }
        }
        return Ok(images);
    }

    let media_paths = workbook.media_paths();
    if media_paths.is_empty() {
        return Ok(images);
    }
    let rows = tall_rows(sheet, options.tall_row_threshold);
    log::debug!(
        "No anchored pictures; pairing {} media part(s) with tall rows {:?}",
        media_paths.len(),
        rows
    );
    for (row, path) in rows.into_iter().zip(media_paths) {
        if let Some(media) = load_media(workbook, &path) {
            images.insert(row, to_data_url(&media));
        }
    }
    Ok(images)
}

/// Reads one media part; a missing or unreadable part is logged and skipped.
fn load_media(workbook: &mut XlsxWorkbook, path: &str) -> Option<Media> {
    match workbook.read_media(path) {
        Ok(Some(media)) => Some(media),
        Ok(None) => {
            log::warn!("Media part '{}' is missing", path);
            None
        }
        Err(error) => {
            log::warn!("Skipping unreadable media part '{}': {}", path, error);
            None
        }
    }
}

/// Numbers of the data rows taller than the threshold, in sheet order.
pub(crate) fn tall_rows(sheet: &Sheet, threshold: f64) -> Vec<usize> {
    sheet
        .data_rows()
        .filter(|row| row.is_taller_than(threshold))
        .map(|row| row.number)
        .collect()
}

/// Encodes a media part as a `data:` URL.
pub(crate) fn to_data_url(media: &Media) -> String {
    format!("data:{};base64,{}", media.mime_type(), STANDARD.encode(&media.bytes))
}
