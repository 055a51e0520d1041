use std::collections::HashSet;

/// Options steering ingestion, export and message composition.
///
/// `Options::default()` carries the vocabulary the application ships with:
/// a Spanish `estado` status column and bilingual image/location keywords.
#[derive(Clone, Debug)]
pub struct Options {
    /// Reserved name of the boolean status column (matched case-insensitively).
    pub status_header: String,

    /// Substrings marking a header as an image column.
    pub image_keywords: Vec<String>,

    /// Substrings marking a header as a location (map link) column.
    pub location_keywords: Vec<String>,

    /// Text values read as a true status (compared lowercased and trimmed).
    pub truthy_values: HashSet<String>,

    /// Rows taller than this many points are assumed to hold a picture
    /// when the sheet carries no picture anchors.
    pub tall_row_threshold: f64,

    /// Name of the exported worksheet.
    pub sheet_name: String,

    /// Upper bound of an exported column width, in characters.
    pub max_column_width: usize,

    /// Characters added to the longest text of a column.
    pub column_padding: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            status_header: "estado".to_owned(),
            image_keywords: to_strings(&["foto", "photo", "imagen", "picture", "image"]),
            location_keywords: to_strings(&["ubicacion", "ubicación", "mapa", "maps"]),
            truthy_values: to_strings(&["✅", "true", "si", "sí", "1", "activo"]).into_iter().collect(),
            tall_row_threshold: 50.0,
            sheet_name: "Data".to_owned(),
            max_column_width: 50,
            column_padding: 2,
        }
    }
}

impl Options {
    /// Checks if a header names the status column.
    pub fn is_status_header(&self, header: &str) -> bool {
        header.to_lowercase() == self.status_header.to_lowercase()
    }

    /// Checks if a header names an image column.
    pub fn is_image_header(&self, header: &str) -> bool {
        contains_any(header, &self.image_keywords)
    }

    /// Checks if a header names a location column.
    pub fn is_location_header(&self, header: &str) -> bool {
        contains_any(header, &self.location_keywords)
    }

    /// Checks if a text value reads as a true status.
    pub fn is_truthy(&self, text: &str) -> bool {
        self.truthy_values.contains(text.trim().to_lowercase().as_str())
    }
}

fn contains_any(header: &str, keywords: &[String]) -> bool {
    let header = header.to_lowercase();
    keywords.iter().any(|keyword| header.contains(keyword.as_str()))
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
