//! ZIP archive helper utilities for the Excel (.xlsx) package format
//! Provides convenient methods for accessing parts within the archive

use crate::error::ExplorerError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// Largest buffer reserved up front from the size an entry declares.
const MAX_SIZE_HINT: u64 = 64 * 1024 * 1024;

/// Helper trait for ZIP archive operations with specialized reader creation
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a file from the ZIP archive by name (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, ExplorerError>;

    /// Creates an XML reader for a file within the ZIP archive
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, ExplorerError>;

    /// Reads the whole content of a file within the ZIP archive
    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, ExplorerError>;

    /// Lists the entry names below a directory prefix, in archive order
    fn names_under(&self, prefix: &str) -> Vec<String>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, ExplorerError> {
        let pattern = name.replace('\\', "/");
        let path = self.file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(*file_name))
            .map(|file_name| file_name.to_owned());
        match path.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(Some(file)) => Ok(Some(file)),
            Ok(None) | Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, ExplorerError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }

    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, ExplorerError> {
        match self.file(name)? {
            Some(mut file) => {
                let mut bytes = Vec::with_capacity(size_hint(file.size()));
                file.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    fn names_under(&self, prefix: &str) -> Vec<String> {
        self.file_names()
            .filter(|file_name| {
                file_name.len() > prefix.len()
                    && file_name.is_char_boundary(prefix.len())
                    && file_name[..prefix.len()].eq_ignore_ascii_case(prefix)
                    && !file_name.ends_with('/')
            })
            .map(|file_name| file_name.to_owned())
            .collect()
    }
}

/// Capacity reserved for an entry of the declared size; never above `MAX_SIZE_HINT`.
fn size_hint(declared: u64) -> usize {
    declared.min(MAX_SIZE_HINT) as usize
}
