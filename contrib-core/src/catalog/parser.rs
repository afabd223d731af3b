//! Catalog document parsing
//!
//! The catalog is an XML document of the form:
//!
//! ```xml
//! <contributions>
//!   <category name="Sound">
//!     <library name="Minim" url="http://code.compartmental.net/minim">
//!       <author name="Damien Di Fede" url="http://example.com"/>
//!       <description sentence="An audio library" paragraph="..."/>
//!       <version id="12" pretty="2.1.0"/>
//!       <location url="http://example.com/minim.zip"/>
//!     </library>
//!     <librarycompilation name="Audio Pack" libraryNames="Minim; Beads"/>
//!   </category>
//! </contributions>
//! ```
//!
//! Parsing is all-or-nothing: either every entry is returned in document
//! order or the whole parse fails. Unknown elements and attributes are
//! skipped.

use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::error::CatalogError;
use super::record::{Author, ContributionRecord, ContributionType};

/// Parse a catalog held in a string
pub fn parse_str(xml: &str) -> Result<Vec<ContributionRecord>, CatalogError> {
    parse_reader(xml.as_bytes(), "<string>")
}

/// Parse a catalog from raw downloaded bytes
pub fn parse_bytes(bytes: &[u8]) -> Result<Vec<ContributionRecord>, CatalogError> {
    parse_reader(bytes, "<download>")
}

/// Parse a catalog file
pub fn parse_file(path: &Path) -> Result<Vec<ContributionRecord>, CatalogError> {
    let file = std::fs::File::open(path).map_err(|source| CatalogError::Io {
        context: path.display().to_string(),
        source,
    })?;
    parse_reader(BufReader::new(file), &path.display().to_string())
}

/// Parse a catalog from any buffered reader. `source` names the input in errors.
pub fn parse_reader<R: BufRead>(
    input: R,
    source: &str,
) -> Result<Vec<ContributionRecord>, CatalogError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut state = ParseState::default();
    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event_into(&mut buf) {
            Ok(Event::Decl(decl)) => check_encoding(&decl)?,
            Ok(Event::Start(element)) => {
                state.enter(position)?;
                state.depth += 1;
                state.open(&element, position)?;
            }
            Ok(Event::Empty(element)) => {
                state.enter(position)?;
                state.open(&element, position)?;
                state.close(element.name().as_ref(), position)?;
            }
            Ok(Event::End(element)) => {
                state.depth = state.depth.checked_sub(1).ok_or_else(|| {
                    CatalogError::malformed(position, "closing tag without a matching opening tag")
                })?;
                state.close(element.name().as_ref(), position)?;
            }
            Ok(Event::Text(text)) if state.depth == 0 => {
                if !text.iter().all(u8::is_ascii_whitespace) {
                    return Err(CatalogError::malformed(
                        position,
                        "text outside the root element",
                    ));
                }
            }
            Ok(Event::CData(_)) if state.depth == 0 => {
                return Err(CatalogError::malformed(
                    position,
                    "text outside the root element",
                ));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(map_xml_error(err, reader.error_position() as u64, source));
            }
        }
        buf.clear();
    }

    let end = reader.buffer_position() as u64;
    if !state.root_seen {
        return Err(CatalogError::malformed(end, "document has no root element"));
    }
    if state.depth != 0 || state.current.is_some() {
        return Err(CatalogError::malformed(
            end,
            "document ended before all elements were closed",
        ));
    }

    tracing::debug!(
        "Parsed {} catalog entries from {}",
        state.records.len(),
        source
    );
    Ok(state.records)
}

#[derive(Default)]
struct ParseState {
    records: Vec<ContributionRecord>,
    current_category: Option<String>,
    current: Option<ContributionRecord>,
    depth: usize,
    root_seen: bool,
}

impl ParseState {
    /// Track the document element. Only one may appear at depth zero.
    fn enter(&mut self, position: u64) -> Result<(), CatalogError> {
        if self.depth == 0 {
            if self.root_seen {
                return Err(CatalogError::malformed(
                    position,
                    "second element after the document element",
                ));
            }
            self.root_seen = true;
        }
        Ok(())
    }

    fn open(&mut self, element: &BytesStart<'_>, position: u64) -> Result<(), CatalogError> {
        match element.name().as_ref() {
            b"category" => {
                self.current_category = attribute(element, b"name", position)?;
            }
            b"library" => {
                let record = self.start_record(element, ContributionType::Library, position)?;
                self.current = Some(record);
            }
            b"librarycompilation" => {
                let mut record =
                    self.start_record(element, ContributionType::LibraryCompilation, position)?;
                let names = attribute(element, b"libraryNames", position)?.ok_or_else(|| {
                    CatalogError::malformed(
                        position,
                        format!("<librarycompilation name=\"{}\"> has no libraryNames", record.name),
                    )
                })?;
                record.member_library_names = split_library_names(&names);
                self.current = Some(record);
            }
            b"author" => {
                let name = attribute(element, b"name", position)?.unwrap_or_default();
                let url = attribute(element, b"url", position)?;
                self.record_mut("author", position)?
                    .authors
                    .push(Author { name, url });
            }
            b"description" => {
                let sentence = attribute(element, b"sentence", position)?;
                let paragraph = attribute(element, b"paragraph", position)?;
                let record = self.record_mut("description", position)?;
                record.short_description = sentence;
                record.long_description = paragraph;
            }
            b"version" => {
                let id = attribute(element, b"id", position)?
                    .ok_or_else(|| CatalogError::malformed(position, "<version> has no id"))?;
                let version = id.trim().parse::<i32>().map_err(|_| {
                    CatalogError::malformed(position, format!("version id '{id}' is not an integer"))
                })?;
                let pretty = attribute(element, b"pretty", position)?;
                let record = self.record_mut("version", position)?;
                record.version = version;
                record.pretty_version = pretty;
            }
            b"location" => {
                let url = attribute(element, b"url", position)?;
                self.record_mut("location", position)?.download_link = url;
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8], position: u64) -> Result<(), CatalogError> {
        if name == b"library" || name == b"librarycompilation" {
            let record = self.current.take().ok_or_else(|| {
                CatalogError::malformed(position, "entry closed before it was opened")
            })?;
            self.records.push(record);
        }
        Ok(())
    }

    fn start_record(
        &self,
        element: &BytesStart<'_>,
        contribution_type: ContributionType,
        position: u64,
    ) -> Result<ContributionRecord, CatalogError> {
        if let Some(open) = &self.current {
            return Err(CatalogError::malformed(
                position,
                format!("<{contribution_type}> nested inside '{}'", open.name),
            ));
        }

        let name = attribute(element, b"name", position)?
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| {
                CatalogError::malformed(position, format!("<{contribution_type}> has no name"))
            })?;

        let mut record = ContributionRecord::new(name, contribution_type);
        record.category = self.current_category.clone();
        record.url = attribute(element, b"url", position)?;
        Ok(record)
    }

    fn record_mut(
        &mut self,
        element: &str,
        position: u64,
    ) -> Result<&mut ContributionRecord, CatalogError> {
        self.current.as_mut().ok_or_else(|| {
            CatalogError::malformed(position, format!("<{element}> outside of a catalog entry"))
        })
    }
}

/// Split `libraryNames="a; b;c"` into trimmed, non-empty names
fn split_library_names(names: &str) -> Vec<String> {
    names
        .split(';')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .collect()
}

fn attribute(
    element: &BytesStart<'_>,
    key: &[u8],
    position: u64,
) -> Result<Option<String>, CatalogError> {
    for attr in element.attributes() {
        let attr = attr
            .map_err(|err| CatalogError::malformed(position, format!("invalid attribute: {err}")))?;
        if attr.key.as_ref() == key {
            let value = attr.unescape_value().map_err(|err| {
                CatalogError::malformed(position, format!("invalid attribute value: {err}"))
            })?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Only UTF-8 (and its ASCII subset) documents are decoded
fn check_encoding(decl: &BytesDecl<'_>) -> Result<(), CatalogError> {
    let Some(encoding) = decl.encoding() else {
        return Ok(());
    };
    let encoding = encoding.map_err(|err| {
        CatalogError::ParseConfiguration(format!("unreadable encoding declaration: {err}"))
    })?;
    let label = String::from_utf8_lossy(&encoding).to_ascii_lowercase();
    match label.as_str() {
        "utf-8" | "utf8" | "us-ascii" | "ascii" => Ok(()),
        other => Err(CatalogError::ParseConfiguration(format!(
            "unsupported document encoding '{other}'"
        ))),
    }
}

fn map_xml_error(err: quick_xml::Error, position: u64, source: &str) -> CatalogError {
    match err {
        quick_xml::Error::Io(io) => CatalogError::Io {
            context: source.to_string(),
            source: std::io::Error::new(io.kind(), io.to_string()),
        },
        other => CatalogError::malformed(position, other.to_string()),
    }
}
