//! WordprocessingML package reader.
//!
//! Opens a `.docx` ZIP package and exposes what the ingestion pipeline needs:
//! the ordered top-level blocks of the document body (paragraphs, tables and
//! anything else), the text of section headers and footers, and resolution of
//! relationship ids to binary parts with their content types.
//!
//! Only the main document part and the parts it references are read. Every ZIP
//! entry is read through a size cap (zip-bomb protection).

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Main document part. Packages produced by Word always use this name.
pub const DOCUMENT_PART: &str = "word/document.xml";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
/// Maximum decompressed bytes to read from a single ZIP entry.
const MAX_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum OoxmlError {
    #[error("invalid package: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("missing part: {0}")]
    MissingPart(String),
    #[error("part {name} exceeds size limit ({limit} bytes)")]
    TooLarge { name: String, limit: u64 },
    #[error("malformed XML in {part}: {message}")]
    Xml { part: String, message: String },
    #[error("failed to read {part}: {source}")]
    Io {
        part: String,
        #[source]
        source: std::io::Error,
    },
}

/// A paragraph's visible text plus the image relationships embedded in its runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub text: String,
    pub image_rels: Vec<String>,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_rels: Vec::new(),
        }
    }

    pub fn with_images(text: impl Into<String>, rels: &[&str]) -> Self {
        Self {
            text: text.into(),
            image_rels: rels.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCell {
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<TableCell>>,
}

/// A direct child of the document body (or of a header/footer root).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    /// Section properties, bookmarks and other non-content children. They
    /// still occupy a traversal position.
    Other,
}

/// Header/footer references declared by one `w:sectPr`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionRefs {
    pub header: Option<String>,
    pub footer: Option<String>,
}

/// A parsed story: body, header or footer.
#[derive(Debug, Clone, Default)]
pub struct Story {
    pub blocks: Vec<Block>,
    pub sections: Vec<SectionRefs>,
}

/// A resolved binary part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Resolves relationship ids of the main document to their parts.
///
/// `Ok(None)` means the id is not a resolvable internal relationship; callers
/// skip such references. `Err` means the package itself is broken.
pub trait PartResolver {
    fn resolve_part(&mut self, rel_id: &str) -> Result<Option<Part>, OoxmlError>;
}

impl PartResolver for HashMap<String, Part> {
    fn resolve_part(&mut self, rel_id: &str) -> Result<Option<Part>, OoxmlError> {
        Ok(self.get(rel_id).cloned())
    }
}

#[derive(Debug, Clone)]
struct Relationship {
    target: String,
    external: bool,
}

#[derive(Debug, Default)]
struct ContentTypes {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    fn lookup(&self, part_name: &str) -> String {
        if let Some(ct) = self.overrides.get(&format!("/{}", part_name)) {
            return ct.clone();
        }
        part_name
            .rsplit_once('.')
            .and_then(|(_, ext)| self.defaults.get(&ext.to_ascii_lowercase()))
            .cloned()
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
    }
}

/// An opened `.docx` package.
pub struct Package<'a> {
    archive: zip::ZipArchive<Cursor<&'a [u8]>>,
    content_types: ContentTypes,
    relationships: HashMap<String, Relationship>,
    document: Story,
}

impl<'a> Package<'a> {
    pub fn open(bytes: &'a [u8]) -> Result<Self, OoxmlError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

        let content_types = if archive.file_names().any(|n| n == CONTENT_TYPES_PART) {
            let xml = read_zip_entry_bounded(&mut archive, CONTENT_TYPES_PART, MAX_ENTRY_BYTES)?;
            parse_content_types(&xml)?
        } else {
            ContentTypes::default()
        };

        let rels_part = rels_part_for(DOCUMENT_PART);
        let relationships = if archive.file_names().any(|n| n == rels_part) {
            let xml = read_zip_entry_bounded(&mut archive, &rels_part, MAX_ENTRY_BYTES)?;
            parse_relationships(&xml, &rels_part, part_dir(DOCUMENT_PART))?
        } else {
            HashMap::new()
        };

        let doc_xml = read_zip_entry_bounded(&mut archive, DOCUMENT_PART, MAX_ENTRY_BYTES)?;
        let document = parse_story(&doc_xml, b"body", DOCUMENT_PART)?;

        Ok(Self {
            archive,
            content_types,
            relationships,
            document,
        })
    }

    /// Top-level body blocks in document order.
    pub fn blocks(&self) -> &[Block] {
        &self.document.blocks
    }

    /// Paragraphs of every section's default header, in section order.
    pub fn header_paragraphs(&mut self) -> Result<Vec<Paragraph>, OoxmlError> {
        let refs: Vec<Option<String>> = self
            .document
            .sections
            .iter()
            .map(|s| s.header.clone())
            .collect();
        self.story_paragraphs(&refs, b"hdr")
    }

    /// Paragraphs of every section's default footer, in section order.
    pub fn footer_paragraphs(&mut self) -> Result<Vec<Paragraph>, OoxmlError> {
        let refs: Vec<Option<String>> = self
            .document
            .sections
            .iter()
            .map(|s| s.footer.clone())
            .collect();
        self.story_paragraphs(&refs, b"ftr")
    }

    /// A section without its own reference reuses the previous section's part.
    fn story_paragraphs(
        &mut self,
        refs: &[Option<String>],
        root: &[u8],
    ) -> Result<Vec<Paragraph>, OoxmlError> {
        let mut out = Vec::new();
        let mut linked: Option<String> = None;
        for rel_id in refs {
            if rel_id.is_some() {
                linked = rel_id.clone();
            }
            let Some(id) = linked.as_deref() else {
                continue;
            };
            let Some(rel) = self.relationships.get(id).filter(|r| !r.external).cloned() else {
                continue;
            };
            let xml = read_zip_entry_bounded(&mut self.archive, &rel.target, MAX_ENTRY_BYTES)?;
            let story = parse_story(&xml, root, &rel.target)?;
            out.extend(story.blocks.into_iter().filter_map(|b| match b {
                Block::Paragraph(p) => Some(p),
                _ => None,
            }));
        }
        Ok(out)
    }
}

impl PartResolver for Package<'_> {
    fn resolve_part(&mut self, rel_id: &str) -> Result<Option<Part>, OoxmlError> {
        let Some(rel) = self.relationships.get(rel_id) else {
            return Ok(None);
        };
        if rel.external {
            return Ok(None);
        }
        let name = rel.target.clone();
        let data = read_zip_entry_bounded(&mut self.archive, &name, MAX_ENTRY_BYTES)?;
        let content_type = self.content_types.lookup(&name);
        Ok(Some(Part {
            name,
            content_type,
            data,
        }))
    }
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, OoxmlError> {
    let entry = archive.by_name(name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => OoxmlError::MissingPart(name.to_string()),
        other => OoxmlError::Zip(other),
    })?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|source| OoxmlError::Io {
            part: name.to_string(),
            source,
        })?;
    if out.len() as u64 >= max_bytes {
        return Err(OoxmlError::TooLarge {
            name: name.to_string(),
            limit: max_bytes,
        });
    }
    Ok(out)
}

fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the source part's directory.
fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None if base_dir.is_empty() => target.to_string(),
        None => format!("{}/{}", base_dir, target),
    };
    let mut segments: Vec<&str> = Vec::new();
    for seg in joined.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

fn xml_error(part: &str, e: impl std::fmt::Display) -> OoxmlError {
    OoxmlError::Xml {
        part: part.to_string(),
        message: e.to_string(),
    }
}

fn attr(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        if a.key.local_name().as_ref() == local {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

fn parse_content_types(xml: &[u8]) -> Result<ContentTypes, OoxmlError> {
    let mut types = ContentTypes::default();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"Default" => {
                    if let (Some(ext), Some(ct)) = (attr(&e, b"Extension"), attr(&e, b"ContentType"))
                    {
                        types.defaults.insert(ext.to_ascii_lowercase(), ct);
                    }
                }
                b"Override" => {
                    if let (Some(name), Some(ct)) = (attr(&e, b"PartName"), attr(&e, b"ContentType"))
                    {
                        types.overrides.insert(name, ct);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(CONTENT_TYPES_PART, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(types)
}

fn parse_relationships(
    xml: &[u8],
    part: &str,
    base_dir: &str,
) -> Result<HashMap<String, Relationship>, OoxmlError> {
    let mut rels = HashMap::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    if let (Some(id), Some(target)) = (attr(&e, b"Id"), attr(&e, b"Target")) {
                        let external = attr(&e, b"TargetMode")
                            .map(|m| m.eq_ignore_ascii_case("External"))
                            .unwrap_or(false);
                        let target = if external {
                            target
                        } else {
                            resolve_target(base_dir, &target)
                        };
                        rels.insert(id, Relationship { target, external });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(part, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

enum ParagraphTarget {
    Story,
    Cell,
}

struct ParagraphBuilder {
    depth: usize,
    target: ParagraphTarget,
    paragraph: Paragraph,
}

/// Event-driven builder for the blocks of one story.
struct StoryBuilder<'c> {
    container: &'c [u8],
    stack: Vec<Vec<u8>>,
    story: Story,
    paragraph: Option<ParagraphBuilder>,
    table: Option<Table>,
    table_depth: usize,
    drawing_depth: usize,
    in_text: bool,
    section: SectionRefs,
}

impl<'c> StoryBuilder<'c> {
    fn new(container: &'c [u8]) -> Self {
        Self {
            container,
            stack: Vec::new(),
            story: Story::default(),
            paragraph: None,
            table: None,
            table_depth: 0,
            drawing_depth: 0,
            in_text: false,
            section: SectionRefs::default(),
        }
    }

    fn parent(&self) -> &[u8] {
        self.stack.last().map(|n| n.as_slice()).unwrap_or(b"")
    }

    /// Run-level content counts only outside drawings (text boxes are skipped).
    fn in_run_content(&self) -> bool {
        self.paragraph.is_some() && self.drawing_depth == 0 && self.parent() == b"r"
    }

    fn open(&mut self, e: &BytesStart<'_>) {
        let name = e.local_name().as_ref().to_vec();
        let at_top = self.parent() == self.container;

        match name.as_slice() {
            b"p" if self.paragraph.is_none() => {
                let target = if at_top {
                    Some(ParagraphTarget::Story)
                } else if self.parent() == b"tc" && self.table_depth == 1 {
                    Some(ParagraphTarget::Cell)
                } else {
                    None
                };
                if let Some(target) = target {
                    self.paragraph = Some(ParagraphBuilder {
                        depth: self.stack.len(),
                        target,
                        paragraph: Paragraph::default(),
                    });
                }
            }
            b"tbl" => {
                if at_top && self.table_depth == 0 {
                    self.table = Some(Table::default());
                }
                if self.table.is_some() {
                    self.table_depth += 1;
                }
            }
            b"tr" if self.table_depth == 1 => {
                if let Some(table) = self.table.as_mut() {
                    table.rows.push(Vec::new());
                }
            }
            b"tc" if self.table_depth == 1 => {
                if let Some(row) = self.table.as_mut().and_then(|t| t.rows.last_mut()) {
                    row.push(TableCell::default());
                }
            }
            b"drawing" | b"pict" => self.drawing_depth += 1,
            b"blip" if self.drawing_depth > 0 => {
                if let (Some(builder), Some(id)) = (self.paragraph.as_mut(), attr(e, b"embed")) {
                    builder.paragraph.image_rels.push(id);
                }
            }
            b"t" if self.in_run_content() => self.in_text = true,
            b"tab" if self.in_run_content() => self.push_text("\t"),
            b"br" | b"cr" if self.in_run_content() => self.push_text("\n"),
            b"headerReference" | b"footerReference" => {
                let is_default = attr(e, b"type").map(|t| t == "default").unwrap_or(true);
                if is_default {
                    let id = attr(e, b"id");
                    if name.as_slice() == b"headerReference" {
                        self.section.header = id;
                    } else {
                        self.section.footer = id;
                    }
                }
            }
            _ => {}
        }

        if at_top && name.as_slice() != b"p" && name.as_slice() != b"tbl" {
            self.story.blocks.push(Block::Other);
        }

        self.stack.push(name);
    }

    fn close(&mut self) {
        let Some(name) = self.stack.pop() else {
            return;
        };
        match name.as_slice() {
            b"p" => {
                let ours = self
                    .paragraph
                    .as_ref()
                    .map(|b| b.depth == self.stack.len())
                    .unwrap_or(false);
                if ours {
                    if let Some(builder) = self.paragraph.take() {
                        self.finish_paragraph(builder);
                    }
                }
            }
            b"tbl" if self.table_depth > 0 => {
                self.table_depth -= 1;
                if self.table_depth == 0 {
                    if let Some(table) = self.table.take() {
                        self.story.blocks.push(Block::Table(table));
                    }
                }
            }
            b"drawing" | b"pict" => self.drawing_depth = self.drawing_depth.saturating_sub(1),
            b"t" => self.in_text = false,
            b"sectPr" => {
                let refs = std::mem::take(&mut self.section);
                self.story.sections.push(refs);
            }
            _ => {}
        }
    }

    fn finish_paragraph(&mut self, builder: ParagraphBuilder) {
        match builder.target {
            ParagraphTarget::Story => self
                .story
                .blocks
                .push(Block::Paragraph(builder.paragraph)),
            ParagraphTarget::Cell => {
                if let Some(cell) = self
                    .table
                    .as_mut()
                    .and_then(|t| t.rows.last_mut())
                    .and_then(|r| r.last_mut())
                {
                    cell.paragraphs.push(builder.paragraph);
                }
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(builder) = self.paragraph.as_mut() {
            builder.paragraph.text.push_str(text);
        }
    }
}

/// Parse a story part whose block-level children sit under `container`
/// (`body` for the document, `hdr`/`ftr` for headers and footers).
pub fn parse_story(xml: &[u8], container: &[u8], part: &str) -> Result<Story, OoxmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut builder = StoryBuilder::new(container);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => builder.open(&e),
            Ok(Event::Empty(e)) => {
                builder.open(&e);
                builder.close();
            }
            Ok(Event::End(_)) => builder.close(),
            Ok(Event::Text(te)) if builder.in_text => {
                let text = te.unescape().map_err(|e| xml_error(part, e))?;
                builder.push_text(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(part, e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(builder.story)
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;

    fn body(inner: &str) -> Vec<u8> {
        format!("<w:document {}><w:body>{}</w:body></w:document>", W, inner).into_bytes()
    }

    #[test]
    fn test_paragraph_text_and_positions() {
        let xml = body(
            "<w:p><w:r><w:t xml:space=\"preserve\">Hello </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>\
             <w:p/>\
             <w:bookmarkStart w:id=\"0\"/>\
             <w:p><w:r><w:t>A &amp; B</w:t><w:tab/><w:t>C</w:t></w:r></w:p>\
             <w:sectPr/>",
        );
        let story = parse_story(&xml, b"body", DOCUMENT_PART).unwrap();
        assert_eq!(story.blocks.len(), 5);
        assert_eq!(
            story.blocks[0],
            Block::Paragraph(Paragraph::new("Hello world"))
        );
        assert_eq!(story.blocks[1], Block::Paragraph(Paragraph::default()));
        assert_eq!(story.blocks[2], Block::Other);
        assert_eq!(story.blocks[3], Block::Paragraph(Paragraph::new("A & B\tC")));
        assert_eq!(story.blocks[4], Block::Other);
        assert_eq!(story.sections.len(), 1);
    }

    #[test]
    fn test_table_cells_and_nested_tables() {
        let xml = body(
            "<w:tbl><w:tr>\
               <w:tc><w:p><w:r><w:t>Item</w:t></w:r></w:p></w:tc>\
               <w:tc><w:p><w:r><w:t>Price</w:t></w:r></w:p>\
                 <w:tbl><w:tr><w:tc><w:p><w:r><w:t>nested</w:t></w:r></w:p></w:tc></w:tr></w:tbl>\
               </w:tc>\
             </w:tr></w:tbl>",
        );
        let story = parse_story(&xml, b"body", DOCUMENT_PART).unwrap();
        assert_eq!(story.blocks.len(), 1);
        let Block::Table(table) = &story.blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].len(), 2);
        assert_eq!(table.rows[0][1].paragraphs, vec![Paragraph::new("Price")]);
    }

    #[test]
    fn test_drawing_blip_recorded_and_textbox_text_skipped() {
        let xml = body(
            "<w:p><w:r><w:t>Image 1: Setup</w:t></w:r>\
               <w:r><w:drawing><a:graphic><a:graphicData>\
                 <a:blip r:embed=\"rId5\"/>\
                 <w:txbxContent><w:p><w:r><w:t>box</w:t></w:r></w:p></w:txbxContent>\
               </a:graphicData></a:graphic></w:drawing></w:r></w:p>",
        );
        let story = parse_story(&xml, b"body", DOCUMENT_PART).unwrap();
        assert_eq!(
            story.blocks,
            vec![Block::Paragraph(Paragraph::with_images(
                "Image 1: Setup",
                &["rId5"]
            ))]
        );
    }

    #[test]
    fn test_section_references() {
        let xml = body(
            "<w:p><w:pPr><w:sectPr><w:headerReference w:type=\"default\" r:id=\"rId7\"/>\
             <w:headerReference w:type=\"first\" r:id=\"rId8\"/></w:sectPr></w:pPr></w:p>\
             <w:sectPr><w:footerReference w:type=\"default\" r:id=\"rId9\"/></w:sectPr>",
        );
        let story = parse_story(&xml, b"body", DOCUMENT_PART).unwrap();
        assert_eq!(story.sections.len(), 2);
        assert_eq!(story.sections[0].header.as_deref(), Some("rId7"));
        assert_eq!(story.sections[0].footer, None);
        assert_eq!(story.sections[1].footer.as_deref(), Some("rId9"));
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("word", "media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve_target("word", "/word/media/a.gif"), "word/media/a.gif");
        assert_eq!(resolve_target("word", "../customXml/item1.xml"), "customXml/item1.xml");
    }

    #[test]
    fn test_content_type_lookup() {
        let xml = br#"<Types><Default Extension="PNG" ContentType="image/png"/><Override PartName="/word/media/x.bin" ContentType="image/jpeg"/></Types>"#;
        let types = parse_content_types(xml).unwrap();
        assert_eq!(types.lookup("word/media/a.png"), "image/png");
        assert_eq!(types.lookup("word/media/x.bin"), "image/jpeg");
        assert_eq!(types.lookup("word/media/y.emf"), FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn test_invalid_zip_returns_error() {
        let err = Package::open(b"not a zip").err().unwrap();
        assert!(matches!(err, OoxmlError::Zip(_)));
    }
}
