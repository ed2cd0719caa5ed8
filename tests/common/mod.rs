#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

const NAMESPACES: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture""#;

pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
pub const JPEG_BYTES: &[u8] = &[0xff, 0xd8, 0xff, 0xe0];

/// Builds minimal `.docx` packages in memory.
#[derive(Default)]
pub struct DocxBuilder {
    body: String,
    rels: Vec<String>,
    parts: Vec<(String, Vec<u8>)>,
    header_rel: Option<String>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        self.body.push_str(&paragraph_xml(text));
        self
    }

    pub fn empty_paragraph(mut self) -> Self {
        self.body.push_str("<w:p/>");
        self
    }

    /// A paragraph holding `text` followed by an inline picture.
    pub fn image_paragraph(mut self, text: &str, rel_id: &str) -> Self {
        let run = if text.is_empty() {
            String::new()
        } else {
            format!("<w:r><w:t xml:space=\"preserve\">{}</w:t></w:r>", text)
        };
        self.body.push_str(&format!("<w:p>{}{}</w:p>", run, drawing_xml(rel_id)));
        self
    }

    /// A table; each row is a list of cell texts.
    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        self.body.push_str("<w:tbl>");
        for row in rows {
            self.body.push_str("<w:tr>");
            for cell in *row {
                self.body
                    .push_str(&format!("<w:tc>{}</w:tc>", paragraph_xml(cell)));
            }
            self.body.push_str("</w:tr>");
        }
        self.body.push_str("</w:tbl>");
        self
    }

    /// Register an image part under `word/media/{name}`.
    pub fn image(mut self, rel_id: &str, name: &str, data: &[u8]) -> Self {
        self.rels.push(format!(
            r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/{}"/>"#,
            rel_id, name
        ));
        self.parts.push((format!("word/media/{}", name), data.to_vec()));
        self
    }

    /// Register an internal image relationship whose part is absent from the package.
    pub fn dangling_image(mut self, rel_id: &str, name: &str) -> Self {
        self.rels.push(format!(
            r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/{}"/>"#,
            rel_id, name
        ));
        self
    }

    /// Register an externally linked image, which has no part in the package.
    pub fn external_image(mut self, rel_id: &str, url: &str) -> Self {
        self.rels.push(format!(
            r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="{}" TargetMode="External"/>"#,
            rel_id, url
        ));
        self
    }

    pub fn header(mut self, text: &str) -> Self {
        let rel_id = "rIdHeader1".to_string();
        self.rels.push(format!(
            r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>"#,
            rel_id
        ));
        let xml = format!("<w:hdr {}>{}</w:hdr>", NAMESPACES, paragraph_xml(text));
        self.parts.push(("word/header1.xml".to_string(), xml.into_bytes()));
        self.header_rel = Some(rel_id);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let sect_pr = match &self.header_rel {
            Some(id) => format!(
                r#"<w:sectPr><w:headerReference w:type="default" r:id="{}"/></w:sectPr>"#,
                id
            ),
            None => "<w:sectPr/>".to_string(),
        };
        let document = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document {}><w:body>{}{}</w:body></w:document>",
            NAMESPACES, self.body, sect_pr
        );
        let rels = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{}</Relationships>",
            self.rels.concat()
        );
        let content_types = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
            <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
            <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
            <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
            <Default Extension=\"png\" ContentType=\"image/png\"/>\
            <Default Extension=\"jpeg\" ContentType=\"image/jpeg\"/>\
            <Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
            </Types>";

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        let mut entries: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".to_string(), content_types.as_bytes().to_vec()),
            ("word/document.xml".to_string(), document.into_bytes()),
            ("word/_rels/document.xml.rels".to_string(), rels.into_bytes()),
        ];
        entries.extend(self.parts);
        for (name, data) in entries {
            zip.start_file(name, options).unwrap();
            zip.write_all(&data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

fn paragraph_xml(text: &str) -> String {
    if text.is_empty() {
        return "<w:p/>".to_string();
    }
    format!(
        "<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        text
    )
}

fn drawing_xml(rel_id: &str) -> String {
    format!(
        "<w:r><w:drawing><wp:inline><a:graphic><a:graphicData>\
         <pic:pic><pic:blipFill><a:blip r:embed=\"{}\"/></pic:blipFill></pic:pic>\
         </a:graphicData></a:graphic></wp:inline></w:drawing></w:r>",
        rel_id
    )
}

/// An SOP-style document: two jurisdictions, one captioned image, one
/// external image, a table and a header.
pub fn sample_docx() -> Vec<u8> {
    DocxBuilder::new()
        .header("Company SOP")
        .image("rId10", "image1.png", PNG_BYTES)
        .external_image("rId11", "https://example.com/remote.png")
        .paragraph("Ohio Regular Orders")
        .paragraph("Order limit is 40 units per store.")
        .image_paragraph("", "rId10")
        .paragraph("Image 1: Ohio Order Form.")
        .table(&[&["State", "Limit"], &["OH", "40"]])
        .empty_paragraph()
        .paragraph("Nevada pricing follows the menu price list.")
        .image_paragraph("Linked diagram", "rId11")
        .build()
}
