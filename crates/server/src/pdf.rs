//! Advance-request PDF composition.
//!
//! Takes the blank advance form template, stamps the request fields and the
//! applicant's signature image onto its first page, then appends every page
//! of the uploaded invoice PDF. All layout coordinates are relative to the
//! template's page size so letter and A4 templates both work.

use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use thiserror::Error;

const FONT_KEY: &str = "F1";

/// Field values stamped onto the form page. Text is reduced to printable
/// ASCII before drawing since the template font has no CJK glyphs.
pub struct AdvanceFields<'a> {
    pub applicant_name: &'a str,
    pub item_name: &'a str,
    pub amount_text: &'a str,
    pub item_comment: Option<&'a str>,
    pub invoice_date: &'a str,
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("failed to parse form template: {0}")]
    Template(lopdf::Error),
    #[error("form template has no pages")]
    EmptyTemplate,
    #[error("failed to parse invoice pdf: {0}")]
    Invoice(lopdf::Error),
    #[error("failed to embed signature image: {0}")]
    Signature(lopdf::Error),
    #[error("pdf composition failed: {0}")]
    Compose(#[from] lopdf::Error),
    #[error("failed to write pdf output: {0}")]
    Output(#[from] std::io::Error),
}

/// Stamp `fields` and the signature onto the template's first page and
/// append the invoice pages. Returns the finished document bytes.
pub fn compose_advance(
    template: &[u8],
    invoice: &[u8],
    signature_png: Vec<u8>,
    fields: &AdvanceFields<'_>,
) -> Result<Vec<u8>, ComposeError> {
    let mut doc = Document::load_mem(template).map_err(ComposeError::Template)?;
    let form_page = doc.page_iter().next().ok_or(ComposeError::EmptyTemplate)?;
    let (width, height) = page_size(&doc, form_page);

    stamp_fields(&mut doc, form_page, width, height, fields)?;

    let signature = lopdf::xobject::image_from(signature_png).map_err(ComposeError::Signature)?;
    // 180x60 box in the signing area, 80pt in from the right edge.
    doc.insert_image(form_page, signature, (width - 260.0, 80.0), (180.0, 60.0))
        .map_err(ComposeError::Signature)?;

    append_pages(&mut doc, invoice)?;

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

/// A minimal one-page letter-size document, used as the bundled form
/// template when no custom one is deployed.
pub fn blank_template() -> Result<Vec<u8>, ComposeError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(lopdf::Stream::new(dictionary! {}, Vec::new()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => Object::Reference(content_id),
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

/// Keep only printable ASCII; the built-in Helvetica used for stamping
/// cannot encode anything else.
pub fn to_ascii(text: &str) -> String {
    text.chars().filter(|c| (' '..='~').contains(c)).collect()
}

/// Greedy word wrap against an approximate Helvetica advance width of
/// half an em per character.
fn wrap_text(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let max_chars = ((max_width / (font_size * 0.5)) as usize).max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        loop {
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };
            if needed <= max_chars {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(word);
                break;
            }
            if current.is_empty() {
                // Word longer than the line: hard split.
                let (head, tail) = word.split_at(max_chars.min(word.len()));
                lines.push(head.to_string());
                word = tail;
                if word.is_empty() {
                    break;
                }
            } else {
                lines.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn text_ops(text: &str, x: f32, y: f32, size: f32) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(FONT_KEY.into()), Object::Real(size)],
        ),
        Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn stamp_fields(
    doc: &mut Document,
    page_id: ObjectId,
    width: f32,
    height: f32,
    fields: &AdvanceFields<'_>,
) -> Result<(), ComposeError> {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    {
        let resources = doc.get_or_create_resources(page_id)?.as_dict_mut()?;
        if !resources.has(b"Font") {
            resources.set("Font", Dictionary::new());
        }
        resources
            .get_mut(b"Font")?
            .as_dict_mut()?
            .set(FONT_KEY, Object::Reference(font_id));
    }

    let mut ops = Vec::new();
    ops.extend(text_ops(
        &to_ascii(fields.applicant_name),
        90.0,
        height - 110.0,
        12.0,
    ));
    ops.extend(text_ops(
        &to_ascii(fields.item_name),
        90.0,
        height - 170.0,
        12.0,
    ));
    ops.extend(text_ops(
        fields.amount_text,
        width - 150.0,
        height - 170.0,
        12.0,
    ));
    if let Some(comment) = fields.item_comment {
        let lines = wrap_text(&to_ascii(comment), width - 180.0, 10.0);
        for (row, line) in lines.iter().enumerate() {
            ops.extend(text_ops(line, 90.0, height - 200.0 - row as f32 * 12.0, 10.0));
        }
    }
    ops.extend(text_ops(
        &to_ascii(fields.invoice_date),
        width - 180.0,
        height - 110.0,
        12.0,
    ));

    let mut content = doc.get_and_decode_page_content(page_id)?;
    content.operations.extend(ops);
    doc.change_page_content(page_id, content.encode()?)?;
    Ok(())
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

/// Look up a page attribute, walking up the Pages tree for inherited values.
fn page_attr<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    loop {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
}

fn page_size(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let media_box = page_attr(doc, page_id, b"MediaBox")
        .and_then(|object| match object {
            Object::Reference(id) => doc.get_object(*id).ok(),
            direct => Some(direct),
        })
        .and_then(|object| object.as_array().ok());

    if let Some(rect) = media_box
        && rect.len() == 4
        && let (Some(x0), Some(y0), Some(x1), Some(y1)) = (
            number(&rect[0]),
            number(&rect[1]),
            number(&rect[2]),
            number(&rect[3]),
        )
    {
        return (x1 - x0, y1 - y0);
    }
    // US letter fallback.
    (612.0, 792.0)
}

/// Append every page of `invoice` to `doc`, renumbering the incoming
/// objects past the target's id space and reparenting the page leaves onto
/// the target's root Pages node.
fn append_pages(doc: &mut Document, invoice: &[u8]) -> Result<(), ComposeError> {
    let mut src = Document::load_mem(invoice).map_err(ComposeError::Invoice)?;

    // Inherited attributes stop resolving once the pages are reparented, so
    // pin them onto each page first.
    let mut pinned = Vec::new();
    for page_id in src.page_iter().collect::<Vec<_>>() {
        for key in [b"Resources".as_slice(), b"MediaBox", b"CropBox", b"Rotate"] {
            let on_page = src
                .get_dictionary(page_id)
                .is_ok_and(|dict| dict.has(key));
            if !on_page && let Some(value) = page_attr(&src, page_id, key) {
                pinned.push((page_id, key, value.clone()));
            }
        }
    }
    for (page_id, key, value) in pinned {
        if let Ok(dict) = doc_dict_mut(&mut src, page_id) {
            dict.set(key, value);
        }
    }

    src.renumber_objects_with(doc.max_id + 1);
    doc.max_id = src.max_id;

    let src_pages: Vec<ObjectId> = src.page_iter().collect();
    let pages_id = doc
        .catalog()?
        .get(b"Pages")
        .and_then(Object::as_reference)?;

    doc.objects.extend(src.objects);

    for page_id in &src_pages {
        if let Ok(dict) = doc_dict_mut(doc, *page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    let pages = doc_dict_mut(doc, pages_id)?;
    let count = pages
        .get(b"Count")
        .ok()
        .and_then(|object| object.as_i64().ok())
        .unwrap_or(0);
    {
        let kids = pages.get_mut(b"Kids")?.as_array_mut()?;
        kids.extend(src_pages.iter().map(|id| Object::Reference(*id)));
    }
    pages.set("Count", count + src_pages.len() as i64);

    Ok(())
}

fn doc_dict_mut(doc: &mut Document, id: ObjectId) -> Result<&mut Dictionary, lopdf::Error> {
    doc.get_object_mut(id)?.as_dict_mut()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;

    const ONE_PX_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    fn signature_png() -> Vec<u8> {
        STANDARD.decode(ONE_PX_PNG).unwrap()
    }

    fn invoice_with_pages(count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let kids: Vec<Object> = (0..count)
            .map(|_| {
                let content_id = doc.add_object(lopdf::Stream::new(dictionary! {}, Vec::new()));
                let page_id = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => Object::Reference(pages_id),
                    "Contents" => Object::Reference(content_id),
                });
                Object::Reference(page_id)
            })
            .collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count as i64,
                // Inherited by every page; must survive the merge.
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn fields() -> AdvanceFields<'static> {
        AdvanceFields {
            applicant_name: "Alice",
            item_name: "Reagents",
            amount_text: "1234",
            item_comment: Some("for the cold room"),
            invoice_date: "2025-01-06",
        }
    }

    #[test]
    fn to_ascii_strips_non_printable() {
        assert_eq!(to_ascii("Alice \u{738b}\u{5c0f}\u{660e}"), "Alice ");
        assert_eq!(to_ascii("plain text-123"), "plain text-123");
        assert_eq!(to_ascii("tab\there"), "tabhere");
    }

    #[test]
    fn wrap_text_respects_width() {
        let lines = wrap_text("one two three four five six seven", 60.0, 10.0);
        // 60pt / 5pt per char = 12 chars per line.
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.chars().count() <= 12, "line too long: {line}");
        }
        assert_eq!(
            lines.join(" "),
            "one two three four five six seven"
        );
    }

    #[test]
    fn wrap_text_hard_splits_long_words() {
        let lines = wrap_text("aaaaaaaaaaaaaaaaaaaaaaaa", 20.0, 10.0);
        assert!(lines.len() >= 2);
        assert_eq!(lines.concat(), "aaaaaaaaaaaaaaaaaaaaaaaa");
    }

    #[test]
    fn compose_appends_invoice_pages() {
        let template = blank_template().unwrap();
        let invoice = invoice_with_pages(2);

        let out = compose_advance(&template, &invoice, signature_png(), &fields()).unwrap();

        let merged = Document::load_mem(&out).unwrap();
        assert_eq!(merged.get_pages().len(), 3);
    }

    #[test]
    fn compose_stamps_fields_on_form_page() {
        let template = blank_template().unwrap();
        let invoice = invoice_with_pages(1);

        let out = compose_advance(&template, &invoice, signature_png(), &fields()).unwrap();

        let merged = Document::load_mem(&out).unwrap();
        let first = merged.page_iter().next().unwrap();
        let content = merged.get_and_decode_page_content(first).unwrap();
        let text: Vec<String> = content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands.first())
            .filter_map(|obj| obj.as_str().ok())
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect();

        assert!(text.contains(&"Alice".to_string()));
        assert!(text.contains(&"Reagents".to_string()));
        assert!(text.contains(&"1234".to_string()));
        assert!(text.contains(&"2025-01-06".to_string()));
    }

    #[test]
    fn compose_rejects_garbage_invoice() {
        let template = blank_template().unwrap();
        let err =
            compose_advance(&template, b"not a pdf", signature_png(), &fields()).unwrap_err();
        assert!(matches!(err, ComposeError::Invoice(_)));
    }

    #[test]
    fn compose_rejects_garbage_template() {
        let invoice = invoice_with_pages(1);
        let err =
            compose_advance(b"not a pdf", &invoice, signature_png(), &fields()).unwrap_err();
        assert!(matches!(err, ComposeError::Template(_)));
    }
}
