use std::mem;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::fonts::{encode_win_ansi, Font};
use super::layout::wrap_text;
use super::RenderError;
use crate::forms::{FieldMap, FieldSpec, FormRecord, Signature};

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const MARGIN: f32 = 72.0;

const TITLE_SIZE: f32 = 20.0;
const BODY_SIZE: f32 = 12.0;
const VALUE_X: f32 = 250.0;
const WRAP_X: f32 = 90.0;
const WRAP_WIDTH: f32 = 450.0;
const WRAP_LEADING: f32 = 14.0;
const PAGE_BREAK_Y: f32 = 100.0;
const SIGNATURE_BLOCK_Y: f32 = 350.0;
const SIGNATURE_WIDTH: u32 = 400;
const SIGNATURE_HEIGHT: u32 = 100;

/// Render a submission in the fixed paper layout: title and rule, one line
/// (or wrapped block) per field, then the signature images.
pub fn render_submission_pdf(
    fields: &FieldMap,
    layout: &[FieldSpec],
    title: &str,
    operator_signature: Option<&Signature>,
    supervisor_signature: Option<&Signature>,
) -> Result<Vec<u8>, RenderError> {
    let mut pages = PageWriter::new();

    pages.text(
        Font::Bold,
        TITLE_SIZE,
        (PAGE_WIDTH - Font::Bold.text_width(title, TITLE_SIZE)) / 2.0,
        PAGE_HEIGHT - 50.0,
        title,
    );
    pages.y = PAGE_HEIGHT - 80.0;
    pages.rule(MARGIN, PAGE_WIDTH - MARGIN, pages.y);
    pages.y -= 24.0;

    for spec in layout {
        let label = format!("{}:", spec.label);
        let value = fields.display(spec.key);
        if spec.is_long_text() {
            pages.text(Font::Bold, BODY_SIZE, MARGIN, pages.y, &label);
            pages.y -= 16.0;
            for line in wrap_text(&value, Font::Regular, BODY_SIZE, WRAP_WIDTH) {
                if pages.y < MARGIN {
                    pages.break_page();
                }
                pages.text(Font::Regular, BODY_SIZE, WRAP_X, pages.y, &line);
                pages.y -= WRAP_LEADING;
            }
            pages.y -= 10.0;
        } else {
            pages.text(Font::Bold, BODY_SIZE, MARGIN, pages.y, &label);
            pages.text(Font::Regular, BODY_SIZE, VALUE_X, pages.y, &value);
            pages.y -= 20.0;
        }
        if pages.y < PAGE_BREAK_Y {
            pages.break_page();
        }
    }

    if operator_signature.is_some() || supervisor_signature.is_some() {
        if pages.y < SIGNATURE_BLOCK_Y {
            pages.break_page();
        }
        if let Some(signature) = operator_signature {
            let bottom = pages.signature("Operator Signature:", signature, OPERATOR_IMAGE);
            pages.y = bottom - 30.0;
        }
        if let Some(signature) = supervisor_signature {
            let bottom = pages.signature("Supervisor Signature:", signature, SUPERVISOR_IMAGE);
            pages.y = bottom - 3.0;
        }
    }

    pages.finish()
}

/// Render a typed form record using its definition's title and field order.
pub fn render_form<F: FormRecord + ?Sized>(record: &F) -> Result<Vec<u8>, RenderError> {
    let definition = record.definition();
    render_submission_pdf(
        &record.field_map(),
        definition.fields,
        definition.title,
        record.operator_signature(),
        record.supervisor_signature(),
    )
}

const OPERATOR_IMAGE: &str = "Im1";
const SUPERVISOR_IMAGE: &str = "Im2";

struct PlacedImage {
    name: &'static str,
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

/// Accumulates content operations page by page, tracking the text cursor.
struct PageWriter {
    finished: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    images: Vec<PlacedImage>,
    y: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            finished: Vec::new(),
            current: Vec::new(),
            images: Vec::new(),
            y: PAGE_HEIGHT,
        }
    }

    fn break_page(&mut self) {
        self.finished.push(mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        if text.is_empty() {
            return;
        }
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.resource_name().into(), size.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(text))]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn rule(&mut self, from_x: f32, to_x: f32, y: f32) {
        self.current.extend([
            Operation::new("w", vec![1.into()]),
            Operation::new("m", vec![from_x.into(), y.into()]),
            Operation::new("l", vec![to_x.into(), y.into()]),
            Operation::new("S", vec![]),
        ]);
    }

    /// Draw a labelled signature box below the cursor; returns the image's
    /// bottom edge.
    fn signature(&mut self, label: &str, signature: &Signature, name: &'static str) -> f32 {
        self.text(Font::Bold, BODY_SIZE, MARGIN, self.y, label);
        let width = SIGNATURE_WIDTH as f32;
        let height = SIGNATURE_HEIGHT as f32;
        let bottom = self.y - 15.0 - height;

        let printed = signature.for_print(SIGNATURE_WIDTH, SIGNATURE_HEIGHT);
        self.images.push(PlacedImage {
            name,
            width: printed.width(),
            height: printed.height(),
            rgb: printed.into_raw(),
        });
        self.current.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    MARGIN.into(),
                    bottom.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
        bottom
    }

    fn finish(mut self) -> Result<Vec<u8>, RenderError> {
        // A break after the last field leaves an empty page behind.
        if !self.current.is_empty() || self.finished.is_empty() {
            self.finished.push(mem::take(&mut self.current));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for font in [Font::Regular, Font::Bold] {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), font_id);
        }

        let mut xobjects = Dictionary::new();
        for image in mem::take(&mut self.images) {
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(image.width),
                    "Height" => i64::from(image.height),
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8,
                },
                image.rgb,
            ));
            xobjects.set(image.name, image_id);
        }

        let mut resources = dictionary! { "Font" => fonts };
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }

        let mut kids: Vec<Object> = Vec::with_capacity(self.finished.len());
        for operations in self.finished {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id: ObjectId = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::incident::fixtures::completed_report;
    use crate::forms::signature::fixtures::stroked_canvas;

    fn page_operations(bytes: &[u8]) -> Vec<Vec<Operation>> {
        let doc = Document::load_mem(bytes).expect("parse pdf");
        doc.get_pages()
            .values()
            .map(|page_id| {
                let raw = doc.get_page_content(*page_id).expect("content");
                Content::decode(&raw).expect("decode").operations
            })
            .collect()
    }

    fn shown_text(operations: &[Operation]) -> Vec<Vec<u8>> {
        operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn identical_input_renders_identical_bytes() {
        let report = completed_report();
        let first = render_form(&report).expect("render");
        let second = render_form(&report).expect("render");
        assert_eq!(first, second);
    }

    #[test]
    fn title_is_the_first_text_drawn() {
        let bytes = render_form(&completed_report()).expect("render");
        let pages = page_operations(&bytes);
        let text = shown_text(&pages[0]);
        assert_eq!(text[0], b"Operator Incident Report".to_vec());
        assert!(text.contains(&b"Operator Name:".to_vec()));

        let everywhere: Vec<Vec<u8>> = pages.iter().flat_map(|ops| shown_text(ops)).collect();
        assert!(everywhere.contains(&b"Explanation of Incident:".to_vec()));
    }

    #[test]
    fn incident_layout_spills_onto_a_second_page_with_both_signatures() {
        let bytes = render_form(&completed_report()).expect("render");
        let pages = page_operations(&bytes);
        assert!(pages.len() >= 2);
        let images: usize = pages
            .iter()
            .map(|ops| ops.iter().filter(|op| op.operator == "Do").count())
            .sum();
        assert_eq!(images, 2);
        let last = shown_text(pages.last().expect("last page"));
        assert!(last.contains(&b"Supervisor Signature:".to_vec()));
    }

    #[test]
    fn long_paragraph_breaks_mid_text() {
        static LAYOUT: [FieldSpec; 1] = [FieldSpec::long_text("Explanation", "pay_explanation")];
        let mut fields = FieldMap::new();
        fields.insert("pay_explanation", "delayed by traffic ".repeat(900));
        let bytes = render_submission_pdf(&fields, &LAYOUT, "Overflow", None, None).expect("render");
        let pages = page_operations(&bytes);
        assert!(pages.len() >= 3);
        let draws: usize = pages.iter().map(|ops| shown_text(ops).len()).sum();
        let expected = 2 + wrap_text(
            &"delayed by traffic ".repeat(900),
            Font::Regular,
            BODY_SIZE,
            WRAP_WIDTH,
        )
        .len();
        assert_eq!(draws, expected);
    }

    #[test]
    fn signatures_alone_fit_on_an_empty_page() {
        let operator = Signature::from_rgba(stroked_canvas());
        let bytes = render_submission_pdf(&FieldMap::new(), &[], "Signatures", Some(&operator), None)
            .expect("render");
        let pages = page_operations(&bytes);
        assert_eq!(pages.len(), 1);
        let doc = Document::load_mem(&bytes).expect("parse");
        let image = doc
            .objects
            .values()
            .filter_map(|object| object.as_stream().ok())
            .find(|stream| {
                stream
                    .dict
                    .get(b"Subtype")
                    .and_then(Object::as_name)
                    .map(|name| name == b"Image")
                    .unwrap_or(false)
            })
            .expect("image stream");
        assert_eq!(image.dict.get(b"Width").and_then(Object::as_i64).ok(), Some(400));
        assert_eq!(image.dict.get(b"Height").and_then(Object::as_i64).ok(), Some(100));
    }

    #[test]
    fn signature_block_moves_to_a_fresh_page_below_350_points() {
        // 688 - 17 * 20 leaves the cursor at 348.
        let layout: Vec<FieldSpec> = (0..17).map(|_| FieldSpec::inline("Run", "run")).collect();
        let mut fields = FieldMap::new();
        fields.insert("run", "221");
        let operator = Signature::from_rgba(stroked_canvas());
        let supervisor = Signature::from_rgba(stroked_canvas());

        let bytes = render_submission_pdf(
            &fields,
            &layout,
            "Signatures",
            Some(&operator),
            Some(&supervisor),
        )
        .expect("render");
        let pages = page_operations(&bytes);

        assert_eq!(pages.len(), 2);
        let draws = |ops: &[Operation]| ops.iter().filter(|op| op.operator == "Do").count();
        assert_eq!(draws(&pages[0]), 0);
        assert_eq!(draws(&pages[1]), 2);
        let labels = shown_text(&pages[1]);
        assert!(labels.contains(&b"Operator Signature:".to_vec()));
        assert!(labels.contains(&b"Supervisor Signature:".to_vec()));
    }

    #[test]
    fn signature_block_stays_when_350_points_remain() {
        // 688 - 16 * 20 leaves the cursor at 368.
        let layout: Vec<FieldSpec> = (0..16).map(|_| FieldSpec::inline("Run", "run")).collect();
        let operator = Signature::from_rgba(stroked_canvas());

        let bytes = render_submission_pdf(&FieldMap::new(), &layout, "Signatures", Some(&operator), None)
            .expect("render");
        assert_eq!(page_operations(&bytes).len(), 1);
    }

    #[test]
    fn non_latin_text_is_replaced_not_dropped() {
        static LAYOUT: [FieldSpec; 1] = [FieldSpec::inline("Name", "name")];
        let mut fields = FieldMap::new();
        fields.insert("name", "Zo\u{eb} \u{4e2d}");
        let bytes = render_submission_pdf(&fields, &LAYOUT, "Names", None, None).expect("render");
        let text = shown_text(&page_operations(&bytes)[0]);
        assert_eq!(text[2], b"Zo\xeb ?".to_vec());
    }
}
