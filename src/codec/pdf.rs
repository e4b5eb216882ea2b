//! PDF loading and composition with `lopdf`.
//!
//! [`compose`] builds a fresh document whose page tree holds, in order, one
//! page per [`PdfPage`]: image pages draw a JPEG XObject into the rectangle
//! given by their [`PageLayout`], document pages are deep-copied from a
//! loaded source together with everything they reference.

use super::CodecError;
use crate::pipeline::layout::PageLayout;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// US Letter, used when a source page declares no media box anywhere.
const DEFAULT_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// A decoded image ready to be placed on a page.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// Baseline RGB JPEG bytes, embedded as-is with `DCTDecode`.
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A parsed source PDF.
#[derive(Debug, Clone)]
pub struct LoadedPdf {
    pub document: Document,
    pub page_count: usize,
}

/// One entry of a composition, in output order.
#[derive(Debug, Clone)]
pub enum PdfPage {
    Image {
        image: EmbeddedImage,
        layout: PageLayout,
    },
    /// Every page of the document, in its own order.
    Document(LoadedPdf),
}

/// A serialised composite document.
#[derive(Debug, Clone)]
pub struct ComposedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Parse PDF bytes, rejecting encrypted or page-less documents.
pub fn load(input: &[u8]) -> Result<LoadedPdf, CodecError> {
    let document = Document::load_mem(input)?;
    if document.is_encrypted() {
        return Err(CodecError::Malformed("PDF is encrypted".into()));
    }
    let page_count = document.get_pages().len();
    if page_count == 0 {
        return Err(CodecError::Malformed("PDF has no pages".into()));
    }
    Ok(LoadedPdf {
        document,
        page_count,
    })
}

/// Build one document from `pages`.
pub fn compose(pages: Vec<PdfPage>) -> Result<ComposedPdf, CodecError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for (index, page) in pages.into_iter().enumerate() {
        match page {
            PdfPage::Image { image, layout } => {
                let page_id = add_image_page(&mut doc, pages_id, &image, &layout, index)?;
                kids.push(Object::Reference(page_id));
            }
            PdfPage::Document(source) => {
                let copied = copy_pages(&mut doc, pages_id, &source.document)?;
                kids.extend(copied.into_iter().map(Object::Reference));
            }
        }
    }

    if kids.is_empty() {
        return Err(CodecError::Malformed("nothing to compose".into()));
    }

    let page_count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(ComposedPdf { bytes, page_count })
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    image: &EmbeddedImage,
    layout: &PageLayout,
    index: usize,
) -> Result<ObjectId, CodecError> {
    let name = format!("Im{index}");
    let xobject = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width),
            "Height" => i64::from(image.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
            "Filter" => "DCTDecode",
        },
        image.jpeg.clone(),
    )
    .with_compression(false);
    let image_id = doc.add_object(xobject);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(layout.width),
                    Object::Integer(0),
                    Object::Integer(0),
                    real(layout.height),
                    real(layout.x),
                    real(layout.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let mut xobjects = Dictionary::new();
    xobjects.set(name, Object::Reference(image_id));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            real(layout.page_width),
            real(layout.page_height),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! { "XObject" => xobjects },
    }))
}

/// Copy every page of `source` into `target`, re-parented under `parent`.
fn copy_pages(target: &mut Document, parent: ObjectId, source: &Document) -> Result<Vec<ObjectId>, CodecError> {
    // get_pages is keyed by page number, so iteration is in reading order.
    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();

    let mut copier = ObjectCopier::new(source, target);
    // Every page gets its target id before anything is copied, so links and
    // annotations pointing at a later page resolve to that page's copy.
    let copied: Vec<ObjectId> = page_ids.iter().map(|&id| copier.reserve(id)).collect();

    for (&page_id, &new_id) in page_ids.iter().zip(&copied) {
        let mut page = source.get_dictionary(page_id)?.clone();
        for key in INHERITABLE {
            if !page.has(key) {
                if let Some(value) = inherited_attribute(source, &page, key) {
                    page.set(key.to_vec(), value);
                }
            }
        }
        if !page.has(b"MediaBox") {
            page.set(
                "MediaBox",
                DEFAULT_MEDIA_BOX.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
            );
        }
        page.remove(b"Parent");
        copier.fill(new_id, Object::Dictionary(page))?;
    }

    for page_id in &copied {
        if let Ok(Object::Dictionary(dict)) = target.get_object_mut(*page_id) {
            dict.set("Parent", Object::Reference(parent));
        }
    }
    Ok(copied)
}

/// Walk up the page tree looking for `key`.
fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut next = page.get(b"Parent").and_then(Object::as_reference).ok();
    // Bounded: malformed files can contain Parent cycles.
    for _ in 0..64 {
        let node = doc.get_dictionary(next?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        next = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Deep copy of objects between documents.
///
/// Each source object is copied at most once; `id_map` records where it
/// went. A placeholder is registered before recursing so reference cycles
/// terminate.
struct ObjectCopier<'a> {
    source: &'a Document,
    target: &'a mut Document,
    id_map: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document, target: &'a mut Document) -> Self {
        Self {
            source,
            target,
            id_map: HashMap::new(),
        }
    }

    /// Allocate the target id for `source_id` without copying it yet.
    fn reserve(&mut self, source_id: ObjectId) -> ObjectId {
        let new_id = self.target.add_object(Object::Null);
        self.id_map.insert(source_id, new_id);
        new_id
    }

    /// Store `object`, with its references remapped, under a reserved id.
    fn fill(&mut self, target_id: ObjectId, object: Object) -> Result<(), lopdf::Error> {
        let remapped = self.remap(object)?;
        self.target.objects.insert(target_id, remapped);
        Ok(())
    }

    fn copy_object(&mut self, source_id: ObjectId) -> Result<ObjectId, lopdf::Error> {
        if let Some(target_id) = self.id_map.get(&source_id) {
            return Ok(*target_id);
        }
        let new_id = self.reserve(source_id);
        let object = self.source.get_object(source_id)?.clone();
        self.fill(new_id, object)?;
        Ok(new_id)
    }

    fn remap(&mut self, object: Object) -> Result<Object, lopdf::Error> {
        match object {
            Object::Reference(id) => Ok(Object::Reference(self.copy_object(id)?)),
            Object::Array(items) => items
                .into_iter()
                .map(|o| self.remap(o))
                .collect::<Result<Vec<_>, _>>()
                .map(Object::Array),
            Object::Dictionary(mut dict) => {
                for (_, value) in dict.iter_mut() {
                    *value = self.remap(std::mem::replace(value, Object::Null))?;
                }
                Ok(Object::Dictionary(dict))
            }
            Object::Stream(mut stream) => {
                for (_, value) in stream.dict.iter_mut() {
                    *value = self.remap(std::mem::replace(value, Object::Null))?;
                }
                Ok(Object::Stream(stream))
            }
            other => Ok(other),
        }
    }
}
