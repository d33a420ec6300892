use std::path::Path;

use image::{codecs::jpeg::JpegEncoder, RgbImage};
use lopdf::{
    content::{Content, Operation},
    dictionary, Dictionary, Document, Object, ObjectId, Stream,
};
use vid_score_common::{Placement, SheetSpec};

use crate::definitions::{PDF_JPEG_QUALITY, POINTS_PER_MM};
use crate::Error;

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

/// The `cm` operands that map the unit square onto a placement, in PDF points.
/// PDF space has its origin at the bottom-left of the page, so y is flipped.
fn placement_matrix(spec: &SheetSpec, p: &Placement) -> [f64; 6] {
    let sheet_height_pt = spec.height_mm() * POINTS_PER_MM;

    let w = p.w_mm * POINTS_PER_MM;
    let h = p.h_mm * POINTS_PER_MM;
    let x = p.x_mm * POINTS_PER_MM;
    let y = sheet_height_pt - (p.y_mm + p.h_mm) * POINTS_PER_MM;

    [w, 0.0, 0.0, h, x, y]
}

fn jpeg_xobject(img: &RgbImage) -> Result<Stream, Error> {
    let mut jpeg = vec![];
    JpegEncoder::new_with_quality(&mut jpeg, PDF_JPEG_QUALITY)
        .encode_image(img)
        .map_err(|e| Error::Pdf(format!("failed to encode page image: {e}")))?;

    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(img.width()),
            "Height" => i64::from(img.height()),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ))
}

/// Builds a PDF with one page per sheet. Each page is `width_mm x height_mm` of the
/// [`SheetSpec`], and each placed image is embedded as a JPEG.
pub struct PdfSheetWriter {
    spec: SheetSpec,
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    num_images: usize,
}

impl PdfSheetWriter {
    pub fn new(spec: SheetSpec) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        Self {
            spec,
            doc,
            pages_id,
            page_ids: vec![],
            num_images: 0,
        }
    }

    pub fn spec(&self) -> &SheetSpec {
        &self.spec
    }

    pub fn num_sheets(&self) -> usize {
        self.page_ids.len()
    }

    /// Append one sheet. Sheets appear in the document in the order they are added.
    pub fn add_sheet<'a, I>(&mut self, placed: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (&'a Placement, &'a RgbImage)>,
    {
        let mut xobjects = Dictionary::new();
        let mut operations = vec![];

        for (placement, img) in placed {
            if img.width() == 0 || img.height() == 0 {
                warn!("page {} has no pixels. Leaving its slot empty", placement.page_index);
                continue;
            }

            let name = format!("Im{}", self.num_images);
            self.num_images += 1;

            let image_id = self.doc.add_object(jpeg_xobject(img)?);
            xobjects.set(name.clone(), image_id);

            let matrix = placement_matrix(&self.spec, placement);
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new("cm", matrix.into_iter().map(real).collect()),
                Operation::new("Do", vec![Object::Name(name.into_bytes())]),
                Operation::new("Q", vec![]),
            ]);
        }

        let content = Content { operations };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));

        let resources_id = self.doc.add_object(dictionary! {
            "XObject" => xobjects,
        });

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![
                real(0.0),
                real(0.0),
                real(self.spec.width_mm() * POINTS_PER_MM),
                real(self.spec.height_mm() * POINTS_PER_MM),
            ],
        });
        self.page_ids.push(page_id);

        Ok(())
    }

    fn into_document(mut self) -> Document {
        let kids = self
            .page_ids
            .iter()
            .map(|&id| Object::Reference(id))
            .collect::<Vec<_>>();

        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        self.doc
    }

    pub fn save(self, path: impl AsRef<Path>) -> Result<(), Error> {
        let mut doc = self.into_document();
        doc.save(path)?;
        Ok(())
    }

    pub fn to_bytes(self) -> Result<Vec<u8>, Error> {
        let mut doc = self.into_document();
        let mut buf = vec![];
        doc.save_to(&mut buf)?;
        Ok(buf)
    }
}
