//! Raster-to-PDF assembly.
//!
//! Each raster becomes one A4 page holding a single DCT-encoded (JPEG) image
//! XObject stretched over the whole media box. There is no text layer.
//! Page order is input order.

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};
use thiserror::Error;

/// A4 in PDF points.
pub const A4_WIDTH_PT: f32 = 595.28;
pub const A4_HEIGHT_PT: f32 = 841.89;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("no pages to assemble")]
    Empty,
    #[error("failed to encode page {page} as JPEG: {source}")]
    Encode {
        page: usize,
        source: image::ImageError,
    },
    #[error("failed to write PDF: {0}")]
    Write(String),
}

/// Build a PDF with one page per raster.
///
/// `title` goes into the document info dictionary when non-empty.
pub fn assemble(
    pages: &[DynamicImage],
    jpeg_quality: u8,
    title: &str,
) -> Result<Vec<u8>, PdfError> {
    if pages.is_empty() {
        return Err(PdfError::Empty);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());

    for (page, raster) in pages.iter().enumerate() {
        let jpeg = encode_jpeg(raster, jpeg_quality)
            .map_err(|source| PdfError::Encode { page, source })?;
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => raster.width() as i64,
                "Height" => raster.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false);
        let image_id = doc.add_object(image);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        A4_WIDTH_PT.into(),
                        0.into(),
                        0.into(),
                        A4_HEIGHT_PT.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| PdfError::Write(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), A4_WIDTH_PT.into(), A4_HEIGHT_PT.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info = dictionary! {
        "Producer" => Object::string_literal(concat!("ebook-studio ", env!("CARGO_PKG_VERSION"))),
    };
    if !title.trim().is_empty() {
        info.set("Title", text_string(title));
    }
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);

    doc.compress();
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfError::Write(e.to_string()))?;
    tracing::debug!(pages = pages.len(), bytes = buffer.len(), "PDF assembled");
    Ok(buffer)
}

fn encode_jpeg(raster: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = raster.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(out)
}

/// PDF text string: UTF-16BE with byte order mark, so any title survives.
fn text_string(text: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn raster(width: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, 14, Rgb([200, 40, 40])))
    }

    /// Width of the image on each page, in page order.
    fn page_image_widths(pdf: &[u8]) -> Vec<i64> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .values()
            .map(|&page_id| {
                let page = doc.get_dictionary(page_id).unwrap();
                let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
                let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
                let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
                let stream = doc.get_object(image_id).unwrap().as_stream().unwrap();
                stream.dict.get(b"Width").unwrap().as_i64().unwrap()
            })
            .collect()
    }

    #[test]
    fn empty_input_is_error() {
        assert!(matches!(assemble(&[], 80, ""), Err(PdfError::Empty)));
    }

    #[test]
    fn one_page_per_raster_in_order() {
        let pdf = assemble(&[raster(10), raster(11), raster(13)], 80, "Book").unwrap();
        assert!(pdf.starts_with(b"%PDF-1.5"));
        assert_eq!(page_image_widths(&pdf), vec![10, 11, 13]);
    }

    #[test]
    fn pages_are_a4() {
        let pdf = assemble(&[raster(10)], 80, "").unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let (_, &page_id) = doc.get_pages().iter().next().unwrap();
        let media_box = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        let height = media_box[3].as_float().unwrap();
        assert!((height - A4_HEIGHT_PT).abs() < 0.01);
    }

    #[test]
    fn images_are_jpeg() {
        let pdf = assemble(&[raster(10)], 50, "").unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        let jpeg_streams = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| {
                s.dict
                    .get(b"Filter")
                    .and_then(|f| f.as_name())
                    .is_ok_and(|n| n == b"DCTDecode")
            })
            .count();
        assert_eq!(jpeg_streams, 1);
    }

    #[test]
    fn title_is_utf16() {
        match text_string("책") {
            Object::String(bytes, _) => assert_eq!(bytes, vec![0xFE, 0xFF, 0xCC, 0x45]),
            other => panic!("unexpected {other:?}"),
        }
    }
}
