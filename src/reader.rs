//! PDF document reader backed by lopdf.

use std::path::{Path, PathBuf};

use crate::barcode::Pixmap;
use crate::error::{Error, Result};
use crate::source::{DocumentSource, Rasterizer, TextSource};

/// An open PDF document.
///
/// The handle is an ownership unit scoped to one acquisition: it is read-only
/// during page dispatch, may be shared by reference across pool threads, and
/// is released exactly once on drop. Workers in isolated mode re-acquire
/// their own handle via [`PdfDocument::open`] with the same path.
pub struct PdfDocument {
    doc: lopdf::Document,
    path: PathBuf,
}

impl PdfDocument {
    /// Open a PDF file.
    ///
    /// Fails with [`Error::NotFound`] for a missing file, [`Error::Corrupt`]
    /// for an unreadable container, and [`Error::Encrypted`] for a document
    /// that remains locked after the loader's password-less pass.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }

        let doc = lopdf::Document::load(path)?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }

        Ok(Self {
            doc,
            path: path.to_path_buf(),
        })
    }

    /// Path the document was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extract the embedded scan image of a page as a pixel buffer.
    ///
    /// Scanned documents carry each page as one image XObject; the largest
    /// image on the page is taken as the page scan.
    fn page_scan(&self, index: usize) -> Result<Pixmap> {
        let page_num = index as u32 + 1;
        let pages = self.doc.get_pages();
        let page_id = *pages
            .get(&page_num)
            .ok_or_else(|| Error::page_transform(page_num as usize, "page out of range"))?;

        let scan = self
            .largest_page_image(page_id)
            .ok_or_else(|| Error::page_transform(page_num as usize, "no embedded page image"))?;
        self.decode_image_stream(scan, page_num as usize)
    }

    /// Find the largest image XObject referenced by a page.
    fn largest_page_image(&self, page_id: lopdf::ObjectId) -> Option<&lopdf::Stream> {
        let page_dict = self.doc.get_dictionary(page_id).ok()?;
        let resources = self.resolve_dictionary(page_dict.get(b"Resources").ok()?)?;
        let xobjects = self.resolve_dictionary(resources.get(b"XObject").ok()?)?;

        let mut best: Option<(&lopdf::Stream, i64)> = None;
        for (_name, object) in xobjects.iter() {
            let Ok(reference) = object.as_reference() else {
                continue;
            };
            let Ok(lopdf::Object::Stream(stream)) = self.doc.get_object(reference) else {
                continue;
            };
            let is_image = stream
                .dict
                .get(b"Subtype")
                .ok()
                .and_then(|s| s.as_name_str().ok())
                == Some("Image");
            if !is_image {
                continue;
            }
            let area = image_area(&stream.dict);
            if best.map(|(_, best_area)| area > best_area).unwrap_or(true) {
                best = Some((stream, area));
            }
        }
        best.map(|(stream, _)| stream)
    }

    /// Decode an image XObject stream into a pixel buffer.
    fn decode_image_stream(&self, stream: &lopdf::Stream, page: usize) -> Result<Pixmap> {
        let width = dict_i64(&stream.dict, b"Width").unwrap_or(0) as u32;
        let height = dict_i64(&stream.dict, b"Height").unwrap_or(0) as u32;
        if width == 0 || height == 0 {
            return Err(Error::page_transform(page, "embedded image has no dimensions"));
        }

        let filter = stream
            .dict
            .get(b"Filter")
            .ok()
            .and_then(|f| f.as_name_str().ok())
            .unwrap_or("");

        match filter {
            // JPEG payload, decode through the image codec.
            "DCTDecode" | "JPXDecode" => {
                let decoded = image::load_from_memory(&stream.content)
                    .map_err(|e| Error::page_transform(page, e.to_string()))?;
                let rgb = decoded.to_rgb8();
                Ok(Pixmap::new(width, height, 3, true, rgb.into_raw()))
            }
            // Raw samples behind a lossless filter (or none).
            _ => {
                let bits = dict_i64(&stream.dict, b"BitsPerComponent").unwrap_or(8);
                if bits != 8 {
                    return Err(Error::page_transform(
                        page,
                        format!("unsupported bits per component: {bits}"),
                    ));
                }
                let samples = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let (channels, has_colorspace) =
                    match self.color_space_name(&stream.dict).as_deref() {
                        Some("DeviceRGB") => (3u8, true),
                        Some("DeviceGray") => (1, false),
                        _ => infer_channels(&samples, width, height).ok_or_else(|| {
                            Error::page_transform(page, "unsupported embedded image color space")
                        })?,
                    };
                Ok(Pixmap::new(width, height, channels, has_colorspace, samples))
            }
        }
    }

    /// Resolve the color space name, following one level of indirection.
    fn color_space_name(&self, dict: &lopdf::Dictionary) -> Option<String> {
        let cs = dict.get(b"ColorSpace").ok()?;
        match cs {
            lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).to_string()),
            lopdf::Object::Array(array) => array
                .first()
                .and_then(|o| o.as_name_str().ok())
                .map(String::from),
            lopdf::Object::Reference(r) => match self.doc.get_object(*r).ok()? {
                lopdf::Object::Name(name) => Some(String::from_utf8_lossy(name).to_string()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Resolve a dictionary that may sit behind a reference.
    fn resolve_dictionary<'a>(&'a self, object: &'a lopdf::Object) -> Option<&'a lopdf::Dictionary> {
        match object {
            lopdf::Object::Reference(r) => self.doc.get_dictionary(*r).ok(),
            lopdf::Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }
}

impl DocumentSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }
}

impl TextSource for PdfDocument {
    fn page_text(&self, index: usize) -> Result<String> {
        let page_num = index as u32 + 1;
        self.doc
            .extract_text(&[page_num])
            .map(|text| text.trim().to_string())
            .map_err(|e| Error::page_transform(page_num as usize, e.to_string()))
    }
}

impl Rasterizer for PdfDocument {
    /// The DPI hint is ignored: the page scan is returned at its stored
    /// resolution.
    fn rasterize(&self, index: usize, _dpi: u32) -> Result<Pixmap> {
        self.page_scan(index)
    }
}

fn dict_i64(dict: &lopdf::Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key).ok().and_then(|v| v.as_i64().ok())
}

/// Declared pixel area of an image XObject. Dimensions come straight from
/// the file, so the product saturates instead of overflowing.
fn image_area(dict: &lopdf::Dictionary) -> i64 {
    let width = dict_i64(dict, b"Width").unwrap_or(0);
    let height = dict_i64(dict, b"Height").unwrap_or(0);
    width.saturating_mul(height)
}

/// Derive the sample layout from the buffer size when the color space is
/// missing or exotic.
fn infer_channels(samples: &[u8], width: u32, height: u32) -> Option<(u8, bool)> {
    let pixels = width as usize * height as usize;
    if pixels == 0 || samples.len() % pixels != 0 {
        return None;
    }
    match samples.len() / pixels {
        1 => Some((1, false)),
        3 => Some((3, true)),
        4 => Some((4, true)),
        _ => None,
    }
}
