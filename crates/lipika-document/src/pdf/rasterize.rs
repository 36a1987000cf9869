// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF rasterization — turn every page of a PDF into one page image.
//
// The default implementation needs no native library: scanned PDFs carry one
// raster image per page, which is pulled out of the page's resources with
// `lopdf`. Fully vector PDFs need the pdfium-backed rasterizer instead.

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use lipika_core::error::{LipikaError, Result};
use lipika_core::types::{ImageEncoding, PageImage};
use tracing::{debug, info, instrument, warn};

use crate::image::preprocess::encode_png;

/// Converts a PDF into an ordered list of page images, one per page.
///
/// Implementations must either cover every page in document order or fail
/// as a whole; partial results are never returned.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<PageImage>>;
}

/// Check that a rasterizer produced exactly one image per page.
pub fn ensure_one_image_per_page(expected: usize, images: &[PageImage]) -> Result<()> {
    if expected != images.len() {
        return Err(LipikaError::Rasterization(format!(
            "rasterizer produced {} images for {} pages",
            images.len(),
            expected
        )));
    }
    Ok(())
}

fn load(pdf: &[u8]) -> Result<Document> {
    Document::load_mem(pdf)
        .map_err(|err| LipikaError::Rasterization(format!("failed to load PDF: {err}")))
}

/// Rasterizer for scanned PDFs: each page's largest embedded image becomes
/// the page image.
///
/// JPEG (`DCTDecode`) streams are passed through byte for byte; 8-bit RGB
/// and grayscale streams are decoded and re-encoded as PNG. A page without a
/// usable image fails the whole document.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedImageRasterizer;

impl Rasterizer for EmbeddedImageRasterizer {
    #[instrument(skip_all, fields(bytes_len = pdf.len()))]
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<PageImage>> {
        let document = load(pdf)?;
        let pages = document.get_pages();
        info!(pages = pages.len(), "Extracting page images");

        let expected = pages.len();
        let mut images = Vec::with_capacity(expected);
        // BTreeMap iteration is ordered by 1-based page number.
        for (page_number, page_id) in pages {
            let image = largest_page_image(&document, page_id).map_err(|err| {
                LipikaError::Rasterization(format!("page {page_number}: {err}"))
            })?;
            debug!(page_number, bytes = image.data.len(), "Page image extracted");
            images.push(image);
        }
        ensure_one_image_per_page(expected, &images)?;
        Ok(images)
    }
}

/// An image XObject found in a page's resources.
struct ImageCandidate<'a> {
    stream: &'a lopdf::Stream,
    area: u64,
}

fn largest_page_image(document: &Document, page_id: ObjectId) -> std::result::Result<PageImage, String> {
    let resources = page_resources(document, page_id)
        .ok_or_else(|| "page has no resources".to_string())?;
    let xobjects = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve_dict(document, obj))
        .ok_or_else(|| "page has no image".to_string())?;

    let mut best: Option<ImageCandidate<'_>> = None;
    for (_, obj) in xobjects.iter() {
        let Ok((_, Object::Stream(stream))) = document.dereference(obj) else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(|s| s.as_name())
            .map(|name| name == b"Image")
            .unwrap_or(false);
        if !is_image {
            continue;
        }
        let width = dict_int(&stream.dict, b"Width").unwrap_or(0);
        let height = dict_int(&stream.dict, b"Height").unwrap_or(0);
        let area = width.saturating_mul(height);
        if best.as_ref().is_none_or(|b| area > b.area) {
            best = Some(ImageCandidate { stream, area });
        }
    }

    let candidate = best.ok_or_else(|| "page has no image".to_string())?;
    decode_candidate(&candidate)
}

fn decode_candidate(candidate: &ImageCandidate<'_>) -> std::result::Result<PageImage, String> {
    let dict = &candidate.stream.dict;
    let content = &candidate.stream.content;
    let filters = stream_filters(dict);

    if filters.iter().any(|f| f.as_slice() == b"DCTDecode") {
        // Only a bare JPEG stream can be handed on as-is.
        if filters.len() != 1 {
            return Err(format!(
                "unsupported filter chain {} around DCTDecode",
                filter_names(&filters)
            ));
        }
        return Ok(PageImage::new(ImageEncoding::Jpeg, content.clone()));
    }

    let unsupported = filters
        .iter()
        .find(|f| f.as_slice() != b"FlateDecode")
        .map(|f| String::from_utf8_lossy(f).into_owned());
    if let Some(filter) = unsupported {
        return Err(format!("unsupported image filter {filter}"));
    }

    let bits = dict_int(dict, b"BitsPerComponent").unwrap_or(8);
    if bits != 8 {
        return Err(format!("unsupported image depth of {bits} bits"));
    }
    let width = dimension(dict, b"Width")?;
    let height = dimension(dict, b"Height")?;
    let pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| "image dimensions overflow".to_string())?;
    let rgb_len = pixels
        .checked_mul(3)
        .ok_or_else(|| "image dimensions overflow".to_string())?;

    let raw = if filters.is_empty() {
        content.clone()
    } else {
        candidate
            .stream
            .decompressed_content()
            .map_err(|err| format!("cannot inflate image: {err}"))?
    };

    let image = if raw.len() == rgb_len {
        RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8)
    } else if raw.len() == pixels {
        GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8)
    } else {
        warn!(width, height, bytes = raw.len(), "Image data does not match its dimensions");
        None
    }
    .ok_or_else(|| format!("unsupported {width}x{height} image layout"))?;

    let data = encode_png(&image).map_err(|err| err.to_string())?;
    Ok(PageImage::new(ImageEncoding::Png, data))
}

/// Resources of a page, following the `/Parent` chain for inherited ones.
fn page_resources(document: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = document.get_dictionary(page_id).ok()?;
    // The page tree is shallow in practice; the bound guards against cycles.
    for _ in 0..32 {
        if let Ok(resources) = node.get(b"Resources")
            && let Some(dict) = resolve_dict(document, resources)
        {
            return Some(dict);
        }
        let parent = node.get(b"Parent").ok()?;
        node = resolve_dict(document, parent)?;
    }
    None
}

fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    match document.dereference(object).ok()? {
        (_, Object::Dictionary(dict)) => Some(dict),
        _ => None,
    }
}

fn dict_int(dict: &Dictionary, key: &[u8]) -> Option<u64> {
    dict.get(key)
        .ok()
        .and_then(|obj| obj.as_i64().ok())
        .and_then(|value| u64::try_from(value).ok())
}

fn dimension(dict: &Dictionary, key: &[u8]) -> std::result::Result<u32, String> {
    let value = dict_int(dict, key).unwrap_or(0);
    u32::try_from(value).map_err(|_| "image dimensions overflow".to_string())
}

fn filter_names(filters: &[Vec<u8>]) -> String {
    filters
        .iter()
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn stream_filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(|name| name.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}
