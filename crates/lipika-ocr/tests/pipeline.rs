// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end: real PDFs and photos through rasterization, preprocessing, a
// stand-in recognizer, structuring, DOCX export and ZIP bundling.

use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lipika_core::error::{LipikaError, Result};
use lipika_core::types::{ImageEncoding, ItemStatus, MediaKind, PAGE_BREAK, PageImage, SourceFile};
use lipika_document::{DocumentExporter, DocumentStructurer, ImagePreprocessor, ParsedElement};
use lipika_ocr::{BatchOrchestrator, Notice, Recognizer, Throttle};
use lopdf::{Document, Object, Stream, dictionary};

/// Describes each page by its pixel size, as a small markdown document.
struct DimensionRecognizer;

#[async_trait]
impl Recognizer for DimensionRecognizer {
    async fn recognize(&self, page: &PageImage) -> Result<String> {
        let img = image::load_from_memory(&page.data)
            .map_err(|e| LipikaError::Recognition(e.to_string()))?;
        if img.width() == 13 {
            return Err(LipikaError::QuotaExceeded("credits".into()));
        }
        Ok(format!(
            "## Page {}x{}\nসারসংক্ষেপ\n| w | h |\n|---|---|\n| {} | {} |",
            img.width(),
            img.height(),
            img.width(),
            img.height()
        ))
    }
}

fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([180, 180, 180])));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
        .expect("jpeg");
    out
}

/// A scanned-style PDF: one DCT image per page.
fn scanned_pdf(pages: &[(u32, u32)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for &(width, height) in pages {
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg(width, height),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Resources" => dictionary! { "XObject" => dictionary! { "Im0" => image_id } },
        });
        kids.push(Object::Reference(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => count }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save pdf");
    out
}

fn document_xml(docx: &[u8]) -> String {
    let mut zip = zip::ZipArchive::new(Cursor::new(docx)).expect("docx zip");
    let mut xml = String::new();
    zip.by_name("word/document.xml")
        .expect("document part")
        .read_to_string(&mut xml)
        .expect("xml");
    xml
}

#[tokio::test]
async fn single_pdf_becomes_a_structured_docx() {
    let mut orchestrator = BatchOrchestrator::new(DimensionRecognizer).with_throttle(Throttle::none());
    let source = SourceFile::from_name("report.pdf", scanned_pdf(&[(40, 60), (3000, 1500)]))
        .expect("pdf source");

    let report = orchestrator.recognize_single(&source).await.expect("recognised");
    assert_eq!(report.total_pages, 2);
    assert!(report.failed_pages().is_empty());
    assert_eq!(report.text.matches(PAGE_BREAK).count(), 1);
    // The second page was downscaled to the 1600 px bound before recognition.
    assert!(report.text.contains("## Page 1600x800"));

    let elements = DocumentStructurer::new().parse(&report.text);
    let tables = elements
        .iter()
        .filter(|e| matches!(e, ParsedElement::Table { .. }))
        .count();
    assert_eq!(tables, 2);

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(lipika_document::output_name(&source.name));
    DocumentExporter::default()
        .export_to_file(&elements, &report.text, &path)
        .expect("export");
    assert!(path.ends_with("report.docx"));
    let xml = document_xml(&std::fs::read(&path).expect("read docx"));
    assert!(xml.contains("Page 40x60"));
    assert!(xml.contains("সারসংক্ষেপ"));
}

#[tokio::test]
async fn batch_run_bundles_completed_items() {
    let notices = Arc::new(Mutex::new(Vec::<Notice>::new()));
    let sink = Arc::clone(&notices);
    let mut orchestrator = BatchOrchestrator::new(DimensionRecognizer)
        .with_throttle(Throttle::none())
        .with_preprocessor(ImagePreprocessor::new(1600, 0.85))
        .with_notifier(move |notice: Notice| sink.lock().expect("lock").push(notice));

    let ids = orchestrator.enqueue_all([
        SourceFile::from_name("scan.pdf", scanned_pdf(&[(20, 30), (13, 13), (20, 30)])).expect("pdf"),
        SourceFile::new("photo.jpg", MediaKind::Image, jpeg(64, 48)),
        SourceFile::from_name("scan.png", jpeg(10, 10)).expect("image"),
        SourceFile::from_name("empty.pdf", b"%PDF-1.4 nothing".to_vec()).expect("pdf"),
    ]);

    let report = orchestrator.run().await;
    assert_eq!(report.items_completed, 2);
    assert_eq!(report.items_failed, 2);

    let statuses: Vec<ItemStatus> = ids
        .iter()
        .map(|id| orchestrator.item(*id).expect("item").status())
        .collect();
    assert_eq!(
        statuses,
        vec![ItemStatus::Failed, ItemStatus::Completed, ItemStatus::Completed, ItemStatus::Failed]
    );
    assert_eq!(notices.lock().expect("lock").len(), 2);
    // Page 1 of scan.pdf, then photo.jpg and scan.png.
    assert_eq!(orchestrator.previews().len(), 3);
    assert_eq!(orchestrator.previews()[0].image.encoding, ImageEncoding::Jpeg);

    let archive = orchestrator
        .export_archive(&DocumentExporter::default())
        .expect("archive");
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).expect("zip");
    let names: Vec<String> = zip.file_names().map(String::from).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"photo.docx".to_string()));
    assert!(names.contains(&"scan.docx".to_string()));

    let mut photo_doc = Vec::new();
    zip.by_name("photo.docx")
        .expect("photo entry")
        .read_to_end(&mut photo_doc)
        .expect("read");
    assert!(document_xml(&photo_doc).contains("Page 64x48"));
}
