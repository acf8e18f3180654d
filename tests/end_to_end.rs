//! Whole-document audits through the batch orchestrator with stand-in models

mod common;

use brand_audit::common::{BBox, BrandKit, FindingKind, InspectionResult, Level, Status};
use brand_audit::layout::{InMemoryPages, ManifestDocument, NativeBlock};
use brand_audit::orchestrator::{AuditConfig, AuditSession, BatchOrchestrator, ComplianceStatus};
use brand_audit::typography::{FontLibrary, GlyphEmbeddingMap, GLYPH_SIZE};
use brand_audit::DocumentReport;
use common::{host, host_with_ocr, single_page, text_block, textured_logo, word, ScriptedOcr};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

fn kit_with_logo(logo_path: &Path) -> BrandKit {
    BrandKit::from_yaml_str(&format!(
        "id: acme\nname: Acme\ncolors:\n  - name: Blue\n    hex: '#0050A0'\nlogo:\n  assets:\n    - name: primary\n      path: '{}'\n",
        logo_path.display()
    ))
    .unwrap()
}

fn audit(
    ocr: ScriptedOcr,
    kit: BrandKit,
    fonts: FontLibrary,
    document: &ManifestDocument,
    pages: Vec<RgbImage>,
) -> DocumentReport {
    let host = host_with_ocr(ocr);
    let config = AuditConfig::default();
    let session = AuditSession::prepare(&host, kit, fonts, &config).unwrap();
    BatchOrchestrator::new(Arc::clone(&host), &config)
        .audit_document(&session, document, &InMemoryPages::new(pages))
        .unwrap()
}

fn of_kind(report: &DocumentReport, kind: FindingKind) -> Vec<&InspectionResult> {
    report.results().filter(|r| r.kind == kind).collect()
}

fn logo_page(dir: &Path) -> (BrandKit, ManifestDocument, RgbImage) {
    let logo = textured_logo(7, 160, 100);
    let logo_path = dir.join("primary.png");
    logo.save(&logo_path).unwrap();

    let mut page = RgbImage::from_pixel(640, 480, Rgb([255, 255, 255]));
    image::imageops::replace(&mut page, &logo, 100, 80);
    let document = single_page(
        640,
        480,
        vec![NativeBlock::Image {
            bbox: BBox::new(100.0, 80.0, 260.0, 180.0),
        }],
    );
    (kit_with_logo(&logo_path), document, page)
}

#[test]
fn test_reference_logo_is_found_once_and_passes() {
    let dir = tempfile::tempdir().unwrap();
    let (kit, document, page) = logo_page(dir.path());
    let report = audit(ScriptedOcr::default(), kit, FontLibrary::default(), &document, vec![page]);

    assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
    let logos = of_kind(&report, FindingKind::Logo);
    assert_eq!(logos.len(), 1);
    assert_eq!(logos[0].status, Status::Pass);
    assert_eq!(logos[0].metric, "primary");
    assert!((logos[0].bbox.x0 - 100.0 / 640.0).abs() < 0.01);
    assert!((logos[0].bbox.y0 - 80.0 / 480.0).abs() < 0.01);

    // the figure is explained by the logo match, nothing left for the cascade
    assert!(of_kind(&report, FindingKind::Imagery).is_empty());
    let background = of_kind(&report, FindingKind::BackgroundColor);
    assert_eq!(background.len(), 1);
    assert_eq!(background[0].status, Status::Pass);
    assert_eq!(report.summary.status, ComplianceStatus::Compliant);
}

#[test]
fn test_repeated_audits_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let (kit, document, page) = logo_page(dir.path());
    let first = audit(
        ScriptedOcr::default(),
        kit.clone(),
        FontLibrary::default(),
        &document,
        vec![page.clone()],
    );
    let second = audit(ScriptedOcr::default(), kit, FontLibrary::default(), &document, vec![page]);
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[test]
fn test_off_palette_background_fails() {
    let kit = BrandKit::from_yaml_str("id: acme\nname: Acme\ncolors:\n  - name: Blue\n    hex: '#0050A0'\n").unwrap();
    let page = RgbImage::from_pixel(300, 200, Rgb([200, 30, 160]));
    let report = audit(
        ScriptedOcr::default(),
        kit,
        FontLibrary::default(),
        &single_page(300, 200, Vec::new()),
        vec![page],
    );

    let background = of_kind(&report, FindingKind::BackgroundColor);
    assert_eq!(background.len(), 1);
    assert_eq!(background[0].status, Status::Fail);
    assert_eq!(background[0].level, Level::Medium);
    assert_eq!(background[0].metric, "background match ratio 0.00");
    assert_eq!(background[0].bbox, BBox::new(0.0, 0.0, 1.0, 1.0));
}

#[test]
fn test_kit_without_colors_only_warns() {
    let kit = BrandKit::from_yaml_str("id: bare\nname: Bare\n").unwrap();
    let mut page = RgbImage::from_pixel(300, 200, Rgb([10, 200, 90]));
    draw_filled_rect_mut(&mut page, Rect::at(20, 40).of_size(120, 14), Rgb([250, 250, 0]));
    let ocr = ScriptedOcr {
        words: vec![word("Hello", 20.0, 40.0, 80.0, 54.0), word("there", 84.0, 40.0, 140.0, 54.0)],
        symbols: Vec::new(),
    };
    let document = single_page(
        300,
        200,
        vec![text_block(BBox::new(20.0, 40.0, 140.0, 54.0), "Hello there", 11.0)],
    );
    let report = audit(ocr, kit, FontLibrary::default(), &document, vec![page]);

    let palette: Vec<_> = report
        .results()
        .filter(|r| matches!(r.kind, FindingKind::BackgroundColor | FindingKind::TextColor))
        .collect();
    assert_eq!(palette.len(), 2);
    assert!(palette.iter().all(|r| r.status == Status::Warning));
}

/// Reference embeddings pointing away from every ink histogram
fn unmatched_library() -> FontLibrary {
    let glyphs: BTreeMap<String, Vec<f32>> = ["B", "R", "A", "N", "D"]
        .iter()
        .map(|c| (c.to_string(), vec![-0.125; 64]))
        .collect();
    FontLibrary::new(vec![GlyphEmbeddingMap {
        font_family: "Acme Sans".to_string(),
        font_file: "AcmeSans.ttf".to_string(),
        glyph_size: GLYPH_SIZE,
        glyphs,
    }])
}

#[test]
fn test_unknown_header_font_warns_once() {
    let kit = BrandKit::from_yaml_str("id: acme\nname: Acme\ntypography:\n  - family: Acme Sans\n").unwrap();
    let words = vec![
        word("BRAND", 20.0, 20.0, 200.0, 60.0),
        word("NEWS", 220.0, 20.0, 360.0, 60.0),
        word("Quarterly", 20.0, 100.0, 110.0, 112.0),
        word("results", 116.0, 100.0, 190.0, 112.0),
        word("were", 20.0, 120.0, 60.0, 132.0),
        word("strong", 66.0, 120.0, 130.0, 132.0),
        word("this", 20.0, 140.0, 56.0, 152.0),
        word("year", 62.0, 140.0, 104.0, 152.0),
    ];
    let mut page = RgbImage::from_pixel(400, 300, Rgb([255, 255, 255]));
    for w in &words {
        let (x, y, width, height) = w.bbox.pixel_rect(400, 300).unwrap();
        draw_filled_rect_mut(
            &mut page,
            Rect::at(x as i32, y as i32).of_size(width, height),
            Rgb([20, 20, 20]),
        );
    }
    let ocr = ScriptedOcr {
        words,
        symbols: vec![word("B", 2.0, 2.0, 12.0, 14.0), word("R", 14.0, 2.0, 24.0, 14.0)],
    };
    let document = single_page(
        400,
        300,
        vec![
            text_block(BBox::new(20.0, 20.0, 360.0, 60.0), "BRAND NEWS", 32.0),
            text_block(BBox::new(20.0, 100.0, 190.0, 152.0), "Quarterly results were strong this year", 10.0),
        ],
    );
    let report = audit(ocr, kit, unmatched_library(), &document, vec![page]);

    let typography = of_kind(&report, FindingKind::Typography);
    assert_eq!(typography.len(), 1, "findings: {typography:?}");
    assert_eq!(typography[0].status, Status::Warning);
    assert!((typography[0].bbox.x0 - 20.0 / 400.0).abs() < 1e-4);
    assert!((typography[0].bbox.y1 - 60.0 / 300.0).abs() < 1e-4);

    let metric = &typography[0].metric;
    assert!(metric.starts_with("unidentified header font"), "metric: {metric}");
    let confidence: f32 = metric
        .split("confidence ")
        .nth(1)
        .and_then(|rest| rest.strip_suffix(')'))
        .and_then(|value| value.parse().ok())
        .unwrap_or_else(|| panic!("no confidence in {metric}"));
    assert!(confidence < 0.5, "confidence {confidence}");
}

#[test]
fn test_every_bbox_is_page_relative() {
    let dir = tempfile::tempdir().unwrap();
    let (kit, document, page) = logo_page(dir.path());
    let report = audit(ScriptedOcr::default(), kit, FontLibrary::default(), &document, vec![page]);
    for result in report.results().chain(report.warnings.iter()) {
        let b = result.bbox;
        assert!(0.0 <= b.x0 && b.x0 <= b.x1 && b.x1 <= 1.0, "{result:?}");
        assert!(0.0 <= b.y0 && b.y0 <= b.y1 && b.y1 <= 1.0, "{result:?}");
    }
}

#[test]
fn test_missing_logo_asset_is_a_document_warning() {
    let dir = tempfile::tempdir().unwrap();
    let kit = kit_with_logo(&dir.path().join("absent.png"));
    let page = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
    let report = audit(
        ScriptedOcr::default(),
        kit,
        FontLibrary::default(),
        &single_page(200, 100, Vec::new()),
        vec![page],
    );
    assert!(!report.warnings.is_empty());
    assert!(report
        .warnings
        .iter()
        .all(|w| w.kind == FindingKind::Logo && w.status == Status::Warning));
    assert!(of_kind(&report, FindingKind::Logo).is_empty());
}

#[test]
fn test_pages_reported_in_order_across_chunks() {
    let kit = BrandKit::from_yaml_str("id: acme\nname: Acme\ncolors:\n  - name: White\n    hex: '#FFFFFF'\n").unwrap();
    let pages: Vec<RgbImage> = (0..5).map(|_| RgbImage::from_pixel(100, 80, Rgb([255, 255, 255]))).collect();
    let document = ManifestDocument::new(
        (0..5)
            .map(|_| brand_audit::layout::ManifestPage {
                width: 100.0,
                height: 80.0,
                blocks: Vec::new(),
            })
            .collect(),
    );
    let host = host();
    let config = AuditConfig::from_yaml_str("chunk_size: 2").unwrap();
    let session = AuditSession::prepare(&host, kit, FontLibrary::default(), &config).unwrap();
    let report = BatchOrchestrator::new(Arc::clone(&host), &config)
        .audit_document(&session, &document, &InMemoryPages::new(pages))
        .unwrap();
    let numbers: Vec<usize> = report.pages.iter().map(|p| p.page_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    assert!(report.pages.iter().all(|p| p.error.is_none()));
}
