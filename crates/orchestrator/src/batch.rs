//! Chunked, batched audit of a whole document
//!
//! Pages are processed `chunk_size` at a time. Within a chunk every page is
//! rasterized and laid out first, per-page checks run in parallel, and then
//! the figure crops and page texts of the whole chunk each go through their
//! model in a single call.

use crate::config::AuditConfig;
use crate::host::ModelHost;
use crate::report::{DocumentReport, PageReport};
use crate::session::AuditSession;
use brand_audit_common::{
    AuditError, AuditStage, BBox, ErrorPolicy, FindingKind, InspectionResult, LayoutRegion, PageLayout, Result,
};
use brand_audit_layout::{LayoutClassifier, PageRasterizer, SourceDocument};
use brand_audit_ocr::group_blocks;
use image::RgbImage;
use rayon::prelude::*;
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

struct FigureCrop {
    bbox: BBox,
    image: RgbImage,
}

/// Findings of one page, grouped in report order
struct PageWork {
    index: usize,
    width: u32,
    height: u32,
    logos: Vec<InspectionResult>,
    /// Figures left for the semantic cascade
    figures: Vec<FigureCrop>,
    cascade: Vec<InspectionResult>,
    background: InspectionResult,
    text_colors: Vec<InspectionResult>,
    typography: Vec<InspectionResult>,
    voice_text: String,
    voice_bbox: BBox,
    voice: Vec<InspectionResult>,
}

impl PageWork {
    fn into_report(self) -> PageReport {
        let (w, h) = (self.width as f32, self.height as f32);
        let results = self
            .logos
            .into_iter()
            .chain(self.cascade)
            .chain(std::iter::once(self.background))
            .chain(self.text_colors)
            .chain(self.typography)
            .chain(self.voice)
            .map(|r| r.normalized(w, h))
            .collect();
        PageReport {
            page_number: self.index + 1,
            width: self.width,
            height: self.height,
            results,
            error: None,
        }
    }
}

pub struct BatchOrchestrator {
    host: Arc<ModelHost>,
    layout: LayoutClassifier,
    chunk_size: usize,
}

impl BatchOrchestrator {
    pub fn new(host: Arc<ModelHost>, config: &AuditConfig) -> Self {
        let layout = LayoutClassifier::new(host.ocr_handle(), config.layout.clone());
        Self {
            host,
            layout,
            chunk_size: config.chunk_size.max(1),
        }
    }

    #[must_use]
    pub fn host(&self) -> &ModelHost {
        &self.host
    }

    /// Audit every page of `document`
    ///
    /// Rasterization and layout failures abort the audit; failures of
    /// individual checks become WARNING findings.
    pub fn audit_document(
        &self,
        session: &AuditSession,
        document: &dyn SourceDocument,
        pages: &dyn PageRasterizer,
    ) -> Result<DocumentReport> {
        let page_count = pages.page_count();
        if document.page_count() != page_count {
            return Err(AuditError::document(
                AuditStage::Layout,
                format!(
                    "document has {} pages but {} page images were supplied",
                    document.page_count(),
                    page_count
                ),
            ));
        }

        let start = Instant::now();
        info!(
            "Auditing {} pages against brand kit '{}' in chunks of {}",
            page_count, session.kit.id, self.chunk_size
        );

        let mut reports = Vec::with_capacity(page_count);
        for chunk_start in (0..page_count).step_by(self.chunk_size) {
            let chunk = chunk_start..(chunk_start + self.chunk_size).min(page_count);
            info!("Processing pages {}-{}", chunk.start + 1, chunk.end);
            reports.extend(self.audit_chunk(session, document, pages, chunk)?);
        }

        let report = DocumentReport::new(session.kit.id.clone(), reports, session.warnings.clone());
        info!(
            "Audit finished in {:.2}s: score {} ({:?})",
            start.elapsed().as_secs_f64(),
            report.summary.score,
            report.summary.status
        );
        Ok(report)
    }

    fn audit_chunk(
        &self,
        session: &AuditSession,
        document: &dyn SourceDocument,
        pages: &dyn PageRasterizer,
        chunk: Range<usize>,
    ) -> Result<Vec<PageReport>> {
        let mut loaded = Vec::with_capacity(chunk.len());
        for index in chunk {
            let raster = pages
                .rasterize(index)
                .map_err(|e| escalate(AuditStage::Rasterization, e))?;
            let layout = self
                .layout
                .classify(document, index, &raster)
                .map_err(|e| escalate(AuditStage::Layout, e))?;
            loaded.push((index, raster, layout));
        }

        let outcomes: Vec<(usize, (u32, u32), Result<PageWork>)> = loaded
            .par_iter()
            .map(|(index, raster, layout)| {
                (*index, raster.dimensions(), self.audit_page(session, *index, raster, layout))
            })
            .collect();

        let mut work = Vec::with_capacity(outcomes.len());
        let mut abandoned = Vec::new();
        for (index, (width, height), outcome) in outcomes {
            match outcome {
                Ok(page) => work.push(page),
                Err(e) if e.policy() == ErrorPolicy::AbortPage => {
                    warn!("Page {} abandoned: {e}", index + 1);
                    abandoned.push(PageReport {
                        page_number: index + 1,
                        width,
                        height,
                        results: Vec::new(),
                        error: Some(e.to_string()),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        self.run_cascade(session, &mut work)?;
        self.run_voice(session, &mut work)?;

        let mut reports: Vec<PageReport> = work.into_iter().map(PageWork::into_report).chain(abandoned).collect();
        reports.sort_by_key(|r| r.page_number);
        Ok(reports)
    }

    /// Checks that need only this page
    fn audit_page(&self, session: &AuditSession, index: usize, raster: &RgbImage, layout: &PageLayout) -> Result<PageWork> {
        let (width, height) = raster.dimensions();
        let page_box = BBox::new(0.0, 0.0, width as f32, height as f32);

        let mut logos = Vec::new();
        let mut candidates = Vec::new();
        if !session.matcher.variants().is_empty() {
            let gray = image::imageops::grayscale(raster);
            match self.host.keypoints().extract(&gray) {
                Ok(keypoints) => {
                    for found in session.matcher.match_page(raster, &keypoints) {
                        candidates.push(found.candidate.bbox);
                        logos.push(found.to_result());
                    }
                }
                Err(e) => logos.extend(demote(FindingKind::Logo, page_box, AuditStage::LogoMatching, e)?),
            }
        }

        let figures = if session.cascade.is_some() {
            layout
                .figures()
                .filter(|region| !candidates.iter().any(|c| c.intersects(&region.bbox)))
                .filter_map(|region| crop_region(raster, region))
                .collect()
        } else {
            Vec::new()
        };

        let mut typography = Vec::new();
        let words = match self.host.ocr().recognize_words(raster) {
            Ok(words) => words,
            Err(e) => {
                typography.extend(demote(FindingKind::Typography, page_box, AuditStage::Typography, e)?);
                Vec::new()
            }
        };

        let mut content = layout.content_boxes();
        content.extend(candidates.iter().copied());
        let background = session.palette.audit_background(raster, &content);

        let blocks: Vec<BBox> = group_blocks(&words).iter().map(|b| b.bbox).collect();
        let text_colors = if blocks.is_empty() {
            Vec::new()
        } else {
            session.palette.audit_text_colors(raster, &blocks)
        };

        let audited = session.typography.audit_page(
            raster,
            &words,
            &session.kit,
            self.host.ocr(),
            self.host.glyph_encoder(),
        );
        for outcome in audited {
            match outcome {
                Ok(result) => typography.push(result),
                Err(e) => typography.extend(demote(FindingKind::Typography, page_box, AuditStage::Typography, e)?),
            }
        }

        let voice_text = layout.body_text();
        let voice_bbox = layout
            .regions
            .iter()
            .filter(|r| r.region_type.is_body_text())
            .map(|r| r.bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap_or(page_box);
        let voice = session.voice.keyword_finding(&voice_text, voice_bbox).into_iter().collect();

        debug!(
            "Page {}: {} logo findings, {} figures for cascade, {} words",
            index + 1,
            logos.len(),
            figures.len(),
            words.len()
        );

        Ok(PageWork {
            index,
            width,
            height,
            logos,
            figures,
            cascade: Vec::new(),
            background,
            text_colors,
            typography,
            voice_text,
            voice_bbox,
            voice,
        })
    }

    /// Encode every leftover figure of the chunk in one call
    fn run_cascade(&self, session: &AuditSession, work: &mut [PageWork]) -> Result<()> {
        let Some(cascade) = &session.cascade else {
            return Ok(());
        };
        let mut owners = Vec::new();
        let mut crops = Vec::new();
        for (page, item) in work.iter_mut().enumerate() {
            for figure in item.figures.drain(..) {
                owners.push((page, figure.bbox));
                crops.push(figure.image);
            }
        }
        if crops.is_empty() {
            return Ok(());
        }

        debug!("Encoding {} figure regions", crops.len());
        let encoded = self.host.vision().encode_images(&crops).and_then(|embeddings| {
            if embeddings.len() == crops.len() {
                Ok(embeddings)
            } else {
                Err(AuditError::Inference(format!(
                    "image encoder returned {} embeddings for {} regions",
                    embeddings.len(),
                    crops.len()
                )))
            }
        });

        match encoded {
            Ok(embeddings) => {
                for ((page, bbox), embedding) in owners.into_iter().zip(embeddings) {
                    let verdict = cascade.evaluate(&embedding);
                    debug!("Figure {:?} on page {}: {:?}", bbox, work[page].index + 1, verdict);
                    work[page].cascade.push(verdict.to_result(bbox));
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Semantic cascade failed for {} regions: {e}", owners.len());
                for (page, bbox) in owners {
                    work[page]
                        .cascade
                        .push(region_warning(FindingKind::Imagery, bbox, AuditStage::SemanticCascade, &e));
                }
            }
        }
        Ok(())
    }

    /// Score the text of every page in the chunk in one classifier call
    fn run_voice(&self, session: &AuditSession, work: &mut [PageWork]) -> Result<()> {
        let attributes = session.voice.attributes();
        if attributes.is_empty() {
            return Ok(());
        }
        let targets: Vec<usize> = (0..work.len())
            .filter(|&i| !work[i].voice_text.trim().is_empty())
            .collect();
        if targets.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = targets
            .iter()
            .map(|&i| session.voice.classifier_input(&work[i].voice_text))
            .collect();

        match self.host.text_classifier().classify(&texts, attributes) {
            Ok(rows) => {
                for (&i, scores) in targets.iter().zip(rows) {
                    if let Some(result) = session.voice.attribute_finding(&scores, work[i].voice_bbox) {
                        work[i].voice.push(result);
                    }
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Brand-voice classification failed: {e}");
                for &i in &targets {
                    let bbox = work[i].voice_bbox;
                    work[i]
                        .voice
                        .push(region_warning(FindingKind::BrandVoice, bbox, AuditStage::BrandVoice, &e));
                }
            }
        }
        Ok(())
    }
}

/// Rasterization and layout failures always end the audit
fn escalate(stage: AuditStage, error: AuditError) -> AuditError {
    if error.is_fatal() {
        error
    } else {
        AuditError::document(stage, error)
    }
}

fn region_warning(kind: FindingKind, bbox: BBox, stage: AuditStage, error: &AuditError) -> InspectionResult {
    InspectionResult::warning(kind, bbox, format!("{stage} check failed: {error}"))
}

/// Apply the error policy to a failed region check
fn demote(kind: FindingKind, bbox: BBox, stage: AuditStage, error: AuditError) -> Result<Option<InspectionResult>> {
    match error.policy() {
        ErrorPolicy::Skip => Ok(None),
        ErrorPolicy::DemoteToWarning => {
            warn!("{stage} check demoted to warning: {error}");
            Ok(Some(region_warning(kind, bbox, stage, &error)))
        }
        ErrorPolicy::AbortPage | ErrorPolicy::AbortDocument => Err(error),
    }
}

fn crop_region(raster: &RgbImage, region: &LayoutRegion) -> Option<FigureCrop> {
    let (x, y, w, h) = region.bbox.pixel_rect(raster.width(), raster.height())?;
    let image = match region.content.image() {
        Some(image) if image.width() > 0 && image.height() > 0 => image.clone(),
        _ => image::imageops::crop_imm(raster, x, y, w, h).to_image(),
    };
    Some(FigureCrop {
        bbox: region.bbox,
        image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fake_host, AxisEncoder, FlatClassifier};
    use brand_audit_common::{BrandKit, Status};
    use brand_audit_layout::{InMemoryPages, ManifestDocument, ManifestPage, NativeBlock, TextSpan};
    use brand_audit_typography::FontLibrary;
    use image::Rgb;
    use std::sync::atomic::Ordering;

    fn kit() -> BrandKit {
        BrandKit::from_yaml_str(
            "id: acme\nname: Acme\ncolors:\n  - name: White\n    hex: '#FFFFFF'\n\
             brand_voice:\n  attributes: [confident]\n  forbidden_keywords: [cheap]\n",
        )
        .unwrap()
    }

    fn manifest(pages: usize, text: &str) -> ManifestDocument {
        let page = ManifestPage {
            width: 200.0,
            height: 100.0,
            blocks: vec![
                NativeBlock::Image {
                    bbox: BBox::new(100.0, 50.0, 180.0, 90.0),
                },
                NativeBlock::Text {
                    bbox: BBox::new(10.0, 40.0, 90.0, 60.0),
                    spans: vec![TextSpan {
                        text: text.to_string(),
                        size: 10.0,
                        font: "Acme Sans".to_string(),
                    }],
                },
            ],
        };
        ManifestDocument::new(vec![page; pages])
    }

    fn rasters(pages: usize) -> InMemoryPages {
        let mut page = RgbImage::from_pixel(400, 200, Rgb([255, 255, 255]));
        for y in 100..180 {
            for x in 200..360 {
                page.put_pixel(x, y, Rgb([(x % 256) as u8, 90, (y % 256) as u8]));
            }
        }
        InMemoryPages::new(vec![page; pages])
    }

    fn setup(chunk_size: usize) -> (BatchOrchestrator, AuditSession, Arc<AxisEncoder>, Arc<FlatClassifier>) {
        let vision = Arc::new(AxisEncoder::default());
        let classifier = Arc::new(FlatClassifier::new(0.9));
        let host = Arc::new(fake_host(Arc::clone(&vision), Arc::clone(&classifier)));
        let config = AuditConfig {
            chunk_size,
            ..Default::default()
        };
        let session = AuditSession::prepare(&host, kit(), FontLibrary::default(), &config).unwrap();
        (BatchOrchestrator::new(host, &config), session, vision, classifier)
    }

    #[test]
    fn test_models_called_once_per_chunk() {
        let (orchestrator, session, vision, classifier) = setup(2);
        let report = orchestrator
            .audit_document(&session, &manifest(3, "Quality you can trust"), &rasters(3))
            .unwrap();

        assert_eq!(vision.image_calls.load(Ordering::SeqCst), 2);
        assert_eq!(vision.images_seen.load(Ordering::SeqCst), 3);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);

        let numbers: Vec<usize> = report.pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        for page in &report.pages {
            let kinds: Vec<FindingKind> = page.results.iter().map(|r| r.kind).collect();
            assert_eq!(
                kinds,
                vec![FindingKind::Imagery, FindingKind::BackgroundColor, FindingKind::BrandVoice]
            );
            assert_eq!(page.results[0].status, Status::Pass);
            for result in &page.results {
                let b = result.bbox;
                assert!(b.x0 >= 0.0 && b.y0 >= 0.0 && b.x1 <= 1.0 && b.y1 <= 1.0, "{b:?}");
            }
        }
        // No logo assets in the kit
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].kind, FindingKind::Logo);
    }

    #[test]
    fn test_forbidden_keyword_fails_page() {
        let (orchestrator, session, _, _) = setup(10);
        let report = orchestrator
            .audit_document(&session, &manifest(1, "A cheap imitation"), &rasters(1))
            .unwrap();
        let voice: Vec<&InspectionResult> = report.pages[0]
            .results
            .iter()
            .filter(|r| r.kind == FindingKind::BrandVoice)
            .collect();
        assert_eq!(voice.len(), 2);
        assert_eq!(voice[0].status, Status::Fail);
        assert_eq!(voice[1].status, Status::Pass);
    }

    #[test]
    fn test_missing_raster_is_fatal() {
        let (orchestrator, session, _, _) = setup(10);
        struct Broken;
        impl PageRasterizer for Broken {
            fn page_count(&self) -> usize {
                2
            }
            fn rasterize(&self, index: usize) -> Result<RgbImage> {
                Err(AuditError::document(AuditStage::Rasterization, format!("page {index} unreadable")))
            }
        }
        let err = orchestrator
            .audit_document(&session, &manifest(2, "text"), &Broken)
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("rasterization"));
    }

    #[test]
    fn test_page_count_mismatch() {
        let (orchestrator, session, _, _) = setup(10);
        let err = orchestrator
            .audit_document(&session, &manifest(2, "text"), &rasters(3))
            .unwrap_err();
        assert!(matches!(err, AuditError::DocumentAccess { .. }));
    }
}
