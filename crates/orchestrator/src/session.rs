//! Per-audit state built from a brand kit

use crate::config::AuditConfig;
use crate::host::ModelHost;
use crate::voice::BrandVoiceChecker;
use brand_audit_common::{AuditError, BBox, BrandKit, ErrorPolicy, FindingKind, InspectionResult, Result};
use brand_audit_logo_detection::{LogoMatcher, LogoVariant, SemanticCascade};
use brand_audit_palette::PaletteAuditor;
use brand_audit_typography::{FontLibrary, TypographyAuditor};
use tracing::{info, warn};

/// Page-relative box covering a whole page, used for document-wide findings
fn whole_page() -> BBox {
    BBox::new(0.0, 0.0, 1.0, 1.0)
}

/// Reference data and auditors for one audit, read-only once prepared
pub struct AuditSession {
    pub kit: BrandKit,
    pub matcher: LogoMatcher,
    /// Absent when the reference embeddings could not be computed
    pub cascade: Option<SemanticCascade>,
    pub palette: PaletteAuditor,
    pub typography: TypographyAuditor,
    pub voice: BrandVoiceChecker,
    /// Missing-reference findings that apply to the whole document
    pub warnings: Vec<InspectionResult>,
}

impl AuditSession {
    pub fn prepare(host: &ModelHost, kit: BrandKit, fonts: FontLibrary, config: &AuditConfig) -> Result<Self> {
        kit.validate()?;
        let mut warnings = Vec::new();

        let mut variants = Vec::with_capacity(kit.logo.assets.len());
        for asset in &kit.logo.assets {
            match LogoVariant::load(asset, host.keypoints(), &config.logo.reference_scales) {
                Ok(variant) => variants.push(variant),
                Err(e) => warnings.push(soft_failure(FindingKind::Logo, e)?),
            }
        }
        if variants.is_empty() {
            warnings.push(InspectionResult::warning(
                FindingKind::Logo,
                whole_page(),
                "no logo references available, keypoint matching skipped",
            ));
        }

        let cascade = match SemanticCascade::prepare(host.vision(), &variants, &kit, config.cascade.clone()) {
            Ok(cascade) => Some(cascade),
            Err(e) => {
                warnings.push(soft_failure(FindingKind::Imagery, e)?);
                None
            }
        };

        info!(
            "Audit session for '{}': {} logo variants, {} reference fonts, {} brand colors",
            kit.name,
            variants.len(),
            fonts.fonts.len(),
            kit.colors.len()
        );

        Ok(Self {
            matcher: LogoMatcher::new(variants, config.logo.clone())
                .with_allowed_ratios(kit.logo.allowed_ratios.clone()),
            cascade,
            palette: PaletteAuditor::new(&kit, config.palette.clone()),
            typography: TypographyAuditor::new(fonts, config.typography.clone()),
            voice: BrandVoiceChecker::new(&kit.brand_voice, config.brand_voice.clone()),
            warnings,
            kit,
        })
    }
}

/// Document-wide WARNING for a recoverable setup failure, the error itself otherwise
fn soft_failure(kind: FindingKind, error: AuditError) -> Result<InspectionResult> {
    match error.policy() {
        ErrorPolicy::DemoteToWarning | ErrorPolicy::Skip => {
            warn!("{error}");
            Ok(InspectionResult::warning(kind, whole_page(), error.to_string()))
        }
        ErrorPolicy::AbortPage | ErrorPolicy::AbortDocument => Err(error),
    }
}
