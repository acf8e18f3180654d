//! Logo detection for brand audits
//!
//! Two-stage cascade:
//! 1. [`LogoMatcher`]: keypoint matching of reference logo variants with
//!    homography-based localization and geometry/color compliance.
//! 2. [`SemanticCascade`]: vision-language embedding checks for figures the
//!    keypoint stage did not explain (distorted logo, partner logo, imagery fit).

pub mod cascade;
pub mod homography;
pub mod keypoints;
pub mod matcher;
pub mod variant;

pub use cascade::{CascadeConfig, CascadeVerdict, SemanticCascade};
pub use homography::{find_homography, Homography, RansacFit, RansacParams};
pub use keypoints::{extract_pyramid, FastGradientExtractor, KeypointConfig, DESCRIPTOR_LEN};
pub use matcher::{aspect_deviation, LogoCandidate, LogoMatch, LogoMatcher, LogoMatcherConfig};
pub use variant::{color_distance, flatten_alpha, mean_color, LogoVariant};
