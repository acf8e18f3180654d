//! RGB helpers

/// Rec. 601 luma
#[must_use]
pub fn luminance(rgb: [f32; 3]) -> f32 {
    0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2]
}

/// HSV saturation in `[0, 1]`
#[must_use]
pub fn saturation(rgb: [f32; 3]) -> f32 {
    let max = rgb[0].max(rgb[1]).max(rgb[2]);
    let min = rgb[0].min(rgb[1]).min(rgb[2]);
    if max <= 0.0 {
        0.0
    } else {
        (max - min) / max
    }
}

#[must_use]
pub fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

#[must_use]
pub fn to_f32(rgb: [u8; 3]) -> [f32; 3] {
    rgb.map(f32::from)
}

/// Near-white and near-black pixels count as neutral paper/ink
#[must_use]
pub fn is_neutral(rgb: [u8; 3], white_min: u8, black_max: u8) -> bool {
    rgb.iter().all(|c| *c > white_min) || rgb.iter().all(|c| *c < black_max)
}

/// Per-channel percentile (`q` in `[0, 1]`) of a pixel set
#[must_use]
pub fn channel_percentile(pixels: &[[u8; 3]], q: f32) -> [f32; 3] {
    if pixels.is_empty() {
        return [0.0; 3];
    }
    let rank = ((pixels.len() - 1) as f32 * q.clamp(0.0, 1.0)).round() as usize;
    let mut out = [0.0; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        let mut channel: Vec<u8> = pixels.iter().map(|p| p[c]).collect();
        channel.sort_unstable();
        *slot = f32::from(channel[rank]);
    }
    out
}

#[must_use]
pub fn mean(pixels: &[[u8; 3]]) -> [f32; 3] {
    if pixels.is_empty() {
        return [0.0; 3];
    }
    let mut sums = [0.0f32; 3];
    for p in pixels {
        for c in 0..3 {
            sums[c] += f32::from(p[c]);
        }
    }
    sums.map(|s| s / pixels.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_and_saturation() {
        assert!((luminance([255.0, 255.0, 255.0]) - 255.0).abs() < 1e-3);
        assert_eq!(saturation([255.0, 0.0, 0.0]), 1.0);
        assert_eq!(saturation([0.0, 0.0, 0.0]), 0.0);
        assert!(saturation([200.0, 200.0, 200.0]).abs() < 1e-6);
    }

    #[test]
    fn test_neutral() {
        assert!(is_neutral([250, 245, 241], 240, 15));
        assert!(is_neutral([3, 10, 14], 240, 15));
        assert!(!is_neutral([250, 100, 250], 240, 15));
    }

    #[test]
    fn test_percentile() {
        let pixels: Vec<[u8; 3]> = (0..=100u8).map(|v| [v, 100 - v, 7]).collect();
        assert_eq!(channel_percentile(&pixels, 0.95), [95.0, 95.0, 7.0]);
        assert_eq!(channel_percentile(&pixels, 0.5), [50.0, 50.0, 7.0]);
    }
}
