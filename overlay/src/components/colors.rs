use camoverlay_types::Color;

#[inline]
pub fn transparent() -> Color {
    [0, 0, 0, 0]
}

#[inline]
pub fn white() -> Color {
    [255, 255, 255, 255]
}

/// Dimmed label color for secondary text
#[inline]
pub fn label_dim() -> Color {
    [180, 180, 180, 255]
}

/// Muted/inactive text, used for placeholders
#[inline]
pub fn text_muted() -> Color {
    [150, 150, 150, 200]
}

/// Separator line under headers
#[inline]
pub fn separator() -> Color {
    [128, 128, 128, 200]
}

// ─────────────────────────────────────────────────────────────────────────
// Status Colors
// ─────────────────────────────────────────────────────────────────────────

/// Reading within the normal range
#[inline]
pub fn status_good() -> Color {
    [50, 180, 50, 255]
}

/// Reading that deserves attention
#[inline]
pub fn status_warn() -> Color {
    [220, 180, 50, 255]
}

/// Reading outside the safe range
#[inline]
pub fn status_alert() -> Color {
    [220, 60, 60, 255]
}
