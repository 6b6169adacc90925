//! Application scenes
//!
//! Each scene lays out a frame tree for one kind of sensor and projects its
//! readings into that tree. Layout and projection are plain functions over a
//! [`Painter`]; the [`Scene`](camoverlay_overlay::Scene) impls add the
//! connection-scoped resources (background image, font) on top.
//!
//! Optional resources are picked up by moniker:
//! - `background`: image drawn behind the whole overlay
//! - `font`: font face for every text node

mod air_quality;
mod flow_meter;
mod scale;

pub use air_quality::{AirQualityReading, AirQualityScene, aqi_band};
pub use flow_meter::{FlowMeterScene, FlowReading};
pub use scale::{ScaleReading, ScaleScene};

use camoverlay_overlay::{DrawingClient, Frame, OverlayError, Painter, SceneContext};
use camoverlay_types::{FitMode, OverlaySettings};

pub const BACKGROUND_MONIKER: &str = "background";
pub const FONT_MONIKER: &str = "font";

/// Inner margin between the overlay edge and its content
const PADDING: f32 = 20.0;

/// Full-size frame holding a scene's content and background
const PANEL_KEY: &str = "panel";

/// Root painter with the configured geometry, holding `content` on a panel
/// in the configured color.
///
/// The painter's own position also shifts its subtree inside the surface,
/// so the panel sits at the negated position and covers the surface exactly.
fn base_painter(overlay: &OverlaySettings, content: impl IntoIterator<Item = Frame>) -> Painter {
    let mut panel = Frame::named(
        PANEL_KEY,
        -overlay.pos_x,
        -overlay.pos_y,
        overlay.width,
        overlay.height,
    );
    panel.set_background(overlay.background_color);
    panel.insert(content);

    let mut painter = Painter::from_settings(overlay);
    painter.push(panel);
    painter
}

/// Apply the optional background image and font to a laid-out tree
async fn decorate<C: DrawingClient>(
    painter: &mut Painter,
    ctx: &mut SceneContext<'_, C>,
) -> Result<(), OverlayError> {
    if ctx.resources.is_registered(BACKGROUND_MONIKER) {
        let image = ctx.image(BACKGROUND_MONIKER).await?;
        painter
            .require_mut(PANEL_KEY)?
            .set_background_image(image, FitMode::Fit);
    }
    if ctx.resources.is_registered(FONT_MONIKER) {
        let font = ctx.font(FONT_MONIKER).await?;
        painter.set_font_all(font);
    }
    Ok(())
}
