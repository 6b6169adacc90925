//! Weighing scale scene
//!
//! Shows the current weight with its unit and whether the scale has settled.
//! Without a reading the scale is assumed to be outside its measuring range.

use camoverlay_overlay::components::{Header, LabeledValue, colors};
use camoverlay_overlay::utils::format_quantity;
use camoverlay_overlay::{DrawingClient, Frame, OverlayError, Painter, Scene, SceneContext};
use camoverlay_types::{OverlaySettings, TextAlign, TextOverflow};
use serde::Deserialize;

use super::{PADDING, base_painter, decorate};

const OUT_OF_RANGE: &str = "OUT OF RANGE";

fn default_unit() -> String {
    "kg".to_string()
}

fn default_decimals() -> usize {
    2
}

fn default_stable() -> bool {
    true
}

/// One scale sample
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScaleReading {
    pub value: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default = "default_decimals")]
    pub decimals: usize,
    /// False while the load is still moving
    #[serde(default = "default_stable")]
    pub stable: bool,
}

pub struct ScaleScene {
    overlay: OverlaySettings,
}

impl ScaleScene {
    pub fn new(overlay: OverlaySettings) -> Self {
        Self { overlay }
    }

    pub fn layout(&self) -> Painter {
        let inner_w = self.overlay.width - 2.0 * PADDING;
        let unit = self.overlay.height / 10.0;

        let header = Header::new("WEIGHT").with_color(self.overlay.font_color);
        let header_height = header.height(unit, PADDING / 2.0);

        let mut weight = Frame::named(
            "weight",
            PADDING,
            PADDING + header_height,
            inner_w,
            unit * 3.0,
        );
        weight.set_padding(0.0, PADDING / 2.0, 0.0, PADDING / 2.0);
        show_out_of_range(&mut weight);

        let mut status = LabeledValue::new("STATUS", "").build(
            "status",
            PADDING,
            PADDING + header_height + unit * 3.5,
            inner_w,
            unit,
        );
        status.set_visible(false);

        base_painter(
            &self.overlay,
            [
                header.build("header", PADDING, PADDING, inner_w, unit, PADDING / 2.0),
                weight,
                status,
            ],
        )
    }

    pub fn project(
        &self,
        painter: &mut Painter,
        data: Option<&ScaleReading>,
    ) -> Result<(), OverlayError> {
        let Some(reading) = data else {
            show_out_of_range(painter.require_mut("weight")?);
            painter.require_mut("status")?.set_visible(false);
            return Ok(());
        };

        painter.require_mut("weight")?.set_text(
            format_quantity(reading.value, reading.decimals, &reading.unit),
            TextAlign::Right,
            TextOverflow::ScaleToFit,
            self.overlay.font_color,
        );

        painter.require_mut("status")?.set_visible(true);
        let (status, color) = if reading.stable {
            ("STABLE", colors::status_good())
        } else {
            ("SETTLING", colors::status_warn())
        };
        LabeledValue::set_value(painter, "status", status, color)
    }
}

fn show_out_of_range(weight: &mut Frame) {
    weight.set_text(
        OUT_OF_RANGE,
        TextAlign::Center,
        TextOverflow::ScaleToFit,
        colors::status_alert(),
    );
}

impl Scene for ScaleScene {
    type Data = ScaleReading;

    async fn build<C: DrawingClient>(
        &mut self,
        ctx: &mut SceneContext<'_, C>,
    ) -> Result<Painter, OverlayError> {
        let mut painter = self.layout();
        decorate(&mut painter, ctx).await?;
        Ok(painter)
    }

    async fn apply<C: DrawingClient>(
        &mut self,
        painter: &mut Painter,
        data: Option<&ScaleReading>,
        _ctx: &mut SceneContext<'_, C>,
    ) -> Result<(), OverlayError> {
        self.project(painter, data)
    }
}
