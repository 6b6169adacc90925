//! Flow meter scene
//!
//! Shows the accumulated volume as the main figure and the current flow rate
//! in a row below it.

use camoverlay_overlay::components::{Header, LabeledValue, colors};
use camoverlay_overlay::utils::{format_compact, format_quantity};
use camoverlay_overlay::{DrawingClient, Frame, OverlayError, Painter, Scene, SceneContext};
use camoverlay_types::{OverlaySettings, TextAlign, TextOverflow};
use serde::Deserialize;

use super::{PADDING, base_painter, decorate};

const PLACEHOLDER: &str = "--";

/// Volumes at or above this are shown in compact K/M form
const COMPACT_FROM_LITRES: f64 = 10_000.0;

/// One flow meter sample
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlowReading {
    /// Accumulated volume
    pub litres: f64,
    /// Current flow rate in litres per minute, when the meter reports it
    #[serde(default)]
    pub rate_lpm: Option<f64>,
}

pub struct FlowMeterScene {
    overlay: OverlaySettings,
}

impl FlowMeterScene {
    pub fn new(overlay: OverlaySettings) -> Self {
        Self { overlay }
    }

    /// Header, volume figure and rate row, scaled to the overlay box
    pub fn layout(&self) -> Painter {
        let inner_w = self.overlay.width - 2.0 * PADDING;
        let unit = self.overlay.height / 10.0;

        let header = Header::new("FLOW").with_color(self.overlay.font_color);
        let header_height = header.height(unit, PADDING / 2.0);
        let mut volume = Frame::named(
            "volume",
            PADDING,
            PADDING + header_height,
            inner_w,
            unit * 3.0,
        );
        volume.set_text(
            PLACEHOLDER,
            TextAlign::Center,
            TextOverflow::ScaleToFit,
            colors::text_muted(),
        );

        let rate = LabeledValue::new("RATE", PLACEHOLDER).build(
            "rate",
            PADDING,
            PADDING + header_height + unit * 3.5,
            inner_w,
            unit,
        );

        base_painter(
            &self.overlay,
            [
                header.build("header", PADDING, PADDING, inner_w, unit, PADDING / 2.0),
                volume,
                rate,
            ],
        )
    }

    /// Write a reading, or the placeholder, into a tree built by [`Self::layout`]
    pub fn project(
        &self,
        painter: &mut Painter,
        data: Option<&FlowReading>,
    ) -> Result<(), OverlayError> {
        let (volume, volume_color) = match data {
            Some(reading) if reading.litres >= COMPACT_FROM_LITRES => (
                format!("{} L", format_compact(reading.litres)),
                self.overlay.font_color,
            ),
            Some(reading) => (format_quantity(reading.litres, 1, "L"), self.overlay.font_color),
            None => (PLACEHOLDER.to_string(), colors::text_muted()),
        };
        painter.require_mut("volume")?.set_text(
            volume,
            TextAlign::Center,
            TextOverflow::ScaleToFit,
            volume_color,
        );

        let rate = data
            .and_then(|reading| reading.rate_lpm)
            .map_or_else(|| PLACEHOLDER.to_string(), |rate| format_quantity(rate, 1, "L/min"));
        LabeledValue::set_value(painter, "rate", rate, self.overlay.font_color)
    }
}

impl Scene for FlowMeterScene {
    type Data = FlowReading;

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
        data: Option<&FlowReading>,
        _ctx: &mut SceneContext<'_, C>,
    ) -> Result<(), OverlayError> {
        self.project(painter, data)
    }
}
