//! Air quality sensor scene
//!
//! The AQI figure sits on a panel colored by its band, with particulate and
//! climate readings listed underneath.

use camoverlay_overlay::components::{Header, LabeledValue, colors};
use camoverlay_overlay::utils::format_quantity;
use camoverlay_overlay::{DrawingClient, Frame, OverlayError, Painter, Scene, SceneContext};
use camoverlay_types::{Color, OverlaySettings, TextAlign, TextOverflow, overlay_colors};
use serde::Deserialize;

use super::{PADDING, base_painter, decorate};

const NO_DATA: &str = "NO DATA";
const PLACEHOLDER: &str = "--";

/// One air quality sample
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AirQualityReading {
    pub aqi: u32,
    /// Fine particulate matter, µg/m³
    pub pm25: f64,
    /// Coarse particulate matter, µg/m³
    pub pm10: f64,
    #[serde(default)]
    pub co2_ppm: Option<f64>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub humidity_pct: Option<f64>,
}

/// Panel color for an AQI value
pub fn aqi_band(aqi: u32) -> Color {
    match aqi {
        0..=50 => overlay_colors::GOOD,
        51..=100 => overlay_colors::MODERATE,
        101..=150 => overlay_colors::POOR,
        _ => overlay_colors::BAD,
    }
}

/// Rows under the AQI panel as (key, label)
const ROWS: &[(&str, &str)] = &[
    ("pm25", "PM2.5"),
    ("pm10", "PM10"),
    ("co2", "CO2"),
    ("temp", "TEMP"),
    ("humidity", "HUMIDITY"),
];

pub struct AirQualityScene {
    overlay: OverlaySettings,
}

impl AirQualityScene {
    pub fn new(overlay: OverlaySettings) -> Self {
        Self { overlay }
    }

    pub fn layout(&self) -> Painter {
        let inner_w = self.overlay.width - 2.0 * PADDING;
        let unit = self.overlay.height / 10.0;

        let header = Header::new("AIR QUALITY").with_color(self.overlay.font_color);
        let header_height = header.height(unit, PADDING / 2.0);

        let mut aqi = Frame::named("aqi", PADDING, PADDING + header_height, inner_w, unit * 2.0);
        aqi.set_padding(0.0, PADDING / 2.0, 0.0, PADDING / 2.0);
        show_no_data(&mut aqi);

        let rows_top = PADDING + header_height + unit * 2.5;
        let rows = ROWS.iter().enumerate().map(|(i, (key, label))| {
            LabeledValue::new(*label, PLACEHOLDER).build(
                key,
                PADDING,
                rows_top + i as f32 * unit,
                inner_w,
                unit * 0.8,
            )
        });

        let header = header.build("header", PADDING, PADDING, inner_w, unit, PADDING / 2.0);
        base_painter(&self.overlay, [header, aqi].into_iter().chain(rows))
    }

    pub fn project(
        &self,
        painter: &mut Painter,
        data: Option<&AirQualityReading>,
    ) -> Result<(), OverlayError> {
        let Some(reading) = data else {
            show_no_data(painter.require_mut("aqi")?);
            for (key, _) in ROWS {
                LabeledValue::set_value(painter, key, PLACEHOLDER, colors::text_muted())?;
            }
            return Ok(());
        };

        let aqi = painter.require_mut("aqi")?;
        aqi.set_background(aqi_band(reading.aqi));
        aqi.set_text(
            format!("AQI {}", reading.aqi),
            TextAlign::Center,
            TextOverflow::ScaleToFit,
            overlay_colors::WHITE,
        );

        let optional = |value: Option<f64>, decimals: usize, unit: &str| {
            value.map_or_else(
                || PLACEHOLDER.to_string(),
                |v| format_quantity(v, decimals, unit),
            )
        };
        let values = [
            format_quantity(reading.pm25, 1, "µg/m³"),
            format_quantity(reading.pm10, 1, "µg/m³"),
            optional(reading.co2_ppm, 0, "ppm"),
            optional(reading.temperature_c, 1, "°C"),
            optional(reading.humidity_pct, 0, "%"),
        ];
        for ((key, _), value) in ROWS.iter().zip(values) {
            LabeledValue::set_value(painter, key, value, self.overlay.font_color)?;
        }
        Ok(())
    }
}

fn show_no_data(aqi: &mut Frame) {
    aqi.set_background(overlay_colors::PANEL);
    aqi.set_text(
        NO_DATA,
        TextAlign::Center,
        TextOverflow::ScaleToFit,
        colors::text_muted(),
    );
}

impl Scene for AirQualityScene {
    type Data = AirQualityReading;

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
        data: Option<&AirQualityReading>,
        _ctx: &mut SceneContext<'_, C>,
    ) -> Result<(), OverlayError> {
        self.project(painter, data)
    }
}
