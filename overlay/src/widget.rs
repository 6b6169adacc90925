//! Connection-aware overlay orchestrator
//!
//! A `Widget` owns one drawing client, one frame tree and one resource cache.
//! It follows the client's connection lifecycle and re-renders the tree when
//! new data arrives:
//!
//! ```text
//!   Disconnected ──connect()──► Connecting ──Open──► Connected
//!        ▲                          │                    │
//!        └──── retry after delay ◄──┴── failure/Close ◄──┘
//! ```
//!
//! Rendering is best-effort. Updates while not connected are dropped without
//! touching the client, and render errors are logged, never returned, so a
//! polling loop feeding the widget cannot be brought down by the overlay.
//!
//! The application side plugs in through the [`Scene`] trait: it builds the
//! tree once per connection (uploading images and fonts on demand) and
//! projects each reading into it.

use std::time::Duration;

use camoverlay_types::AppSettings;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use crate::client::{ConnectionEvent, DrawingClient, EventReceiver, FontHandle, ImageDescriptor};
use crate::error::OverlayError;
use crate::painter::Painter;
use crate::resources::ResourceCache;

// ─────────────────────────────────────────────────────────────────────────────
// Scene
// ─────────────────────────────────────────────────────────────────────────────

/// Access to the connection-scoped resources while building or updating a tree
pub struct SceneContext<'a, C> {
    pub client: &'a mut C,
    pub resources: &'a mut ResourceCache,
}

impl<C: DrawingClient> SceneContext<'_, C> {
    pub async fn image(&mut self, moniker: &str) -> Result<ImageDescriptor, OverlayError> {
        self.resources.image(&mut *self.client, moniker).await
    }

    pub async fn font(&mut self, moniker: &str) -> Result<FontHandle, OverlayError> {
        self.resources.font(&mut *self.client, moniker).await
    }
}

/// Application-specific layout driven by a [`Widget`]
#[allow(async_fn_in_trait)]
pub trait Scene {
    /// Domain reading projected into the tree
    type Data;

    /// Build the frame tree. Called after every (re)connection, before the
    /// first render on that connection.
    async fn build<C: DrawingClient>(
        &mut self,
        ctx: &mut SceneContext<'_, C>,
    ) -> Result<Painter, OverlayError>;

    /// Project `data` into the tree. `None` means no reading is available and
    /// a placeholder should be shown.
    async fn apply<C: DrawingClient>(
        &mut self,
        painter: &mut Painter,
        data: Option<&Self::Data>,
        ctx: &mut SceneContext<'_, C>,
    ) -> Result<(), OverlayError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Widget
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetOptions {
    /// Render scale applied to the whole tree
    pub scale: f64,
    /// Fixed delay before a reconnect attempt
    pub reconnect_delay: Duration,
    /// Remove the overlay left from a previous connection before drawing
    pub clear_on_reconnect: bool,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            reconnect_delay: Duration::from_secs(5),
            clear_on_reconnect: true,
        }
    }
}

impl WidgetOptions {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            scale: settings.overlay.scale as f64,
            reconnect_delay: Duration::from_millis(settings.reconnect_delay_ms),
            clear_on_reconnect: settings.clear_on_reconnect,
        }
    }
}

pub struct Widget<C, S: Scene> {
    client: C,
    events: EventReceiver,
    scene: S,
    resources: ResourceCache,
    options: WidgetOptions,
    state: ConnectionState,
    painter: Option<Painter>,
    latest: Option<S::Data>,
    reconnect_at: Option<Instant>,
    opened_before: bool,
}

impl<C: DrawingClient, S: Scene> Widget<C, S> {
    pub fn new(
        client: C,
        events: EventReceiver,
        scene: S,
        resources: ResourceCache,
        options: WidgetOptions,
    ) -> Self {
        Self {
            client,
            events,
            scene,
            resources,
            options,
            state: ConnectionState::Disconnected,
            painter: None,
            latest: None,
            reconnect_at: None,
            opened_before: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn painter(&self) -> Option<&Painter> {
        self.painter.as_ref()
    }

    pub fn resources(&self) -> &ResourceCache {
        &self.resources
    }

    /// When the next reconnect attempt is due, if one is scheduled
    pub fn reconnect_at(&self) -> Option<Instant> {
        self.reconnect_at
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connection lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a connection attempt.
    ///
    /// A failed attempt schedules a retry. An accepted attempt must be
    /// answered by `Open` or `Close` within the reconnect delay, otherwise
    /// the same deadline triggers another attempt.
    pub async fn connect(&mut self) {
        if self.state == ConnectionState::Connecting {
            tracing::warn!("No answer to previous connection attempt");
        }
        self.state = ConnectionState::Connecting;
        self.reconnect_at = None;
        tracing::info!("Connecting to drawing service");

        match self.client.connect().await {
            Ok(()) => self.schedule_reconnect(),
            Err(err) => {
                tracing::warn!(error = %err, "Connection attempt failed");
                self.state = ConnectionState::Disconnected;
                self.schedule_reconnect();
            }
        }
    }

    /// Apply one lifecycle event from the client
    pub async fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Open => {
                tracing::info!("Drawing connection open");
                self.state = ConnectionState::Connected;
                self.reconnect_at = None;
                self.resources.invalidate();
                self.painter = None;

                if self.opened_before
                    && self.options.clear_on_reconnect
                    && let Err(err) = self.client.remove_overlay().await
                {
                    tracing::warn!(error = %err, "Failed to clear stale overlay");
                }
                self.opened_before = true;

                self.render().await;
            }
            ConnectionEvent::Error(message) => {
                tracing::warn!(error = %message, "Drawing connection error");
            }
            ConnectionEvent::Close => {
                if self.state == ConnectionState::Disconnected && self.reconnect_at.is_some() {
                    return;
                }
                tracing::warn!(
                    delay_ms = self.options.reconnect_delay.as_millis() as u64,
                    "Drawing connection closed"
                );
                self.state = ConnectionState::Disconnected;
                self.resources.invalidate();
                self.painter = None;
                self.schedule_reconnect();
            }
        }
    }

    /// Apply every lifecycle event the client has already queued, without
    /// waiting for more
    pub async fn poll_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event).await;
        }
    }

    fn schedule_reconnect(&mut self) {
        self.reconnect_at = Some(Instant::now() + self.options.reconnect_delay);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a new reading and render it. A no-op on the client while not
    /// connected; the reading is kept and shown after the next open.
    pub async fn update(&mut self, data: Option<S::Data>) {
        self.latest = data;
        self.render().await;
    }

    async fn render(&mut self) {
        if self.state != ConnectionState::Connected {
            tracing::trace!(state = ?self.state, "Skipping render while not connected");
            return;
        }

        if let Err(err) = self.try_render().await {
            if err.is_transport() {
                tracing::warn!(error = %err, "Render aborted by transport error");
            } else {
                tracing::error!(error = %err, "Render failed");
            }
        }
    }

    async fn try_render(&mut self) -> Result<(), OverlayError> {
        let Self {
            client,
            resources,
            scene,
            painter,
            latest,
            options,
            ..
        } = self;

        let mut ctx = SceneContext {
            client: &mut *client,
            resources: &mut *resources,
        };
        if painter.is_none() {
            let built = scene.build(&mut ctx).await?;
            tracing::debug!(
                width = built.width(),
                height = built.height(),
                "Built overlay tree"
            );
            *painter = Some(built);
        }
        let Some(painter) = painter.as_mut() else {
            return Ok(());
        };

        scene.apply(painter, latest.as_ref(), &mut ctx).await?;
        painter.render(client, options.scale).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Driver loop
    // ─────────────────────────────────────────────────────────────────────────

    /// Connect and drive the widget until `readings` closes.
    ///
    /// Lifecycle events take priority over readings. Readings queued while a
    /// render was running are coalesced, only the newest one is drawn.
    pub async fn run(&mut self, mut readings: mpsc::Receiver<Option<S::Data>>) {
        self.connect().await;

        loop {
            let reconnect_due = self.reconnect_at;
            tokio::select! {
                biased;

                Some(event) = self.events.recv() => {
                    self.handle_event(event).await;
                }
                reading = readings.recv() => {
                    let Some(mut reading) = reading else {
                        break;
                    };
                    while let Ok(newer) = readings.try_recv() {
                        reading = newer;
                    }
                    self.update(reading).await;
                }
                _ = sleep_until(reconnect_due.unwrap_or_else(Instant::now)), if reconnect_due.is_some() => {
                    self.connect().await;
                }
            }
        }

        self.shutdown().await;
    }

    /// Remove the overlay and close the connection
    pub async fn shutdown(&mut self) {
        if self.state == ConnectionState::Connected
            && let Err(err) = self.client.remove_overlay().await
        {
            tracing::warn!(error = %err, "Failed to remove overlay on shutdown");
        }
        self.client.disconnect().await;
        self.state = ConnectionState::Disconnected;
        self.reconnect_at = None;
        self.painter = None;
        self.resources.invalidate();
        tracing::info!("Overlay widget stopped");
    }
}

#[cfg(test)]
#[path = "widget_tests.rs"]
mod tests;
