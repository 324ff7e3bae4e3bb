//! On-screen text for stabilized counts and the composed multi-stream layout

use crate::config::{resolve_title, LayoutConfig, StreamConfig};
use crate::stats::{Snapshot, StatsRegistry};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Offset of the text box from the top-left corner of its tile
pub const TEXT_MARGIN: u32 = 20;

/// RGBA colour with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgba {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }
}

/// Font and background used by the on-screen display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStyle {
    pub font_name: String,
    pub font_size: u32,
    pub font_color: Rgba,
    /// Box drawn behind the text, `None` for no background
    pub background: Option<Rgba>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_name: "Serif".to_string(),
            font_size: 20,
            font_color: Rgba::WHITE,
            background: Some(Rgba::new(0.0, 0.0, 0.0, 0.7)),
        }
    }
}

/// A positioned block of overlay text, ready to hand to an OSD element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayText {
    pub text: String,
    pub x_offset: u32,
    pub y_offset: u32,
    pub style: TextStyle,
}

impl OverlayText {
    /// Title line followed by the current and stabilized counts
    pub fn stabilized(title: &str, snapshot: &Snapshot) -> Self {
        Self {
            text: format_counts(title, snapshot),
            x_offset: TEXT_MARGIN,
            y_offset: TEXT_MARGIN,
            style: TextStyle::default(),
        }
    }

    /// Single-line raw count, as shown when no stabilization runs
    pub fn raw_count(label: &str, count: u32) -> Self {
        Self {
            text: format!("{}: {}", label, count),
            x_offset: TEXT_MARGIN,
            y_offset: TEXT_MARGIN,
            style: TextStyle {
                font_size: 24,
                ..TextStyle::default()
            },
        }
    }

    /// Shift the text box into a tile at `(x, y)`
    pub fn translated(mut self, x: u32, y: u32) -> Self {
        self.x_offset += x;
        self.y_offset += y;
        self
    }
}

/// Overlay string for one stream
pub fn format_counts(title: &str, snapshot: &Snapshot) -> String {
    format!(
        "{}\nCurrent: {}\nStabilized: {}",
        title, snapshot.current, snapshot.stabilized
    )
}

/// Region of the composed canvas given to one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Overlay of one stream placed on the composed canvas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedOverlay {
    pub stream: String,
    pub tile: Tile,
    pub snapshot: Snapshot,
    pub overlay: OverlayText,
}

/// Side-by-side layout of several streams on one canvas
#[derive(Debug, Clone)]
pub struct CompositeLayout {
    width: u32,
    height: u32,
    streams: Vec<StreamConfig>,
}

impl CompositeLayout {
    pub fn new(layout: &LayoutConfig, streams: Vec<StreamConfig>) -> Self {
        Self {
            width: layout.width,
            height: layout.height,
            streams,
        }
    }

    /// Equal-width columns, left to right in stream order. The last column
    /// absorbs any remainder of the width.
    pub fn tiles(&self) -> Vec<Tile> {
        let count = self.streams.len() as u32;
        if count == 0 {
            return Vec::new();
        }

        let column = self.width / count;
        (0..count)
            .map(|i| {
                let x = i * column;
                let width = if i + 1 == count { self.width - x } else { column };
                Tile {
                    x,
                    y: 0,
                    width,
                    height: self.height,
                }
            })
            .collect()
    }

    /// Read every stream's latest snapshot and place its overlay in its tile.
    /// Streams without data render the zero state.
    pub fn compose(&self, registry: &StatsRegistry) -> Vec<PlacedOverlay> {
        self.streams
            .iter()
            .zip(self.tiles())
            .map(|(stream, tile)| {
                let snapshot = registry.snapshot(&stream.name);
                PlacedOverlay {
                    stream: stream.name.clone(),
                    tile,
                    snapshot,
                    overlay: OverlayText::stabilized(&stream.title, &snapshot)
                        .translated(tile.x, tile.y),
                }
            })
            .collect()
    }

    pub fn streams(&self) -> &[StreamConfig] {
        &self.streams
    }
}

/// Latest overlay text per stream, written by the ingestion path and read
/// by a render stage.
#[derive(Debug, Default)]
pub struct OverlayBoard {
    texts: RwLock<HashMap<String, OverlayText>>,
    streams: Vec<StreamConfig>,
}

impl OverlayBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Board using the configured titles for known streams
    pub fn with_titles(streams: &[StreamConfig]) -> Self {
        Self {
            texts: RwLock::new(HashMap::new()),
            streams: streams.to_vec(),
        }
    }

    pub fn title_for(&self, stream: &str) -> String {
        resolve_title(&self.streams, stream)
    }

    /// Replace the overlay of `stream` with one built from `snapshot`
    pub fn publish(&self, stream: &str, snapshot: &Snapshot) {
        let overlay = OverlayText::stabilized(&self.title_for(stream), snapshot);
        let mut texts = self.texts.write().unwrap_or_else(PoisonError::into_inner);
        texts.insert(stream.to_string(), overlay);
    }

    pub fn latest(&self, stream: &str) -> Option<OverlayText> {
        let texts = self.texts.read().unwrap_or_else(PoisonError::into_inner);
        texts.get(stream).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::PercentileEstimator;
    use std::sync::Arc;

    fn snapshot(current: u32, stabilized: u32) -> Snapshot {
        Snapshot {
            current,
            stabilized,
            frame_count: 1,
        }
    }

    #[test]
    fn test_overlay_text_format() {
        let overlay = OverlayText::stabilized("TOP VIEW", &snapshot(4, 3));
        assert_eq!(overlay.text, "TOP VIEW\nCurrent: 4\nStabilized: 3");
        assert_eq!((overlay.x_offset, overlay.y_offset), (20, 20));
        assert_eq!(overlay.style.font_name, "Serif");
        assert_eq!(overlay.style.font_size, 20);
        assert_eq!(overlay.style.background, Some(Rgba::new(0.0, 0.0, 0.0, 0.7)));
    }

    #[test]
    fn test_raw_count_overlay() {
        let overlay = OverlayText::raw_count("Fish Count", 7);
        assert_eq!(overlay.text, "Fish Count: 7");
        assert_eq!(overlay.style.font_size, 24);
    }

    #[test]
    fn test_two_stream_tiles() {
        let layout = CompositeLayout::new(
            &LayoutConfig::default(),
            vec![StreamConfig::named("top"), StreamConfig::named("side")],
        );

        let tiles = layout.tiles();
        assert_eq!(
            tiles,
            vec![
                Tile { x: 0, y: 0, width: 960, height: 1080 },
                Tile { x: 960, y: 0, width: 960, height: 1080 },
            ]
        );
    }

    #[test]
    fn test_uneven_tiles_cover_canvas() {
        let layout = CompositeLayout::new(
            &LayoutConfig { width: 1000, height: 500 },
            vec![
                StreamConfig::named("a"),
                StreamConfig::named("b"),
                StreamConfig::named("c"),
            ],
        );

        let tiles = layout.tiles();
        assert_eq!(tiles[2].x, 666);
        assert_eq!(tiles[2].width, 334);
        assert_eq!(tiles.iter().map(|t| t.width).sum::<u32>(), 1000);
        assert!(CompositeLayout::new(&LayoutConfig::default(), Vec::new())
            .tiles()
            .is_empty());
    }

    #[test]
    fn test_compose_reads_registry() {
        let registry = StatsRegistry::new(10, Arc::new(PercentileEstimator::default())).unwrap();
        registry.update("top", 5);

        let layout = CompositeLayout::new(
            &LayoutConfig::default(),
            vec![StreamConfig::new("top", "TOP VIEW"), StreamConfig::new("side", "SIDE VIEW")],
        );
        let placed = layout.compose(&registry);

        assert_eq!(placed.len(), 2);
        assert_eq!(placed[0].overlay.text, "TOP VIEW\nCurrent: 5\nStabilized: 5");
        assert_eq!(placed[1].snapshot, Snapshot::ZERO);
        assert_eq!(placed[1].overlay.text, "SIDE VIEW\nCurrent: 0\nStabilized: 0");
        assert_eq!(placed[1].overlay.x_offset, 980);
    }

    #[test]
    fn test_board_keeps_latest() {
        let board = OverlayBoard::with_titles(&[StreamConfig::new("top", "Top Camera")]);
        assert!(board.latest("top").is_none());

        board.publish("top", &snapshot(2, 2));
        board.publish("top", &snapshot(3, 2));
        board.publish("side", &snapshot(1, 1));

        assert_eq!(board.latest("top").unwrap().text, "Top Camera\nCurrent: 3\nStabilized: 2");
        assert_eq!(board.latest("side").unwrap().text, "SIDE VIEW\nCurrent: 1\nStabilized: 1");
    }
}
