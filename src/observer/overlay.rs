//! Overlay text publisher

use super::{FrameEvent, FrameObserver};
use crate::error::CountResult;
use crate::overlay::OverlayBoard;
use std::sync::Arc;

/// Publishes the overlay text of each frame to a shared [`OverlayBoard`]
pub struct OverlayObserver {
    board: Arc<OverlayBoard>,
}

impl OverlayObserver {
    pub fn new(board: Arc<OverlayBoard>) -> Self {
        Self { board }
    }

    pub fn board(&self) -> &Arc<OverlayBoard> {
        &self.board
    }
}

impl FrameObserver for OverlayObserver {
    fn observe(&self, event: &FrameEvent<'_>) -> CountResult<()> {
        self.board.publish(event.stream, &event.snapshot);
        Ok(())
    }

    fn name(&self) -> &str {
        "overlay"
    }
}
