use std::sync::{Mutex, MutexGuard, PoisonError};

/// Pixel geometry of the scroll container the coordinator observes.
pub trait Viewport: Send + Sync {
    /// Current scroll offset from the top.
    fn scroll_top(&self) -> f64;
    fn set_scroll_top(&self, top: f64);
    /// Total scrollable height, never less than the client height.
    fn scroll_height(&self) -> f64;
    /// Height of the visible area.
    fn client_height(&self) -> f64;
    /// Height of the rendered content itself.
    fn content_height(&self) -> f64;
    /// Enable or disable native scrolling without detaching observers.
    fn set_scrollable(&self, scrollable: bool);
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Geometry {
    top: f64,
    client_height: f64,
    content_height: f64,
    scrollable: bool,
}

/// A viewport held entirely in memory; for terminals and tests.
#[derive(Debug)]
pub struct VirtualViewport {
    geometry: Mutex<Geometry>,
}

impl VirtualViewport {
    pub fn new(client_height: f64) -> Self {
        Self {
            geometry: Mutex::new(Geometry {
                top: 0.0,
                client_height,
                content_height: 0.0,
                scrollable: true,
            }),
        }
    }

    pub fn set_content_height(&self, height: f64) {
        let mut geometry = self.geometry();
        geometry.content_height = height.max(0.0);
        let max_top = (geometry.content_height - geometry.client_height).max(0.0);
        geometry.top = geometry.top.min(max_top);
    }

    /// User-driven scroll. Ignored while scrolling is disabled.
    pub fn scroll_to(&self, top: f64) {
        if !self.is_scrollable() {
            return;
        }
        self.set_scroll_top(top);
    }

    pub fn is_scrollable(&self) -> bool {
        self.geometry().scrollable
    }

    fn geometry(&self) -> MutexGuard<'_, Geometry> {
        self.geometry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Viewport for VirtualViewport {
    fn scroll_top(&self) -> f64 {
        self.geometry().top
    }

    fn set_scroll_top(&self, top: f64) {
        let mut geometry = self.geometry();
        let max_top = (geometry.content_height - geometry.client_height).max(0.0);
        geometry.top = top.clamp(0.0, max_top);
    }

    fn scroll_height(&self) -> f64 {
        let geometry = self.geometry();
        geometry.content_height.max(geometry.client_height)
    }

    fn client_height(&self) -> f64 {
        self.geometry().client_height
    }

    fn content_height(&self) -> f64 {
        self.geometry().content_height
    }

    fn set_scrollable(&self, scrollable: bool) {
        self.geometry().scrollable = scrollable;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_top_is_clamped_to_scrollable_range() {
        let viewport = VirtualViewport::new(500.0);
        viewport.set_content_height(2000.0);
        viewport.scroll_to(5000.0);
        assert_eq!(viewport.scroll_top(), 1500.0);
        viewport.scroll_to(-10.0);
        assert_eq!(viewport.scroll_top(), 0.0);
    }

    #[test]
    fn short_content_does_not_scroll() {
        let viewport = VirtualViewport::new(500.0);
        viewport.set_content_height(200.0);
        viewport.scroll_to(100.0);
        assert_eq!(viewport.scroll_top(), 0.0);
        assert_eq!(viewport.scroll_height(), 500.0);
    }

    #[test]
    fn disabled_viewport_ignores_user_scroll() {
        let viewport = VirtualViewport::new(500.0);
        viewport.set_content_height(2000.0);
        viewport.set_scrollable(false);
        viewport.scroll_to(300.0);
        assert_eq!(viewport.scroll_top(), 0.0);
        viewport.set_scrollable(true);
        viewport.scroll_to(300.0);
        assert_eq!(viewport.scroll_top(), 300.0);
    }
}
