//! Rectangle overlap tests between windows and the bar's screen region
//!
//! Everything in this module is pure: no I/O, no clocks. The event loop
//! calls [`any_overlap`] against the latest window snapshot, and the hover
//! poller checks pointer samples against [`BarRegion::reveal_zone`].

use waybar_autohide_config::Edge;

use crate::hypr_ipc::WindowSnapshot;

/// An axis-aligned rectangle in screen-pixel coordinates
///
/// Invariant: `width >= 0` and `height >= 0`. A zero-area rectangle never
/// overlaps anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        debug_assert!(width >= 0 && height >= 0);
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Strict intersection test: rectangles that merely share an edge or a
    /// corner do NOT overlap. A window sitting flush against the bar must
    /// not hide it.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Point containment, half-open on the far edges
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// The screen area the bar occupies when visible
///
/// Built once at startup from the configuration plus a monitor query, and
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarRegion {
    /// The bar's rectangle when shown
    pub region: Rect,
    /// Which screen edge the bar is attached to
    pub edge: Edge,
    /// Pixels past the edge that still count as the hover reveal zone
    pub reveal_margin: i32,
    /// Monitor id the bar lives on; `None` means any monitor
    pub monitor: Option<i64>,
}

impl BarRegion {
    pub fn new(region: Rect, edge: Edge, reveal_margin: i32, monitor: Option<i64>) -> Self {
        Self {
            region,
            edge,
            reveal_margin,
            monitor,
        }
    }

    /// Compute the bar rectangle for a monitor: a `thickness`-pixel strip
    /// along the configured edge.
    pub fn from_monitor(
        monitor_rect: Rect,
        monitor_id: i64,
        edge: Edge,
        thickness: i32,
        reveal_margin: i32,
    ) -> Self {
        let region = match edge {
            Edge::Top => Rect::new(monitor_rect.x, monitor_rect.y, monitor_rect.width, thickness),
            Edge::Bottom => Rect::new(
                monitor_rect.x,
                monitor_rect.y + monitor_rect.height - thickness,
                monitor_rect.width,
                thickness,
            ),
            Edge::Left => Rect::new(monitor_rect.x, monitor_rect.y, thickness, monitor_rect.height),
            Edge::Right => Rect::new(
                monitor_rect.x + monitor_rect.width - thickness,
                monitor_rect.y,
                thickness,
                monitor_rect.height,
            ),
        };

        Self::new(region, edge, reveal_margin, Some(monitor_id))
    }

    /// The reveal zone: the bar's own area (so hovering the visible bar
    /// counts) extended outward past the edge by `reveal_margin`.
    pub fn reveal_zone(&self) -> Rect {
        let r = self.region;
        match self.edge {
            Edge::Top => Rect::new(r.x, r.y - self.reveal_margin, r.width, r.height + self.reveal_margin),
            Edge::Bottom => Rect::new(r.x, r.y, r.width, r.height + self.reveal_margin),
            Edge::Left => Rect::new(r.x - self.reveal_margin, r.y, r.width + self.reveal_margin, r.height),
            Edge::Right => Rect::new(r.x, r.y, r.width + self.reveal_margin, r.height),
        }
    }
}

/// Does any visible window intersect the bar region?
///
/// Windows on inactive workspaces or (when the bar is pinned to a monitor)
/// other monitors are ignored. A fullscreen window on the bar's monitor
/// counts as overlapping regardless of its reported rectangle, since it is
/// presumed to cover the whole output. Empty snapshots never overlap.
pub fn any_overlap(bar: &BarRegion, snapshot: &WindowSnapshot) -> bool {
    snapshot.windows().any(|window| {
        if let Some(monitor) = bar.monitor {
            if window.monitor != monitor {
                return false;
            }
        }
        if !snapshot.is_workspace_active(window.workspace) {
            return false;
        }
        window.fullscreen || bar.region.overlaps(&window.rect)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypr_ipc::{WindowSnapshot, WindowState};

    fn snapshot(windows: Vec<(&str, WindowState)>, active: Vec<i64>) -> WindowSnapshot {
        let mut snap = WindowSnapshot::default();
        for (addr, state) in windows {
            snap.insert(addr.to_string(), state);
        }
        snap.set_active_workspaces(active);
        snap
    }

    fn window(rect: Rect) -> WindowState {
        WindowState {
            rect,
            workspace: 1,
            monitor: 0,
            fullscreen: false,
        }
    }

    #[test]
    fn test_positive_area_intersection_overlaps() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 100, 100);

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_shared_edge_does_not_overlap() {
        // Window flush below the bar: bar is [0,30), window starts at y=30
        let bar = Rect::new(0, 0, 1920, 30);
        let below = Rect::new(0, 30, 800, 600);
        let right_of = Rect::new(1920, 0, 800, 600);

        assert!(!bar.overlaps(&below));
        assert!(!bar.overlaps(&right_of));
    }

    #[test]
    fn test_shared_corner_does_not_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 10, 10, 10);

        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_one_pixel_intrusion_overlaps() {
        let bar = Rect::new(0, 0, 1920, 30);
        let window = Rect::new(100, 29, 500, 400);

        assert!(bar.overlaps(&window));
    }

    #[test]
    fn test_zero_area_rect_never_overlaps() {
        let a = Rect::new(5, 5, 0, 10);
        let b = Rect::new(0, 0, 100, 100);

        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_contains_is_half_open() {
        let r = Rect::new(0, 0, 10, 10);

        assert!(r.contains(0, 0));
        assert!(r.contains(9, 9));
        assert!(!r.contains(10, 0));
        assert!(!r.contains(0, 10));
        assert!(!r.contains(-1, 5));
    }

    #[test]
    fn test_bar_region_from_monitor_edges() {
        let mon = Rect::new(0, 0, 1920, 1080);

        let top = BarRegion::from_monitor(mon, 0, Edge::Top, 30, 5);
        assert_eq!(top.region, Rect::new(0, 0, 1920, 30));

        let bottom = BarRegion::from_monitor(mon, 0, Edge::Bottom, 30, 5);
        assert_eq!(bottom.region, Rect::new(0, 1050, 1920, 30));

        let left = BarRegion::from_monitor(mon, 0, Edge::Left, 40, 5);
        assert_eq!(left.region, Rect::new(0, 0, 40, 1080));

        let right = BarRegion::from_monitor(mon, 0, Edge::Right, 40, 5);
        assert_eq!(right.region, Rect::new(1880, 0, 40, 1080));
    }

    #[test]
    fn test_bar_region_offset_monitor() {
        // Second monitor to the right of a 1920-wide primary
        let mon = Rect::new(1920, 0, 2560, 1440);
        let bar = BarRegion::from_monitor(mon, 1, Edge::Top, 30, 5);

        assert_eq!(bar.region, Rect::new(1920, 0, 2560, 30));
        assert_eq!(bar.monitor, Some(1));
    }

    #[test]
    fn test_reveal_zone_extends_outward() {
        let mon = Rect::new(0, 0, 1920, 1080);

        let top = BarRegion::from_monitor(mon, 0, Edge::Top, 30, 5);
        assert_eq!(top.reveal_zone(), Rect::new(0, -5, 1920, 35));

        let bottom = BarRegion::from_monitor(mon, 0, Edge::Bottom, 30, 5);
        assert_eq!(bottom.reveal_zone(), Rect::new(0, 1050, 1920, 35));

        let left = BarRegion::from_monitor(mon, 0, Edge::Left, 40, 5);
        assert_eq!(left.reveal_zone(), Rect::new(-5, 0, 45, 1080));

        let right = BarRegion::from_monitor(mon, 0, Edge::Right, 40, 5);
        assert_eq!(right.reveal_zone(), Rect::new(1880, 0, 45, 1080));
    }

    #[test]
    fn test_reveal_zone_covers_visible_bar() {
        let bar = BarRegion::from_monitor(Rect::new(0, 0, 1920, 1080), 0, Edge::Top, 30, 5);
        let zone = bar.reveal_zone();

        // Hovering the visible bar itself counts
        assert!(zone.contains(960, 15));
        // Just past the bar does not
        assert!(!zone.contains(960, 30));
    }

    #[test]
    fn test_any_overlap_empty_snapshot() {
        let bar = BarRegion::new(Rect::new(0, 0, 1920, 30), Edge::Top, 5, None);
        let snap = snapshot(vec![], vec![1]);

        assert!(!any_overlap(&bar, &snap));
    }

    #[test]
    fn test_any_overlap_detects_intrusion() {
        let bar = BarRegion::new(Rect::new(0, 0, 1920, 30), Edge::Top, 5, None);
        let snap = snapshot(
            vec![("0x1", window(Rect::new(100, 0, 500, 400)))],
            vec![1],
        );

        assert!(any_overlap(&bar, &snap));
    }

    #[test]
    fn test_any_overlap_ignores_adjacent_window() {
        let bar = BarRegion::new(Rect::new(0, 0, 1920, 30), Edge::Top, 5, None);
        let snap = snapshot(
            vec![("0x1", window(Rect::new(0, 30, 1920, 1050)))],
            vec![1],
        );

        assert!(!any_overlap(&bar, &snap));
    }

    #[test]
    fn test_any_overlap_ignores_inactive_workspace() {
        let bar = BarRegion::new(Rect::new(0, 0, 1920, 30), Edge::Top, 5, None);
        let mut state = window(Rect::new(100, 0, 500, 400));
        state.workspace = 2;
        let snap = snapshot(vec![("0x1", state)], vec![1]);

        assert!(!any_overlap(&bar, &snap));
    }

    #[test]
    fn test_any_overlap_ignores_other_monitor() {
        let bar = BarRegion::new(Rect::new(0, 0, 1920, 30), Edge::Top, 5, Some(0));
        let mut state = window(Rect::new(100, 0, 500, 400));
        state.monitor = 1;
        let snap = snapshot(vec![("0x1", state)], vec![1]);

        assert!(!any_overlap(&bar, &snap));
    }

    #[test]
    fn test_fullscreen_always_overlaps() {
        let bar = BarRegion::new(Rect::new(0, 0, 1920, 30), Edge::Top, 5, Some(0));
        // Reported rectangle is nowhere near the bar; fullscreen still wins
        let mut state = window(Rect::new(0, 500, 100, 100));
        state.fullscreen = true;
        let snap = snapshot(vec![("0x1", state)], vec![1]);

        assert!(any_overlap(&bar, &snap));
    }

    #[test]
    fn test_fullscreen_on_other_monitor_does_not_count() {
        let bar = BarRegion::new(Rect::new(0, 0, 1920, 30), Edge::Top, 5, Some(0));
        let mut state = window(Rect::new(1920, 0, 2560, 1440));
        state.monitor = 1;
        state.fullscreen = true;
        let snap = snapshot(vec![("0x1", state)], vec![1]);

        assert!(!any_overlap(&bar, &snap));
    }
}
