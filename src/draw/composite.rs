use crate::draw::model::{Color, DrawMode, Point, Stroke, StrokeStore};
use crate::draw::state::OverlayMode;
use tiny_skia::{
    BlendMode, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Stroke as SkiaStroke, Transform,
};

/// Almost-transparent fill behind the strokes. Some window systems stop
/// routing clicks to pixels with zero alpha.
pub const HIT_TEST_BACKGROUND: Color = Color::rgba(0, 0, 0, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };
}

/// Pixel rectangle touched by an incremental update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DirtyRect {
    pub fn from_points(a: (i32, i32), b: (i32, i32), pad: i32) -> Self {
        let min_x = a.0.min(b.0) - pad;
        let max_x = a.0.max(b.0) + pad;
        let min_y = a.1.min(b.1) - pad;
        let max_y = a.1.max(b.1) + pad;
        Self {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1).max(1),
            height: (max_y - min_y + 1).max(1),
        }
    }

    pub fn union(self, other: DirtyRect) -> DirtyRect {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);
        DirtyRect {
            x: min_x,
            y: min_y,
            width: (max_x - min_x).max(1),
            height: (max_y - min_y).max(1),
        }
    }

    /// Intersects with a `width` x `height` surface; `None` when nothing is left.
    pub fn clamp(self, width: u32, height: u32) -> Option<DirtyRect> {
        let max_w = width as i32;
        let max_h = height as i32;
        let x0 = self.x.clamp(0, max_w);
        let y0 = self.y.clamp(0, max_h);
        let x1 = (self.x + self.width).clamp(0, max_w);
        let y1 = (self.y + self.height).clamp(0, max_h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(DirtyRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

/// What changed on the surface since the previous update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderUpdate {
    Unchanged,
    /// Whole surface redrawn.
    Full,
    /// Only this rectangle changed.
    Partial(DirtyRect),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SurfaceKey {
    mode: OverlayMode,
    generation: u64,
    scale: f32,
}

/// How much of the store is already on the pixmap.
#[derive(Debug, Clone, Copy)]
struct Drawn {
    key: SurfaceKey,
    revision: u64,
    strokes: usize,
    last_points: usize,
}

impl Drawn {
    fn capture(key: SurfaceKey, store: &StrokeStore) -> Self {
        Self {
            key,
            revision: store.revision(),
            strokes: store.len(),
            last_points: store.last().map_or(0, |s| s.points.len()),
        }
    }
}

/// Software surface the stroke store is rasterized into. Pixels are
/// premultiplied RGBA.
pub struct Compositor {
    pixmap: Pixmap,
    drawn: Option<Drawn>,
}

impl Compositor {
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            pixmap: Pixmap::new(width.max(1), height.max(1))?,
            drawn: None,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    /// Reallocates the surface when the size changed. Returns true on resize.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        let (width, height) = (width.max(1), height.max(1));
        if self.size() == (width, height) {
            return false;
        }
        match Pixmap::new(width, height) {
            Some(pixmap) => {
                self.pixmap = pixmap;
                self.drawn = None;
                true
            }
            None => {
                tracing::warn!(width, height, "unable to allocate drawing surface");
                false
            }
        }
    }

    /// Brings the surface up to date with `store`. Strokes only ever grow
    /// between clears, so while the mode, clear generation and scale are
    /// unchanged only the newly appended segments are rasterized. Anything
    /// else falls back to a full redraw.
    pub fn update(&mut self, mode: OverlayMode, store: &StrokeStore, scale: f32) -> RenderUpdate {
        let key = SurfaceKey {
            mode,
            generation: store.generation(),
            scale,
        };
        let drawn = match self.drawn {
            Some(drawn) if drawn.key == key && drawn.strokes <= store.len() => drawn,
            _ => {
                self.render(mode, store, scale);
                return RenderUpdate::Full;
            }
        };
        if drawn.revision == store.revision() || !mode.is_enabled() {
            self.drawn = Some(Drawn::capture(key, store));
            return RenderUpdate::Unchanged;
        }

        let transform = Transform::from_scale(scale, scale);
        let mut dirty: Option<DirtyRect> = None;
        let first = drawn.strokes.saturating_sub(1);
        for (index, stroke) in store.strokes().iter().enumerate().skip(first) {
            let already = if index + 1 == drawn.strokes {
                drawn.last_points
            } else {
                0
            };
            if let Some(rect) = draw_segments(&mut self.pixmap, stroke, already, transform, scale)
            {
                dirty = Some(dirty.map_or(rect, |d| d.union(rect)));
            }
        }
        self.drawn = Some(Drawn::capture(key, store));

        let (width, height) = self.size();
        match dirty.and_then(|rect| rect.clamp(width, height)) {
            Some(rect) => RenderUpdate::Partial(rect),
            None => RenderUpdate::Unchanged,
        }
    }

    /// Redraws the whole surface. While disabled nothing is drawn, whatever
    /// the store holds. `scale` converts stroke coordinates to pixels.
    pub fn render(&mut self, mode: OverlayMode, store: &StrokeStore, scale: f32) -> bool {
        let key = SurfaceKey {
            mode,
            generation: store.generation(),
            scale,
        };
        self.drawn = Some(Drawn::capture(key, store));
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
        if !mode.is_enabled() {
            return false;
        }

        self.pixmap.fill(skia_color(HIT_TEST_BACKGROUND));
        let transform = Transform::from_scale(scale, scale);
        for stroke in store.strokes() {
            draw_segments(&mut self.pixmap, stroke, 0, transform, scale);
        }
        true
    }

    /// Premultiplied RGBA bytes, row-major.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Premultiplied RGBA bytes of `rect`, row-major. `rect` must lie inside
    /// the surface, as returned by [`Compositor::update`].
    pub fn region(&self, rect: DirtyRect) -> Vec<u8> {
        let stride = self.pixmap.width() as usize * 4;
        let (x, y) = (rect.x.max(0) as usize, rect.y.max(0) as usize);
        let (w, h) = (rect.width.max(0) as usize, rect.height.max(0) as usize);
        let data = self.pixmap.data();
        let mut out = Vec::with_capacity(w * h * 4);
        for row in y..y + h {
            let start = row * stride + x * 4;
            out.extend_from_slice(&data[start..start + w * 4]);
        }
        out
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let px = self.pixmap.pixel(x, y)?;
        Some(Rgba {
            r: px.red(),
            g: px.green(),
            b: px.blue(),
            a: px.alpha(),
        })
    }
}

/// Strokes `stroke` one segment at a time, skipping the segments between its
/// first `already` points. Full and incremental redraws both go through
/// here, so they lay down identical pixels.
fn draw_segments(
    pixmap: &mut Pixmap,
    stroke: &Stroke,
    already: usize,
    transform: Transform,
    scale: f32,
) -> Option<DirtyRect> {
    if !stroke.is_renderable() {
        return None;
    }
    let start = already.max(1);
    if start >= stroke.points.len() {
        return None;
    }

    let mut paint = Paint::default();
    paint.anti_alias = true;
    match stroke.mode {
        DrawMode::Pen => {
            paint.set_color(skia_color(stroke.color));
            paint.blend_mode = BlendMode::SourceOver;
        }
        DrawMode::Eraser => {
            paint.set_color(tiny_skia::Color::TRANSPARENT);
            paint.blend_mode = BlendMode::Clear;
        }
    }
    let width = stroke.rendered_width() as f32;
    let outline = SkiaStroke {
        width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..SkiaStroke::default()
    };
    let pad = (width * scale / 2.0).ceil() as i32 + 2;

    let mut dirty: Option<DirtyRect> = None;
    for pair in stroke.points[start - 1..].windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let mut builder = PathBuilder::new();
        builder.move_to(a.x, a.y);
        builder.line_to(b.x, b.y);
        let Some(path) = builder.finish() else {
            continue;
        };
        pixmap.stroke_path(&path, &paint, &outline, transform, None);

        let rect = DirtyRect::from_points(device(a, scale), device(b, scale), pad);
        dirty = Some(dirty.map_or(rect, |d| d.union(rect)));
    }
    dirty
}

fn device(point: Point, scale: f32) -> (i32, i32) {
    (
        (point.x * scale).round() as i32,
        (point.y * scale).round() as i32,
    )
}

fn skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::model::{Point, ToolState};

    fn add(store: &mut StrokeStore, tool: &ToolState, points: &[(f32, f32)]) {
        let mut iter = points.iter();
        let Some(&(x, y)) = iter.next() else {
            return;
        };
        store.begin(tool, Point::new(x, y));
        for &(x, y) in iter {
            store.extend_last(Point::new(x, y));
        }
    }

    fn background() -> Rgba {
        Rgba {
            r: 0,
            g: 0,
            b: 0,
            a: HIT_TEST_BACKGROUND.a,
        }
    }

    #[test]
    fn pen_stroke_paints_its_color() {
        let mut store = StrokeStore::default();
        add(
            &mut store,
            &ToolState::new(Color::RED, 5),
            &[(10.0, 10.0), (20.0, 10.0), (20.0, 20.0)],
        );
        let mut compositor = Compositor::new(32, 32).expect("pixmap");
        assert!(compositor.render(OverlayMode::Enabled, &store, 1.0));

        assert_eq!(
            compositor.pixel(15, 10),
            Some(Rgba {
                r: 255,
                g: 0,
                b: 0,
                a: 255
            })
        );
        assert_eq!(compositor.pixel(20, 15).map(|p| p.a), Some(255));
        assert_eq!(compositor.pixel(2, 28), Some(background()));
    }

    #[test]
    fn single_point_stroke_draws_nothing() {
        let mut store = StrokeStore::default();
        add(&mut store, &ToolState::new(Color::RED, 20), &[(16.0, 16.0)]);
        let mut compositor = Compositor::new(32, 32).expect("pixmap");
        compositor.render(OverlayMode::Enabled, &store, 1.0);

        assert_eq!(store.len(), 1);
        assert!(compositor
            .data()
            .chunks_exact(4)
            .all(|px| px == [0, 0, 0, HIT_TEST_BACKGROUND.a]));
    }

    #[test]
    fn eraser_clears_earlier_pen_pixels() {
        let pen = ToolState::new(Color::rgb(0, 0, 255), 4);
        let mut eraser = pen;
        eraser.set_mode(DrawMode::Eraser);
        let mut store = StrokeStore::default();
        add(&mut store, &pen, &[(4.0, 16.0), (28.0, 16.0)]);
        add(&mut store, &eraser, &[(4.0, 16.0), (28.0, 16.0)]);
        let mut compositor = Compositor::new(32, 32).expect("pixmap");
        compositor.render(OverlayMode::Enabled, &store, 1.0);

        assert_eq!(compositor.pixel(16, 16), Some(Rgba::TRANSPARENT));
        // The eraser is three times wider than the pen, so it also clears
        // the hit-test background around the line.
        assert_eq!(compositor.pixel(16, 20), Some(Rgba::TRANSPARENT));
        assert_eq!(compositor.pixel(16, 2), Some(background()));
    }

    #[test]
    fn pen_after_eraser_paints_over_cleared_area() {
        let pen = ToolState::new(Color::rgb(0, 255, 0), 4);
        let mut eraser = pen;
        eraser.set_mode(DrawMode::Eraser);
        let mut store = StrokeStore::default();
        add(&mut store, &eraser, &[(4.0, 16.0), (28.0, 16.0)]);
        add(&mut store, &pen, &[(16.0, 4.0), (16.0, 28.0)]);
        let mut compositor = Compositor::new(32, 32).expect("pixmap");
        compositor.render(OverlayMode::Enabled, &store, 1.0);

        assert_eq!(compositor.pixel(16, 16).map(|p| (p.g, p.a)), Some((255, 255)));
        assert_eq!(compositor.pixel(8, 16), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn disabled_mode_renders_nothing_even_with_strokes() {
        let mut store = StrokeStore::default();
        add(
            &mut store,
            &ToolState::new(Color::RED, 5),
            &[(0.0, 0.0), (31.0, 31.0)],
        );
        let mut compositor = Compositor::new(32, 32).expect("pixmap");
        assert!(!compositor.render(OverlayMode::Disabled, &store, 1.0));
        assert!(compositor.data().iter().all(|b| *b == 0));
    }

    #[test]
    fn scale_maps_points_to_device_pixels() {
        let mut store = StrokeStore::default();
        add(&mut store, &ToolState::new(Color::RED, 2), &[(2.0, 8.0), (14.0, 8.0)]);
        let mut compositor = Compositor::new(32, 32).expect("pixmap");
        compositor.render(OverlayMode::Enabled, &store, 2.0);

        assert_eq!(compositor.pixel(16, 16).map(|p| p.r), Some(255));
        assert_eq!(compositor.pixel(16, 8), Some(background()));
    }

    #[test]
    fn ensure_size_reallocates_only_on_change() {
        let mut compositor = Compositor::new(8, 8).expect("pixmap");
        assert!(!compositor.ensure_size(8, 8));
        assert!(compositor.ensure_size(16, 4));
        assert_eq!(compositor.size(), (16, 4));
        assert!(compositor.ensure_size(0, 0));
        assert_eq!(compositor.size(), (1, 1));
    }

    #[test]
    fn incremental_updates_match_a_full_render() {
        let pen = ToolState::new(Color::rgb(200, 40, 10), 3);
        let mut eraser = pen;
        eraser.set_mode(DrawMode::Eraser);
        let strokes = vec![
            (pen, vec![(2.0, 2.0), (30.0, 4.0), (30.0, 30.0), (4.0, 28.0)]),
            (eraser, vec![(16.0, 0.0), (16.0, 12.0), (18.0, 24.0)]),
            (pen, vec![(0.0, 16.0), (31.0, 16.0)]),
        ];

        let mut store = StrokeStore::default();
        let mut live = Compositor::new(32, 32).expect("pixmap");
        assert_eq!(
            live.update(OverlayMode::Enabled, &store, 1.0),
            RenderUpdate::Full
        );
        for (tool, points) in strokes {
            let (x, y) = points[0];
            store.begin(&tool, Point::new(x, y));
            live.update(OverlayMode::Enabled, &store, 1.0);
            for &(x, y) in &points[1..] {
                store.extend_last(Point::new(x, y));
                assert!(matches!(
                    live.update(OverlayMode::Enabled, &store, 1.0),
                    RenderUpdate::Partial(_)
                ));
            }
        }

        let mut full = Compositor::new(32, 32).expect("pixmap");
        full.render(OverlayMode::Enabled, &store, 1.0);
        assert_eq!(live.data(), full.data());
    }

    #[test]
    fn appended_segment_reports_only_its_neighbourhood() {
        let tool = ToolState::new(Color::RED, 4);
        let mut store = StrokeStore::default();
        let mut compositor = Compositor::new(200, 200).expect("pixmap");
        store.begin(&tool, Point::new(10.0, 10.0));
        store.extend_last(Point::new(20.0, 10.0));
        compositor.update(OverlayMode::Enabled, &store, 1.0);

        store.extend_last(Point::new(20.0, 30.0));
        let RenderUpdate::Partial(rect) = compositor.update(OverlayMode::Enabled, &store, 1.0)
        else {
            panic!("expected a partial update");
        };
        assert!(rect.x <= 18 && rect.x + rect.width >= 22);
        assert!(rect.y <= 8 && rect.y + rect.height >= 32);
        assert!(rect.width < 20 && rect.height < 40);

        let bytes = compositor.region(rect);
        assert_eq!(bytes.len(), (rect.width * rect.height * 4) as usize);
    }

    #[test]
    fn clear_mode_change_and_resize_force_full_redraws() {
        let tool = ToolState::new(Color::RED, 4);
        let mut store = StrokeStore::default();
        let mut compositor = Compositor::new(32, 32).expect("pixmap");
        add(&mut store, &tool, &[(2.0, 2.0), (20.0, 20.0)]);
        compositor.update(OverlayMode::Enabled, &store, 1.0);
        assert_eq!(
            compositor.update(OverlayMode::Enabled, &store, 1.0),
            RenderUpdate::Unchanged
        );

        store.clear();
        assert_eq!(
            compositor.update(OverlayMode::Enabled, &store, 1.0),
            RenderUpdate::Full
        );
        assert_eq!(compositor.pixel(11, 11), Some(background()));

        assert_eq!(
            compositor.update(OverlayMode::Disabled, &store, 1.0),
            RenderUpdate::Full
        );
        compositor.ensure_size(40, 40);
        assert_eq!(
            compositor.update(OverlayMode::Disabled, &store, 1.0),
            RenderUpdate::Full
        );
    }

    #[test]
    fn growth_while_disabled_draws_nothing() {
        let tool = ToolState::new(Color::RED, 4);
        let mut store = StrokeStore::default();
        let mut compositor = Compositor::new(32, 32).expect("pixmap");
        compositor.update(OverlayMode::Disabled, &store, 1.0);

        add(&mut store, &tool, &[(2.0, 2.0), (20.0, 20.0)]);
        assert_eq!(
            compositor.update(OverlayMode::Disabled, &store, 1.0),
            RenderUpdate::Unchanged
        );
        assert!(compositor.data().iter().all(|b| *b == 0));
    }

    #[test]
    fn dirty_rect_clamps_to_surface() {
        let rect = DirtyRect::from_points((-5, -5), (3, 4), 2);
        assert_eq!(
            rect.clamp(10, 10),
            Some(DirtyRect {
                x: 0,
                y: 0,
                width: 6,
                height: 7
            })
        );
        assert_eq!(DirtyRect::from_points((50, 50), (60, 60), 1).clamp(10, 10), None);
    }
}
