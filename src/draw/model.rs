pub const MIN_PEN_WIDTH: u32 = 1;
pub const MAX_PEN_WIDTH: u32 = 20;
pub const DEFAULT_PEN_WIDTH: u32 = 5;
/// Eraser strokes cover three times the configured pen width.
pub const ERASER_WIDTH_FACTOR: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawMode {
    #[default]
    Pen,
    Eraser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Self = Self::rgba(255, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// A fully transparent pen would draw nothing, so it is not accepted as a
    /// tool color.
    pub fn is_valid_pen_color(self) -> bool {
        self.a > 0
    }
}

pub fn clamp_pen_width(width: u32) -> u32 {
    width.clamp(MIN_PEN_WIDTH, MAX_PEN_WIDTH)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Tool configuration applied to strokes when they are started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolState {
    mode: DrawMode,
    color: Color,
    width: u32,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            mode: DrawMode::Pen,
            color: Color::RED,
            width: DEFAULT_PEN_WIDTH,
        }
    }
}

impl ToolState {
    pub fn new(color: Color, width: u32) -> Self {
        let mut tool = Self::default();
        tool.set_color(color);
        tool.set_width(width);
        tool
    }

    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn set_mode(&mut self, mode: DrawMode) {
        self.mode = mode;
    }

    /// Picking a color switches back to the pen. Invalid colors are ignored
    /// and the previous color is kept.
    pub fn set_color(&mut self, color: Color) -> bool {
        if !color.is_valid_pen_color() {
            tracing::debug!(?color, "ignoring invalid pen color");
            return false;
        }
        self.color = color;
        self.mode = DrawMode::Pen;
        true
    }

    pub fn set_width(&mut self, width: u32) -> u32 {
        self.width = clamp_pen_width(width);
        self.width
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: u32,
    pub mode: DrawMode,
    pub points: Vec<Point>,
}

impl Stroke {
    pub fn start(tool: &ToolState, point: Point) -> Self {
        Self {
            color: tool.color(),
            width: tool.width(),
            mode: tool.mode(),
            points: vec![point],
        }
    }

    /// Strokes with fewer than two points have no segment to draw.
    pub fn is_renderable(&self) -> bool {
        self.points.len() >= 2
    }

    pub fn rendered_width(&self) -> u32 {
        match self.mode {
            DrawMode::Pen => self.width,
            DrawMode::Eraser => self.width * ERASER_WIDTH_FACTOR,
        }
    }
}

/// Ordered strokes; insertion order is render order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrokeStore {
    strokes: Vec<Stroke>,
    revision: u64,
    generation: u64,
}

impl StrokeStore {
    pub fn begin(&mut self, tool: &ToolState, point: Point) {
        self.strokes.push(Stroke::start(tool, point));
        self.bump();
    }

    pub fn extend_last(&mut self, point: Point) -> bool {
        let Some(stroke) = self.strokes.last_mut() else {
            return false;
        };
        stroke.points.push(point);
        self.bump();
        true
    }

    pub fn clear(&mut self) {
        if !self.strokes.is_empty() {
            self.strokes.clear();
            self.generation = self.generation.wrapping_add(1);
            self.bump();
        }
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn last(&self) -> Option<&Stroke> {
        self.strokes.last()
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Changes on every mutation; the surface re-renders when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Changes only when strokes are removed. Between two equal generations
    /// the store has only grown: new strokes appended, points appended to
    /// the last stroke.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
