// tui-devconsole/src/console/geometry.rs
use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use serde::{Deserialize, Serialize};

pub const MIN_WIDTH: u16 = 40;
pub const MIN_HEIGHT: u16 = 10;

/// Position and size of the floating panel, in terminal cells. The origin
/// is signed because the panel may be dragged partly off-screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u16,
    pub height: u16,
}

impl PanelGeometry {
    pub fn new(x: i32, y: i32, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half the frame in each direction, anchored to the bottom-right corner.
    pub fn bottom_right_half(frame: Rect) -> Self {
        let width = (frame.width / 2).max(1);
        let height = (frame.height / 2).max(1);
        Self {
            x: i32::from(frame.x) + i32::from(frame.width.saturating_sub(width)),
            y: i32::from(frame.y) + i32::from(frame.height.saturating_sub(height)),
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + i32::from(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y + i32::from(self.height)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// The part of the panel that lies inside `frame`; empty when the panel
    /// has been dragged entirely out of it.
    pub fn visible_area(&self, frame: Rect) -> Rect {
        let left = self.x.max(i32::from(frame.x));
        let top = self.y.max(i32::from(frame.y));
        let right = self.right().min(i32::from(frame.right()));
        let bottom = self.bottom().min(i32::from(frame.bottom()));
        if right <= left || bottom <= top {
            return Rect::new(frame.x, frame.y, 0, 0);
        }
        Rect::new(
            left as u16,
            top as u16,
            (right - left) as u16,
            (bottom - top) as u16,
        )
    }
}

/// What a pointer press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    ResizeHandle,
    TitleBar,
}

/// Active pointer interaction. Resizing and dragging can never both be
/// active because they are variants of one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GeometryMode {
    #[default]
    Idle,
    Resizing {
        origin: PanelGeometry,
    },
    Dragging {
        offset_x: i32,
        offset_y: i32,
    },
}

impl GeometryMode {
    pub fn is_idle(&self) -> bool {
        matches!(self, GeometryMode::Idle)
    }

    pub fn is_resizing(&self) -> bool {
        matches!(self, GeometryMode::Resizing { .. })
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, GeometryMode::Dragging { .. })
    }
}

/// Turns pointer down/move/up sequences into panel moves and resizes.
#[derive(Debug, Clone)]
pub struct PanelGeometryController {
    geometry: PanelGeometry,
    mode: GeometryMode,
    min_width: u16,
    min_height: u16,
}

impl PanelGeometryController {
    pub fn new(geometry: PanelGeometry) -> Self {
        Self::with_min_size(geometry, MIN_WIDTH, MIN_HEIGHT)
    }

    pub fn with_min_size(geometry: PanelGeometry, min_width: u16, min_height: u16) -> Self {
        let mut controller = Self {
            geometry,
            mode: GeometryMode::Idle,
            min_width,
            min_height,
        };
        controller.geometry.width = geometry.width.max(min_width);
        controller.geometry.height = geometry.height.max(min_height);
        controller
    }

    pub fn geometry(&self) -> PanelGeometry {
        self.geometry
    }

    pub fn set_geometry(&mut self, geometry: PanelGeometry) {
        self.geometry = PanelGeometry {
            width: geometry.width.max(self.min_width),
            height: geometry.height.max(self.min_height),
            ..geometry
        };
    }

    pub fn mode(&self) -> GeometryMode {
        self.mode
    }

    pub fn min_size(&self) -> (u16, u16) {
        (self.min_width, self.min_height)
    }

    /// Starts a resize or drag. Ignored unless idle.
    pub fn pointer_down(&mut self, target: PointerTarget, x: i32, y: i32) -> bool {
        if !self.mode.is_idle() {
            return false;
        }
        self.mode = match target {
            PointerTarget::ResizeHandle => GeometryMode::Resizing {
                origin: self.geometry,
            },
            PointerTarget::TitleBar => GeometryMode::Dragging {
                offset_x: x - self.geometry.x,
                offset_y: y - self.geometry.y,
            },
        };
        true
    }

    /// Applies a pointer move; returns whether the geometry changed.
    pub fn pointer_move(&mut self, x: i32, y: i32) -> bool {
        let before = self.geometry;
        match self.mode {
            GeometryMode::Idle => return false,
            GeometryMode::Resizing { origin } => {
                self.geometry.width = clamp_extent(x - origin.x, self.min_width);
                self.geometry.height = clamp_extent(y - origin.y, self.min_height);
            }
            GeometryMode::Dragging { offset_x, offset_y } => {
                self.geometry.x = x - offset_x;
                self.geometry.y = y - offset_y;
            }
        }
        self.geometry != before
    }

    /// Ends any interaction, wherever the pointer is. Returns whether one
    /// was active.
    pub fn pointer_up(&mut self) -> bool {
        let was_active = !self.mode.is_idle();
        self.mode = GeometryMode::Idle;
        was_active
    }

    /// Routes a crossterm mouse event. `hit_test` maps a press position to
    /// the part of the panel under it. Releases are honoured anywhere.
    pub fn handle_mouse(
        &mut self,
        event: MouseEvent,
        hit_test: impl FnOnce(u16, u16) -> Option<PointerTarget>,
    ) -> bool {
        let (x, y) = (i32::from(event.column), i32::from(event.row));
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => match hit_test(event.column, event.row) {
                Some(target) => self.pointer_down(target, x, y),
                None => false,
            },
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                if self.mode.is_idle() {
                    false
                } else {
                    self.pointer_move(x, y);
                    true
                }
            }
            MouseEventKind::Up(_) => self.pointer_up(),
            _ => false,
        }
    }
}

fn clamp_extent(extent: i32, min: u16) -> u16 {
    extent.clamp(i32::from(min), i32::from(u16::MAX)) as u16
}
