//! 图纸坐标到像素坐标的取景变换，以及缩放/平移状态。

use cutquote_core::drawing::Drawing;
use cutquote_core::geometry::{Bounds2D, Point2, Vector2};
use glam::DVec2;

pub const DEFAULT_ZOOM: f64 = 1.0;
pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 5.0;
pub const ZOOM_STEP: f64 = 0.1;
/// 取景时四周保留的像素边距。
pub const PADDING_PX: f64 = 20.0;

/// 画布尺寸（像素）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    #[inline]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// 滚轮向下（正值）缩小，其余放大。
    pub fn from_wheel_delta(delta_y: f64) -> Self {
        if delta_y > 0.0 { Self::Out } else { Self::In }
    }
}

/// 用户缩放与像素平移。状态转换均返回新值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub zoom: f64,
    pub offset: Vector2,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_ZOOM,
            offset: Vector2::new(0.0, 0.0),
        }
    }
}

impl ViewState {
    #[inline]
    fn clamp_zoom(value: f64) -> f64 {
        value.clamp(MIN_ZOOM, MAX_ZOOM)
    }

    /// 以光标为锚点缩放一个步长：光标下的内容在屏幕上保持不动。
    pub fn zoomed(self, direction: ZoomDirection, cursor: Point2) -> Self {
        let step = match direction {
            ZoomDirection::In => ZOOM_STEP,
            ZoomDirection::Out => -ZOOM_STEP,
        };
        self.zoomed_to(self.zoom + step, cursor)
    }

    /// 缩放到指定倍率（会被夹紧到允许范围）。
    pub fn zoomed_to(self, zoom: f64, cursor: Point2) -> Self {
        if !zoom.is_finite() {
            return self;
        }
        let new_zoom = Self::clamp_zoom(zoom);
        let ratio = new_zoom / self.zoom;
        let cursor = cursor.as_vec2();
        let offset = cursor - (cursor - self.offset.as_vec2()) * ratio;
        Self {
            zoom: new_zoom,
            offset: Vector2::from(offset),
        }
    }

    pub fn panned(self, dx: f64, dy: f64) -> Self {
        Self {
            offset: Vector2::from(self.offset.as_vec2() + DVec2::new(dx, dy)),
            ..self
        }
    }
}

/// 把图纸范围居中适配到画布（含边距），再叠加缩放与平移。Y 轴翻转为屏幕向下。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    bounds: Bounds2D,
    scale: f64,
    translation: DVec2,
}

impl ViewTransform {
    pub fn new(bounds: Bounds2D, viewport: ViewportSize, view: ViewState) -> Self {
        let width = bounds.width();
        let height = bounds.height();
        let available_x = (viewport.width - 2.0 * PADDING_PX).max(1.0);
        let available_y = (viewport.height - 2.0 * PADDING_PX).max(1.0);

        // 零宽或零高的方向不参与适配；单点图纸退化为 1:1
        let fit = [(available_x, width), (available_y, height)]
            .into_iter()
            .filter(|(_, extent)| *extent > 0.0)
            .map(|(available, extent)| available / extent)
            .fold(f64::INFINITY, f64::min);
        let base_scale = if fit.is_finite() { fit } else { 1.0 };
        let scale = base_scale * view.zoom;

        let min = bounds.min();
        let max = bounds.max();
        let translation = DVec2::new(
            (viewport.width - width * scale) / 2.0 - min.x() * scale,
            (viewport.height - height * scale) / 2.0 + max.y() * scale,
        ) + view.offset.as_vec2();

        Self {
            bounds,
            scale,
            translation,
        }
    }

    /// 以整张图纸的范围取景。图纸没有任何可定位实体时返回 `None`。
    pub fn for_drawing(drawing: &Drawing, viewport: ViewportSize, view: ViewState) -> Option<Self> {
        drawing
            .bounds()
            .map(|bounds| Self::new(bounds, viewport, view))
    }

    #[inline]
    pub fn bounds(&self) -> Bounds2D {
        self.bounds
    }

    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// 图纸坐标 → 像素坐标。
    #[inline]
    pub fn apply(&self, point: Point2) -> Point2 {
        Point2::new(
            point.x() * self.scale + self.translation.x,
            -point.y() * self.scale + self.translation.y,
        )
    }

    /// 图纸长度 → 像素长度。
    #[inline]
    pub fn apply_length(&self, length: f64) -> f64 {
        length * self.scale
    }
}
