//! 基于 tiny-skia 的位图后端：回放显示列表并导出 PNG。

use std::f64::consts::TAU;
use std::path::Path;

use cutquote_config::PreviewConfig;
use cutquote_core::geometry::Point2;
use cutquote_engine::render::{DisplayList, DrawCommand, RenderSurface};
use image::{ImageFormat, RgbaImage};
use tiny_skia::{Color, Paint, Path as SkiaPath, PathBuilder, Pixmap, Rect, Stroke, Transform};
use tracing::{debug, warn};

use crate::errors::FrontendError;

/// 每段折线近似的最大弦长（像素）。
const FLATTEN_STEP_PX: f64 = 2.0;
const MIN_SEGMENTS: usize = 8;
const MAX_SEGMENTS: usize = 1440;

#[derive(Debug, Clone, Copy)]
pub struct PreviewStyle {
    pub background: Color,
    pub stroke: Color,
    pub stroke_width: f32,
}

impl PreviewStyle {
    pub fn from_config(config: &PreviewConfig) -> Result<Self, FrontendError> {
        Ok(Self {
            background: parse_hex_color(&config.background)?,
            stroke: parse_hex_color(&config.stroke)?,
            stroke_width: config.stroke_width,
        })
    }
}

impl Default for PreviewStyle {
    fn default() -> Self {
        Self {
            background: Color::BLACK,
            stroke: Color::from_rgba8(0xE6, 0x00, 0x7E, 0xFF),
            stroke_width: 2.0,
        }
    }
}

/// 解析 `#RRGGBB` / `#RRGGBBAA`。
pub fn parse_hex_color(text: &str) -> Result<Color, FrontendError> {
    let invalid = || FrontendError::InvalidColor(text.to_string());
    let hex = text.trim().strip_prefix('#').ok_or_else(invalid)?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |index: usize| u8::from_str_radix(&hex[index..index + 2], 16).map_err(|_| invalid());
    let alpha = if hex.len() == 8 { channel(6)? } else { 0xFF };
    Ok(Color::from_rgba8(channel(0)?, channel(2)?, channel(4)?, alpha))
}

/// 持有画布与笔刷的绘制表面。
pub struct PixmapSurface {
    pixmap: Pixmap,
    style: PreviewStyle,
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32, style: PreviewStyle) -> Result<Self, FrontendError> {
        let pixmap = Pixmap::new(width, height).ok_or(FrontendError::Canvas { width, height })?;
        Ok(Self { pixmap, style })
    }

    #[inline]
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    fn stroke_points(&mut self, points: &[Point2], closed: bool) -> Result<(), String> {
        let mut builder = PathBuilder::new();
        let mut iter = points.iter();
        let first = iter.next().ok_or_else(|| "路径没有顶点".to_string())?;
        builder.move_to(first.x() as f32, first.y() as f32);
        for point in iter {
            builder.line_to(point.x() as f32, point.y() as f32);
        }
        if closed {
            builder.close();
        }
        // 退化路径（所有点重合）不绘制
        if let Some(path) = builder.finish() {
            self.stroke(&path, Transform::identity());
        }
        Ok(())
    }

    fn stroke(&mut self, path: &SkiaPath, transform: Transform) {
        let mut paint = Paint::default();
        paint.set_color(self.style.stroke);
        paint.anti_alias = true;
        let stroke = Stroke {
            width: self.style.stroke_width,
            ..Default::default()
        };
        self.pixmap
            .stroke_path(path, &paint, &stroke, transform, None);
    }

    /// 以 RGBA8 PNG 写出当前画布。
    pub fn save_png(&self, path: &Path) -> Result<(), FrontendError> {
        let data: Vec<u8> = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let color = pixel.demultiply();
                [color.red(), color.green(), color.blue(), color.alpha()]
            })
            .collect();
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        let image = RgbaImage::from_raw(width, height, data).ok_or(FrontendError::Canvas { width, height })?;
        image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|source| FrontendError::Image {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), width, height, "预览图已写出");
        Ok(())
    }
}

impl RenderSurface for PixmapSurface {
    type Error = String;

    fn clear(&mut self) {
        self.pixmap.fill(self.style.background);
    }

    fn draw(&mut self, command: &DrawCommand) -> Result<(), String> {
        match command {
            DrawCommand::Polyline { points, closed } => self.stroke_points(points, *closed),
            DrawCommand::Arc {
                center,
                radius,
                start_angle,
                sweep,
            } => {
                let full = *sweep >= TAU;
                let points = flatten(*sweep, *radius, |t| {
                    let angle = start_angle + sweep * t;
                    Point2::new(center.x() + radius * angle.cos(), center.y() + radius * angle.sin())
                });
                self.stroke_points(&points, full)
            }
            DrawCommand::Ellipse {
                center,
                radius_x,
                radius_y,
                rotation,
            } => {
                let (rx, ry) = (*radius_x as f32, *radius_y as f32);
                let oval = Rect::from_xywh(-rx, -ry, 2.0 * rx, 2.0 * ry)
                    .ok_or_else(|| format!("椭圆半轴无效: {radius_x} × {radius_y}"))?;
                let transform = Transform::from_translate(center.x() as f32, center.y() as f32)
                    .pre_rotate(rotation.to_degrees() as f32);
                if let Some(path) = PathBuilder::from_oval(oval) {
                    self.stroke(&path, transform);
                }
                Ok(())
            }
        }
    }
}

/// 按弧长把参数区间 `[0, 1]` 离散成点列。
fn flatten(sweep: f64, radius: f64, at: impl Fn(f64) -> Point2) -> Vec<Point2> {
    let arc_length = (sweep * radius).abs();
    let segments = ((arc_length / FLATTEN_STEP_PX).ceil() as usize).clamp(MIN_SEGMENTS, MAX_SEGMENTS);
    (0..=segments)
        .map(|step| at(step as f64 / segments as f64))
        .collect()
}

/// 把显示列表绘制到新画布。返回画布以及绘制阶段的失败信息。
pub fn rasterize(
    list: &DisplayList,
    width: u32,
    height: u32,
    style: PreviewStyle,
) -> Result<(PixmapSurface, Vec<String>), FrontendError> {
    let mut surface = PixmapSurface::new(width, height, style)?;
    let failures = list.replay(&mut surface);
    for failure in &failures {
        warn!(reason = %failure, "绘制指令失败");
    }
    Ok((surface, failures))
}
