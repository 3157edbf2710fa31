//! 生成与后端无关的显示列表（像素坐标）。

use std::f64::consts::TAU;

use cutquote_core::drawing::{Drawing, Entity};
use cutquote_core::geometry::Point2;

use crate::view::ViewTransform;

/// 像素空间的绘制指令。角度均为屏幕坐标系（Y 向下）下的弧度，沿角度增大方向扫掠。
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Polyline {
        points: Vec<Point2>,
        closed: bool,
    },
    Arc {
        center: Point2,
        radius: f64,
        start_angle: f64,
        sweep: f64,
    },
    Ellipse {
        center: Point2,
        radius_x: f64,
        radius_y: f64,
        rotation: f64,
    },
}

/// 单个实体绘制失败的记录，不会中断其余实体。
#[derive(Debug, Clone, PartialEq)]
pub struct RenderWarning {
    pub index: usize,
    pub kind: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    pub commands: Vec<DrawCommand>,
    pub warnings: Vec<RenderWarning>,
}

/// 后端绘制接口。
pub trait RenderSurface {
    type Error: std::fmt::Display;

    fn clear(&mut self);
    fn draw(&mut self, command: &DrawCommand) -> Result<(), Self::Error>;
}

impl DisplayList {
    /// 在目标表面上依次绘制；失败的指令收集为告警。
    pub fn replay<S: RenderSurface>(&self, surface: &mut S) -> Vec<String> {
        surface.clear();
        self.commands
            .iter()
            .filter_map(|command| surface.draw(command).err().map(|err| err.to_string()))
            .collect()
    }
}

pub fn build_display_list(drawing: &Drawing, transform: &ViewTransform) -> DisplayList {
    drawing.entities().iter().enumerate().fold(
        DisplayList::default(),
        |mut list, (index, entity)| {
            match entity_command(entity, transform) {
                Ok(Some(command)) => list.commands.push(command),
                Ok(None) => {}
                Err(reason) => list.warnings.push(RenderWarning {
                    index,
                    kind: entity.kind().to_string(),
                    reason,
                }),
            }
            list
        },
    )
}

fn entity_command(entity: &Entity, transform: &ViewTransform) -> Result<Option<DrawCommand>, String> {
    let command = match entity {
        Entity::Line(line) => DrawCommand::Polyline {
            points: vec![transform.apply(line.start), transform.apply(line.end)],
            closed: false,
        },
        Entity::Polyline(polyline) => {
            if polyline.vertices.len() < 2 {
                return Ok(None);
            }
            DrawCommand::Polyline {
                points: polyline.vertices.iter().map(|v| transform.apply(*v)).collect(),
                closed: polyline.is_closed,
            }
        }
        Entity::Spline(spline) => {
            if spline.control_points.len() < 2 {
                return Ok(None);
            }
            DrawCommand::Polyline {
                points: spline
                    .control_points
                    .iter()
                    .map(|p| transform.apply(*p))
                    .collect(),
                closed: false,
            }
        }
        Entity::Circle(circle) => {
            if circle.radius <= 0.0 {
                return Ok(None);
            }
            DrawCommand::Arc {
                center: transform.apply(circle.center),
                radius: transform.apply_length(circle.radius),
                start_angle: 0.0,
                sweep: TAU,
            }
        }
        Entity::Arc(arc) => {
            if arc.radius <= 0.0 {
                return Ok(None);
            }
            // Y 翻转后角度取镜像：[start, end] → [2π - end, 2π - start]
            DrawCommand::Arc {
                center: transform.apply(arc.center),
                radius: transform.apply_length(arc.radius),
                start_angle: TAU - arc.end_angle,
                sweep: arc.sweep(),
            }
        }
        Entity::Ellipse(ellipse) => DrawCommand::Ellipse {
            center: transform.apply(ellipse.center),
            radius_x: transform.apply_length(ellipse.major_radius()),
            radius_y: transform.apply_length(ellipse.minor_radius()),
            rotation: -ellipse.major_axis.angle(),
        },
        Entity::Unsupported(_) => return Ok(None),
        Entity::Malformed(malformed) => return Err(malformed.reason.clone()),
    };

    if command_is_finite(&command) {
        Ok(Some(command))
    } else {
        Err("像素坐标不是有限值".to_string())
    }
}

fn command_is_finite(command: &DrawCommand) -> bool {
    match command {
        DrawCommand::Polyline { points, .. } => points.iter().all(|p| p.is_finite()),
        DrawCommand::Arc {
            center,
            radius,
            start_angle,
            sweep,
        } => center.is_finite() && radius.is_finite() && start_angle.is_finite() && sweep.is_finite(),
        DrawCommand::Ellipse {
            center,
            radius_x,
            radius_y,
            rotation,
        } => {
            center.is_finite() && radius_x.is_finite() && radius_y.is_finite() && rotation.is_finite()
        }
    }
}
