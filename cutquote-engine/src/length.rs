//! 切割路径长度估算。

use std::f64::consts::TAU;

use cutquote_core::drawing::{Drawing, Entity};
use cutquote_core::geometry::Point2;

use crate::diagnostics::EntityWarning;

/// 全图长度估算结果（已换算为毫米）以及被跳过实体的告警。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LengthEstimate {
    pub length_mm: f64,
    pub warnings: Vec<EntityWarning>,
}

/// 单个实体的路径长度（图纸单位）。无长度规则或数据不完整时返回告警。
pub fn entity_length(index: usize, entity: &Entity) -> Result<f64, EntityWarning> {
    let length = match entity {
        Entity::Line(line) => line.start.distance(line.end),
        Entity::Circle(circle) => TAU * circle.radius,
        Entity::Arc(arc) => arc.radius * arc.sweep(),
        Entity::Polyline(polyline) => {
            let mut length = chain_length(&polyline.vertices);
            if polyline.is_closed && polyline.vertices.len() > 1 {
                if let (Some(first), Some(last)) =
                    (polyline.vertices.first(), polyline.vertices.last())
                {
                    length += last.distance(*first);
                }
            }
            length
        }
        // 控制多边形近似
        Entity::Spline(spline) => chain_length(&spline.control_points),
        // 按主轴半径的整圆计，偏大估算
        Entity::Ellipse(ellipse) => TAU * ellipse.major_radius(),
        Entity::Unsupported(unsupported) => {
            return Err(EntityWarning::Unsupported {
                index,
                kind: unsupported.kind.clone(),
            });
        }
        Entity::Malformed(malformed) => {
            return Err(EntityWarning::Malformed {
                index,
                kind: malformed.kind.clone(),
                reason: malformed.reason.clone(),
            });
        }
    };

    if length.is_finite() {
        Ok(length)
    } else {
        Err(EntityWarning::Malformed {
            index,
            kind: entity.kind().to_string(),
            reason: "长度不是有限值".to_string(),
        })
    }
}

fn chain_length(points: &[Point2]) -> f64 {
    points.windows(2).map(|pair| pair[0].distance(pair[1])).sum()
}

/// 累加所有实体的长度并换算为毫米。单个实体失败只产生告警，不影响其余实体。
pub fn estimate_length(drawing: &Drawing) -> LengthEstimate {
    let (raw_length, warnings) = drawing.entities().iter().enumerate().fold(
        (0.0, Vec::new()),
        |(total, mut warnings), (index, entity)| match entity_length(index, entity) {
            Ok(length) => (total + length, warnings),
            Err(warning) => {
                warnings.push(warning);
                (total, warnings)
            }
        },
    );

    LengthEstimate {
        length_mm: drawing.units().to_mm(raw_length),
        warnings,
    }
}
