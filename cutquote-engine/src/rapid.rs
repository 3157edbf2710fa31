//! 空行程（切割头在相邻实体之间的移动）距离估算。

use cutquote_core::drawing::{Drawing, Entity};
use cutquote_core::geometry::Point2;
use glam::DVec2;

/// 实体的代表点：圆/圆弧/椭圆取圆心，直线与多段线取顶点质心。
/// 样条、未支持与无效实体没有代表点。
pub fn entity_center(entity: &Entity) -> Option<Point2> {
    match entity {
        Entity::Circle(circle) => Some(circle.center),
        Entity::Arc(arc) => Some(arc.center),
        Entity::Ellipse(ellipse) => Some(ellipse.center),
        Entity::Line(line) => centroid(&[line.start, line.end]),
        Entity::Polyline(polyline) => centroid(&polyline.vertices),
        Entity::Spline(_) | Entity::Unsupported(_) | Entity::Malformed(_) => None,
    }
}

fn centroid(points: &[Point2]) -> Option<Point2> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(DVec2::ZERO, |acc, point| acc + point.as_vec2());
    Some(Point2::from_vec(sum / points.len() as f64))
}

/// 按实体顺序累加相邻代表点之间的直线距离，结果换算为毫米。
/// 只有前后两个实体都有代表点时才计入，没有代表点的实体会断开连线。
pub fn rapid_distance(drawing: &Drawing) -> f64 {
    let centers: Vec<Option<Point2>> = drawing.entities().iter().map(entity_center).collect();
    let distance: f64 = centers
        .windows(2)
        .filter_map(|pair| match pair {
            [Some(from), Some(to)] => Some(from.distance(*to)),
            _ => None,
        })
        .sum();
    drawing.units().to_mm(distance)
}

#[cfg(test)]
mod tests {
    use cutquote_core::drawing::{Circle, Line, Polyline, Spline, UnsupportedEntity};
    use cutquote_core::units::Units;

    use super::*;

    fn circle_at(x: f64, y: f64) -> Entity {
        Entity::Circle(Circle {
            center: Point2::new(x, y),
            radius: 1.0,
        })
    }

    #[test]
    fn single_entity_has_no_rapid_travel() {
        let drawing = Drawing::new(vec![circle_at(5.0, 5.0)], Units::Millimeters);
        assert_eq!(rapid_distance(&drawing), 0.0);
    }

    #[test]
    fn sums_consecutive_center_distances() {
        let drawing = Drawing::new(
            vec![circle_at(0.0, 0.0), circle_at(3.0, 4.0), circle_at(3.0, 10.0)],
            Units::Millimeters,
        );
        assert!((rapid_distance(&drawing) - 11.0).abs() < 1e-9);
    }

    #[test]
    fn entity_without_center_breaks_the_chain() {
        let drawing = Drawing::new(
            vec![
                circle_at(0.0, 0.0),
                Entity::Unsupported(UnsupportedEntity {
                    kind: "TEXT".to_string(),
                }),
                Entity::Spline(Spline {
                    control_points: vec![Point2::new(100.0, 100.0)],
                }),
                circle_at(0.0, 2.0),
            ],
            Units::Millimeters,
        );
        assert_eq!(rapid_distance(&drawing), 0.0);

        let drawing = Drawing::new(
            vec![
                circle_at(0.0, 0.0),
                Entity::Unsupported(UnsupportedEntity {
                    kind: "TEXT".to_string(),
                }),
                circle_at(0.0, 100.0),
            ],
            Units::Millimeters,
        );
        assert_eq!(rapid_distance(&drawing), 0.0);
    }

    #[test]
    fn pairs_on_either_side_of_a_gap_still_count() {
        let drawing = Drawing::new(
            vec![
                circle_at(0.0, 0.0),
                circle_at(3.0, 4.0),
                Entity::Unsupported(UnsupportedEntity {
                    kind: "TEXT".to_string(),
                }),
                circle_at(50.0, 50.0),
                circle_at(50.0, 52.0),
            ],
            Units::Millimeters,
        );
        assert!((rapid_distance(&drawing) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn line_and_polyline_use_vertex_centroid() {
        let line = Entity::Line(Line {
            start: Point2::new(0.0, 0.0),
            end: Point2::new(4.0, 0.0),
        });
        assert_eq!(entity_center(&line), Some(Point2::new(2.0, 0.0)));

        let empty = Entity::Polyline(Polyline {
            vertices: Vec::new(),
            is_closed: false,
        });
        assert_eq!(entity_center(&empty), None);
    }

    #[test]
    fn inches_are_converted_to_millimeters() {
        let drawing = Drawing::new(
            vec![circle_at(0.0, 0.0), circle_at(1.0, 0.0)],
            Units::Inches,
        );
        assert!((rapid_distance(&drawing) - 25.4).abs() < 1e-9);
    }
}
