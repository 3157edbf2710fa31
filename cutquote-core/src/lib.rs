pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        /// 两点间欧氏距离。
        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 二维向量，椭圆主轴等方向量使用。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector2(pub DVec2);

    impl Vector2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        /// 相对 +X 轴的方向角（弧度）。
        #[inline]
        pub fn angle(self) -> f64 {
            self.0.y.atan2(self.0.x)
        }

        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Vector2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    /// 轴对齐边界框，用于估算图纸范围与视口取景。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        pub fn include_point(&mut self, point: Point2) {
            if !point.is_finite() {
                return;
            }
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            let min_vec = self.min.as_vec2().min(point.as_vec2());
            let max_vec = self.max.as_vec2().max(point.as_vec2());
            self.min = Point2::from_vec(min_vec);
            self.max = Point2::from_vec(max_vec);
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        #[inline]
        pub fn width(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.x() - self.min.x()
            }
        }

        #[inline]
        pub fn height(&self) -> f64 {
            if self.is_empty() {
                0.0
            } else {
                self.max.y() - self.min.y()
            }
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
            Point2::from_vec(center)
        }
    }
}

pub mod units {
    use std::fmt;
    use std::str::FromStr;

    use serde::{Deserialize, Serialize};

    pub const MM_PER_INCH: f64 = 25.4;

    /// 图纸单位。DXF 本身不可靠地携带单位，因此由用户选择。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum Units {
        #[default]
        #[serde(rename = "mm")]
        Millimeters,
        #[serde(rename = "in")]
        Inches,
    }

    impl Units {
        /// 将图纸单位下的长度换算为毫米。
        #[inline]
        pub fn to_mm(self, value: f64) -> f64 {
            match self {
                Units::Millimeters => value,
                Units::Inches => value * MM_PER_INCH,
            }
        }

        pub fn label(self) -> &'static str {
            match self {
                Units::Millimeters => "mm",
                Units::Inches => "in",
            }
        }
    }

    impl fmt::Display for Units {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.label())
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    #[error("unknown unit `{0}` (expected `mm` or `in`)")]
    pub struct ParseUnitsError(pub String);

    impl FromStr for Units {
        type Err = ParseUnitsError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.trim().to_ascii_lowercase().as_str() {
                "mm" | "millimeters" | "millimetres" => Ok(Units::Millimeters),
                "in" | "inch" | "inches" => Ok(Units::Inches),
                other => Err(ParseUnitsError(other.to_string())),
            }
        }
    }
}

pub mod raw {
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Point2, Vector2};

    /// 外部 DXF 解析器给出的坐标，多余字段（z、bulge 等）被忽略。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct RawPoint {
        pub x: f64,
        pub y: f64,
    }

    impl RawPoint {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self { x, y }
        }

        #[inline]
        pub fn to_point(self) -> Point2 {
            Point2::new(self.x, self.y)
        }

        #[inline]
        pub fn to_vector(self) -> Vector2 {
            Vector2::new(self.x, self.y)
        }
    }

    /// 解析器输出的松散实体记录。
    ///
    /// 字段形状与常见 DXF→JSON 转换工具的输出一致：所有几何字段均可能缺失，
    /// 由 [`crate::drawing::Entity::from_raw`] 负责校验并转换为强类型实体。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RawEntity {
        #[serde(rename = "type")]
        pub kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub layer: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub vertices: Vec<RawPoint>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub center: Option<RawPoint>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub radius: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub start_angle: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub end_angle: Option<f64>,
        #[serde(default)]
        pub shape: bool,
        #[serde(default)]
        pub closed: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub control_points: Vec<RawPoint>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub major_axis_end_point: Option<RawPoint>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub axis_ratio: Option<f64>,
    }

    impl RawEntity {
        pub fn new(kind: impl Into<String>) -> Self {
            Self {
                kind: kind.into(),
                ..Self::default()
            }
        }

        /// 多段线闭合标志：`shape` 来自 LWPOLYLINE，`closed` 来自其它解析器。
        #[inline]
        pub fn is_closed(&self) -> bool {
            self.shape || self.closed
        }
    }
}

pub mod drawing {
    use std::f64::consts::TAU;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    use crate::geometry::{Bounds2D, Point2, Vector2};
    use crate::raw::{RawEntity, RawPoint};
    use crate::units::Units;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
    }

    /// 圆弧实体，角度以弧度储存，按逆时针方向从起始角扫到终止角。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle: f64,
        pub end_angle: f64,
    }

    impl Arc {
        /// 归一化扫掠角：`end - start`，为负时补一个整圆。
        pub fn sweep(&self) -> f64 {
            let sweep = self.end_angle - self.start_angle;
            if sweep < 0.0 { sweep + TAU } else { sweep }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<Point2>,
        pub is_closed: bool,
    }

    /// 样条仅保留控制点；长度与范围都以控制多边形近似。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Spline {
        pub control_points: Vec<Point2>,
    }

    /// 椭圆实体，主轴端点相对圆心给出，`ratio` 为短轴/长轴之比。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Ellipse {
        pub center: Point2,
        pub major_axis: Vector2,
        pub ratio: f64,
    }

    impl Ellipse {
        #[inline]
        pub fn major_radius(&self) -> f64 {
            self.major_axis.length()
        }

        #[inline]
        pub fn minor_radius(&self) -> f64 {
            self.major_radius() * self.ratio
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct UnsupportedEntity {
        pub kind: String,
    }

    /// 已知类型但缺少必需字段或含非有限坐标的实体。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct MalformedEntity {
        pub kind: String,
        pub reason: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Circle(Circle),
        Arc(Arc),
        Polyline(Polyline),
        Spline(Spline),
        Ellipse(Ellipse),
        Unsupported(UnsupportedEntity),
        Malformed(MalformedEntity),
    }

    impl Entity {
        pub fn kind(&self) -> &str {
            match self {
                Entity::Line(_) => "LINE",
                Entity::Circle(_) => "CIRCLE",
                Entity::Arc(_) => "ARC",
                Entity::Polyline(_) => "POLYLINE",
                Entity::Spline(_) => "SPLINE",
                Entity::Ellipse(_) => "ELLIPSE",
                Entity::Unsupported(entity) => &entity.kind,
                Entity::Malformed(entity) => &entity.kind,
            }
        }

        /// 是否为可计算长度/可绘制的几何实体。
        #[inline]
        pub fn is_geometric(&self) -> bool {
            !matches!(self, Entity::Unsupported(_) | Entity::Malformed(_))
        }

        /// 将解析器记录转换为强类型实体。永不失败：缺字段的记录变为 `Malformed`，
        /// 未知类型变为 `Unsupported`，以便后续按实体隔离处理。
        pub fn from_raw(raw: &RawEntity) -> Entity {
            let kind = raw.kind.trim().to_ascii_uppercase();
            let converted = match kind.as_str() {
                "LINE" => line_from_raw(raw),
                "CIRCLE" => circle_from_raw(raw),
                "ARC" => arc_from_raw(raw),
                "LWPOLYLINE" | "POLYLINE" => Ok(Entity::Polyline(Polyline {
                    vertices: points(&raw.vertices),
                    is_closed: raw.is_closed(),
                })),
                "SPLINE" => Ok(Entity::Spline(Spline {
                    control_points: points(&raw.control_points),
                })),
                "ELLIPSE" => ellipse_from_raw(raw),
                _ => return Entity::Unsupported(UnsupportedEntity { kind }),
            };
            match converted.and_then(validate_finite) {
                Ok(entity) => entity,
                Err(reason) => Entity::Malformed(MalformedEntity { kind, reason }),
            }
        }

        /// 计算实体的 2D 范围。
        ///
        /// 圆弧按整圆取景（`center ± radius`），可能大于实际弧段；椭圆按长半轴的圆取景，
        /// 样条取控制点。不含几何信息的实体返回 `None`。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match self {
                Entity::Line(line) => {
                    bounds.include_point(line.start);
                    bounds.include_point(line.end);
                }
                Entity::Circle(Circle { center, radius })
                | Entity::Arc(Arc { center, radius, .. }) => {
                    include_radius(&mut bounds, *center, radius.abs());
                }
                Entity::Ellipse(ellipse) => {
                    include_radius(&mut bounds, ellipse.center, ellipse.major_radius());
                }
                Entity::Polyline(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(*vertex);
                    }
                }
                Entity::Spline(spline) => {
                    for point in &spline.control_points {
                        bounds.include_point(*point);
                    }
                }
                Entity::Unsupported(_) | Entity::Malformed(_) => {}
            }
            if bounds.is_empty() { None } else { Some(bounds) }
        }
    }

    fn include_radius(bounds: &mut Bounds2D, center: Point2, radius: f64) {
        bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
        bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
    }

    fn points(raw: &[RawPoint]) -> Vec<Point2> {
        raw.iter().map(|point| point.to_point()).collect()
    }

    fn line_from_raw(raw: &RawEntity) -> Result<Entity, String> {
        match raw.vertices.as_slice() {
            [start, end, ..] => Ok(Entity::Line(Line {
                start: start.to_point(),
                end: end.to_point(),
            })),
            other => Err(format!("LINE 需要两个端点，实际 {} 个", other.len())),
        }
    }

    fn circle_from_raw(raw: &RawEntity) -> Result<Entity, String> {
        let center = raw.center.ok_or("CIRCLE 缺少圆心")?;
        let radius = raw.radius.ok_or("CIRCLE 缺少半径")?;
        if radius < 0.0 {
            return Err(format!("CIRCLE 半径为负数: {radius}"));
        }
        Ok(Entity::Circle(Circle {
            center: center.to_point(),
            radius,
        }))
    }

    fn arc_from_raw(raw: &RawEntity) -> Result<Entity, String> {
        let center = raw.center.ok_or("ARC 缺少圆心")?;
        let radius = raw.radius.ok_or("ARC 缺少半径")?;
        let start_angle = raw.start_angle.ok_or("ARC 缺少起始角")?;
        let end_angle = raw.end_angle.ok_or("ARC 缺少终止角")?;
        if radius < 0.0 {
            return Err(format!("ARC 半径为负数: {radius}"));
        }
        Ok(Entity::Arc(Arc {
            center: center.to_point(),
            radius,
            start_angle,
            end_angle,
        }))
    }

    fn ellipse_from_raw(raw: &RawEntity) -> Result<Entity, String> {
        let center = raw.center.ok_or("ELLIPSE 缺少圆心")?;
        let major = raw.major_axis_end_point.ok_or("ELLIPSE 缺少主轴端点")?;
        let ratio = raw.axis_ratio.unwrap_or(1.0);
        if ratio <= 0.0 {
            return Err(format!("ELLIPSE 半径比必须为正数，实际为 {ratio}"));
        }
        Ok(Entity::Ellipse(Ellipse {
            center: center.to_point(),
            major_axis: major.to_vector(),
            ratio,
        }))
    }

    fn validate_finite(entity: Entity) -> Result<Entity, String> {
        let finite = match &entity {
            Entity::Line(line) => line.start.is_finite() && line.end.is_finite(),
            Entity::Circle(circle) => circle.center.is_finite() && circle.radius.is_finite(),
            Entity::Arc(arc) => {
                arc.center.is_finite()
                    && arc.radius.is_finite()
                    && arc.start_angle.is_finite()
                    && arc.end_angle.is_finite()
            }
            Entity::Polyline(polyline) => polyline.vertices.iter().all(|v| v.is_finite()),
            Entity::Spline(spline) => spline.control_points.iter().all(|p| p.is_finite()),
            Entity::Ellipse(ellipse) => {
                ellipse.center.is_finite()
                    && ellipse.major_axis.is_finite()
                    && ellipse.ratio.is_finite()
            }
            Entity::Unsupported(_) | Entity::Malformed(_) => true,
        };
        if finite {
            Ok(entity)
        } else {
            Err(format!("{} 含有非有限坐标", entity.kind()))
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum LoadError {
        #[error("drawing contains no entities")]
        Empty,
        #[error("none of the {count} entities could be read")]
        AllMalformed { count: usize },
    }

    /// 有序实体序列加单位标志。实体顺序即渲染与空行程估算的遍历顺序。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct Drawing {
        entities: Vec<Entity>,
        units: Units,
    }

    impl Drawing {
        pub fn new(entities: Vec<Entity>, units: Units) -> Self {
            Self { entities, units }
        }

        #[inline]
        pub fn entities(&self) -> &[Entity] {
            &self.entities
        }

        #[inline]
        pub fn units(&self) -> Units {
            self.units
        }

        #[inline]
        pub fn set_units(&mut self, units: Units) {
            self.units = units;
        }

        #[inline]
        pub fn len(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.entities.is_empty()
        }

        /// 全图范围（图纸单位）。没有任何实体贡献坐标时返回 `None`。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            let mut has = false;
            for entity in &self.entities {
                if let Some(entity_bounds) = entity.bounds() {
                    bounds.include_bounds(&entity_bounds);
                    has = true;
                }
            }
            if has { Some(bounds) } else { None }
        }
    }

    /// 校验解析器输出并构建 [`Drawing`]。
    ///
    /// 空序列与“全部实体都无法读取”视为无效输入；个别缺字段的实体以 `Malformed`
    /// 形式保留，由下游按实体跳过。
    pub fn load_drawing(raw_entities: &[RawEntity], units: Units) -> Result<Drawing, LoadError> {
        if raw_entities.is_empty() {
            return Err(LoadError::Empty);
        }
        let entities: Vec<Entity> = raw_entities.iter().map(Entity::from_raw).collect();
        if entities
            .iter()
            .all(|entity| matches!(entity, Entity::Malformed(_)))
        {
            return Err(LoadError::AllMalformed {
                count: entities.len(),
            });
        }
        Ok(Drawing::new(entities, units))
    }

}
