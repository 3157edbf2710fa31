pub mod command;
pub mod length;
pub mod quote;
pub mod rapid;
pub mod rates;
pub mod render;
pub mod view;

pub mod errors {
    use cutquote_core::drawing::LoadError;
    use thiserror::Error;

    /// 速度表或价格参数无法给出有效结果。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum ConfigurationError {
        #[error("未知材料: {0}")]
        UnknownMaterial(String),
        #[error("材料 {material} 没有 {thickness} mm 的厚度档")]
        UnknownThickness { material: String, thickness: String },
        #[error("材料 {material} 厚度 {thickness} 的切割速度无效: {speed}")]
        InvalidSpeed {
            material: String,
            thickness: String,
            speed: f64,
        },
        #[error("材料 {0} 没有任何厚度档")]
        EmptyCatalog(String),
        #[error("切割速度必须为正数: {0}")]
        NonPositiveSpeed(f64),
        #[error("价格参数无效: 每分钟 {cost_per_minute}, 最低 {minimum_price}")]
        InvalidPricing {
            cost_per_minute: f64,
            minimum_price: f64,
        },
    }

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum EngineError {
        #[error("尚未加载图纸")]
        NoDrawing,
        #[error("图纸无效: {0}")]
        InvalidInput(#[from] LoadError),
        #[error(transparent)]
        Configuration(#[from] ConfigurationError),
        #[error("图纸没有可定位的实体，无法取景")]
        NothingToFrame,
    }
}

pub mod diagnostics {
    use std::fmt;

    use serde::Serialize;

    /// 长度估算时被跳过的实体。
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    #[serde(tag = "warning", rename_all = "snake_case")]
    pub enum EntityWarning {
        Unsupported { index: usize, kind: String },
        Malformed {
            index: usize,
            kind: String,
            reason: String,
        },
    }

    impl EntityWarning {
        pub fn index(&self) -> usize {
            match self {
                EntityWarning::Unsupported { index, .. } | EntityWarning::Malformed { index, .. } => {
                    *index
                }
            }
        }
    }

    impl fmt::Display for EntityWarning {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                EntityWarning::Unsupported { index, kind } => {
                    write!(f, "#{index} {kind}: 不支持的实体类型，未计入长度")
                }
                EntityWarning::Malformed {
                    index,
                    kind,
                    reason,
                } => write!(f, "#{index} {kind}: {reason}"),
            }
        }
    }
}

pub mod session {
    use cutquote_core::drawing::{self, Drawing};
    use cutquote_core::geometry::Point2;
    use cutquote_core::raw::RawEntity;
    use cutquote_core::units::Units;
    use serde::Serialize;
    use tracing::{debug, info, warn};

    use crate::diagnostics::EntityWarning;
    use crate::errors::{ConfigurationError, EngineError};
    use crate::length::estimate_length;
    use crate::quote::{PriceList, quote};
    use crate::rapid::rapid_distance;
    use crate::rates::RateTable;
    use crate::render::{DisplayList, build_display_list};
    use crate::view::{ViewState, ViewTransform, ViewportSize, ZoomDirection};

    /// 当前的单位、材料与厚度选择。
    #[derive(Debug, Clone, PartialEq)]
    pub struct Selections {
        pub units: Units,
        pub material: String,
        pub thickness: String,
    }

    impl Default for Selections {
        fn default() -> Self {
            Self {
                units: Units::Millimeters,
                material: "hierro".to_string(),
                thickness: "3".to_string(),
            }
        }
    }

    /// 一次报价的完整结果。
    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct Quote {
        pub material: String,
        pub thickness: String,
        pub total_length_mm: f64,
        pub rapid_distance_mm: f64,
        pub width_mm: f64,
        pub height_mm: f64,
        pub time_minutes: u64,
        pub price: f64,
        pub warnings: Vec<EntityWarning>,
    }

    /// 会话持有图纸、视图状态与选择，并缓存最近一次报价。
    #[derive(Debug)]
    pub struct Session {
        rates: RateTable,
        prices: PriceList,
        drawing: Option<Drawing>,
        view: ViewState,
        selections: Selections,
        last_quote: Option<Quote>,
    }

    impl Session {
        /// 创建会话。若所选厚度不在材料目录中，回退到该材料的第一档。
        pub fn new(
            rates: RateTable,
            prices: PriceList,
            selections: Selections,
        ) -> Result<Self, EngineError> {
            let material = selections.material.clone();
            let mut session = Self {
                rates,
                prices,
                drawing: None,
                view: ViewState::default(),
                selections,
                last_quote: None,
            };
            session.set_material(&material)?;
            Ok(session)
        }

        fn offers(&self, material: &str, thickness: &str) -> bool {
            self.rates
                .material(material)
                .is_some_and(|rates| rates.offers(thickness))
        }

        /// 校验并载入解析器输出。失败时保留原有图纸与视图。
        pub fn load_drawing(&mut self, raw_entities: &[RawEntity]) -> Result<&Drawing, EngineError> {
            let drawing = drawing::load_drawing(raw_entities, self.selections.units)?;
            let skipped = drawing
                .entities()
                .iter()
                .filter(|entity| !entity.is_geometric())
                .count();
            info!(entity_count = drawing.len(), skipped, "图纸已载入");
            if skipped > 0 {
                warn!(skipped, "部分实体不参与长度计算");
            }

            self.view = ViewState::default();
            self.last_quote = None;
            Ok(self.drawing.insert(drawing))
        }

        /// 清除图纸、报价与视图状态。选择保持不变。
        pub fn clear(&mut self) {
            self.drawing = None;
            self.last_quote = None;
            self.view = ViewState::default();
            debug!("会话已清空");
        }

        #[inline]
        pub fn drawing(&self) -> Option<&Drawing> {
            self.drawing.as_ref()
        }

        #[inline]
        pub fn selections(&self) -> &Selections {
            &self.selections
        }

        #[inline]
        pub fn rates(&self) -> &RateTable {
            &self.rates
        }

        #[inline]
        pub fn last_quote(&self) -> Option<&Quote> {
            self.last_quote.as_ref()
        }

        pub fn set_units(&mut self, units: Units) {
            self.selections.units = units;
            if let Some(drawing) = self.drawing.as_mut() {
                drawing.set_units(units);
            }
        }

        /// 切换材料；当前厚度不在新材料目录中时改为第一档。
        pub fn set_material(&mut self, material: &str) -> Result<(), EngineError> {
            let rates = self
                .rates
                .material(material)
                .ok_or_else(|| ConfigurationError::UnknownMaterial(material.to_string()))?;
            if !rates.offers(&self.selections.thickness) {
                let first = rates
                    .first()
                    .ok_or_else(|| ConfigurationError::EmptyCatalog(material.to_string()))?;
                self.selections.thickness = first.label.clone();
            }
            self.selections.material = material.to_string();
            Ok(())
        }

        pub fn set_thickness(&mut self, thickness: &str) -> Result<(), EngineError> {
            if !self.offers(&self.selections.material, thickness) {
                return Err(ConfigurationError::UnknownThickness {
                    material: self.selections.material.clone(),
                    thickness: thickness.to_string(),
                }
                .into());
            }
            self.selections.thickness = thickness.to_string();
            Ok(())
        }

        /// 当前材料可选的厚度标签。
        pub fn thickness_options(&self) -> Vec<&str> {
            self.rates
                .material(&self.selections.material)
                .map(|rates| rates.thickness_labels().collect())
                .unwrap_or_default()
        }

        /// 按当前选择重新计算报价。配置错误时清除缓存的报价。
        pub fn recalculate(&mut self) -> Result<Quote, EngineError> {
            let drawing = self.drawing.as_ref().ok_or(EngineError::NoDrawing)?;
            let selections = &self.selections;

            let computed = self
                .rates
                .speed(&selections.material, &selections.thickness)
                .and_then(|speed| {
                    let length = estimate_length(drawing);
                    let rapid_mm = rapid_distance(drawing);
                    let priced = quote(length.length_mm, rapid_mm, speed, self.prices)?;
                    let (width_mm, height_mm) = drawing
                        .bounds()
                        .map(|bounds| {
                            (
                                drawing.units().to_mm(bounds.width()),
                                drawing.units().to_mm(bounds.height()),
                            )
                        })
                        .unwrap_or((0.0, 0.0));
                    Ok(Quote {
                        material: selections.material.clone(),
                        thickness: selections.thickness.clone(),
                        total_length_mm: length.length_mm,
                        rapid_distance_mm: rapid_mm,
                        width_mm,
                        height_mm,
                        time_minutes: priced.time_minutes,
                        price: priced.price,
                        warnings: length.warnings,
                    })
                });

            match computed {
                Ok(result) => {
                    info!(
                        material = %result.material,
                        thickness = %result.thickness,
                        length_mm = result.total_length_mm,
                        minutes = result.time_minutes,
                        price = result.price,
                        "报价已更新"
                    );
                    self.last_quote = Some(result.clone());
                    Ok(result)
                }
                Err(err) => {
                    warn!(error = %err, "报价失败");
                    self.last_quote = None;
                    Err(err.into())
                }
            }
        }

        #[inline]
        pub fn view(&self) -> ViewState {
            self.view
        }

        pub fn zoom(&mut self, direction: ZoomDirection, cursor: Point2) {
            self.view = self.view.zoomed(direction, cursor);
            debug!(zoom = self.view.zoom, "视图缩放");
        }

        pub fn pan(&mut self, dx: f64, dy: f64) {
            self.view = self.view.panned(dx, dy);
        }

        pub fn reset_view(&mut self) {
            self.view = ViewState::default();
        }

        pub fn view_transform(&self, viewport: ViewportSize) -> Result<ViewTransform, EngineError> {
            let drawing = self.drawing.as_ref().ok_or(EngineError::NoDrawing)?;
            ViewTransform::for_drawing(drawing, viewport, self.view).ok_or(EngineError::NothingToFrame)
        }

        /// 生成当前视图下的显示列表。
        pub fn render(&self, viewport: ViewportSize) -> Result<DisplayList, EngineError> {
            let transform = self.view_transform(viewport)?;
            let list = self
                .drawing
                .as_ref()
                .map(|drawing| build_display_list(drawing, &transform))
                .unwrap_or_default();
            for warning in &list.warnings {
                warn!(index = warning.index, kind = %warning.kind, reason = %warning.reason, "实体绘制失败");
            }
            Ok(list)
        }
    }

    impl Default for Session {
        fn default() -> Self {
            Self {
                rates: RateTable::builtin(),
                prices: PriceList::default(),
                drawing: None,
                view: ViewState::default(),
                selections: Selections::default(),
                last_quote: None,
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use cutquote_core::drawing::LoadError;
        use cutquote_core::raw::RawPoint;

        use super::*;

        fn raw_line(x0: f64, y0: f64, x1: f64, y1: f64) -> RawEntity {
            RawEntity {
                vertices: vec![RawPoint::new(x0, y0), RawPoint::new(x1, y1)],
                ..RawEntity::new("LINE")
            }
        }

        fn raw_circle(x: f64, y: f64, radius: f64) -> RawEntity {
            RawEntity {
                center: Some(RawPoint::new(x, y)),
                radius: Some(radius),
                ..RawEntity::new("CIRCLE")
            }
        }

        #[test]
        fn single_short_line_costs_minimum() {
            let mut session = Session::default();
            session
                .load_drawing(&[raw_line(0.0, 0.0, 100.0, 0.0)])
                .expect("load drawing");
            let quote = session.recalculate().expect("quote");
            assert!((quote.total_length_mm - 100.0).abs() < 1e-9);
            assert_eq!(quote.rapid_distance_mm, 0.0);
            assert_eq!(quote.time_minutes, 1);
            assert_eq!(quote.price, 50.0);
            assert!((quote.width_mm - 100.0).abs() < 1e-9);
            assert_eq!(quote.height_mm, 0.0);
            assert_eq!(session.last_quote(), Some(&quote));
        }

        #[test]
        fn empty_drawing_is_rejected_and_state_kept() {
            let mut session = Session::default();
            session.load_drawing(&[raw_circle(0.0, 0.0, 5.0)]).unwrap();
            session.pan(10.0, 10.0);

            let err = session.load_drawing(&[]).unwrap_err();
            assert_eq!(err, EngineError::InvalidInput(LoadError::Empty));
            assert_eq!(session.drawing().map(Drawing::len), Some(1));
            assert_eq!(session.view().offset.x(), 10.0);
        }

        #[test]
        fn all_malformed_drawing_is_rejected() {
            let mut session = Session::default();
            let err = session
                .load_drawing(&[RawEntity::new("CIRCLE"), RawEntity::new("ARC")])
                .unwrap_err();
            assert!(matches!(
                err,
                EngineError::InvalidInput(LoadError::AllMalformed { count: 2 })
            ));
            assert!(session.drawing().is_none());
        }

        #[test]
        fn unsupported_entities_are_reported_in_quote() {
            let mut session = Session::default();
            session
                .load_drawing(&[raw_line(0.0, 0.0, 10.0, 0.0), RawEntity::new("TEXT")])
                .unwrap();
            let quote = session.recalculate().unwrap();
            assert_eq!(quote.warnings.len(), 1);
            assert_eq!(quote.warnings[0].index(), 1);
        }

        #[test]
        fn unit_toggle_scales_length() {
            let mut session = Session::default();
            session
                .load_drawing(&[raw_line(0.0, 0.0, 1.0, 0.0)])
                .unwrap();
            let mm = session.recalculate().unwrap();
            session.set_units(Units::Inches);
            let inches = session.recalculate().unwrap();
            assert!((mm.total_length_mm - 1.0).abs() < 1e-9);
            assert!((inches.total_length_mm - 25.4).abs() < 1e-9);
            assert!((inches.width_mm - 25.4).abs() < 1e-9);
        }

        #[test]
        fn recalculate_without_drawing_fails() {
            let mut session = Session::default();
            assert_eq!(session.recalculate().unwrap_err(), EngineError::NoDrawing);
        }

        #[test]
        fn material_change_falls_back_to_first_thickness() {
            let mut session = Session::default();
            session.set_thickness("20").unwrap();
            session.set_material("aluminio").unwrap();
            assert_eq!(session.selections().material, "aluminio");
            assert_eq!(session.selections().thickness, "0.5");

            session.set_thickness("3").unwrap();
            session.set_material("inox").unwrap();
            assert_eq!(session.selections().thickness, "3");
        }

        #[test]
        fn invalid_selections_are_configuration_errors() {
            let mut session = Session::default();
            assert!(matches!(
                session.set_material("madera"),
                Err(EngineError::Configuration(ConfigurationError::UnknownMaterial(_)))
            ));
            assert!(matches!(
                session.set_thickness("7"),
                Err(EngineError::Configuration(
                    ConfigurationError::UnknownThickness { .. }
                ))
            ));
            assert_eq!(session.selections(), &Selections::default());
        }

        #[test]
        fn new_session_validates_defaults() {
            let session = Session::new(
                RateTable::builtin(),
                PriceList::default(),
                Selections {
                    units: Units::Inches,
                    material: "galvanizado".to_string(),
                    thickness: "20".to_string(),
                },
            )
            .unwrap();
            assert_eq!(session.selections().units, Units::Inches);
            assert_eq!(session.selections().thickness, "0.5");
            assert_eq!(session.thickness_options().len(), 15);

            let err = Session::new(
                RateTable::builtin(),
                PriceList::default(),
                Selections {
                    material: "madera".to_string(),
                    ..Selections::default()
                },
            )
            .unwrap_err();
            assert!(matches!(err, EngineError::Configuration(_)));
        }

        #[test]
        fn loading_resets_view_and_quote() {
            let mut session = Session::default();
            session.load_drawing(&[raw_circle(0.0, 0.0, 5.0)]).unwrap();
            session.recalculate().unwrap();
            session.zoom(ZoomDirection::In, Point2::new(300.0, 200.0));
            session.pan(4.0, 4.0);

            session
                .load_drawing(&[raw_circle(0.0, 0.0, 5.0), raw_circle(20.0, 0.0, 5.0)])
                .unwrap();
            assert_eq!(session.view(), ViewState::default());
            assert!(session.last_quote().is_none());
        }

        #[test]
        fn render_requires_drawing() {
            let mut session = Session::default();
            let viewport = ViewportSize::new(600.0, 400.0);
            assert_eq!(session.render(viewport).unwrap_err(), EngineError::NoDrawing);

            session
                .load_drawing(&[raw_circle(0.0, 0.0, 5.0), RawEntity::new("ARC")])
                .unwrap();
            let list = session.render(viewport).unwrap();
            assert_eq!(list.commands.len(), 1);
            assert_eq!(list.warnings.len(), 1);

            session.clear();
            assert!(session.drawing().is_none());
            assert_eq!(session.render(viewport).unwrap_err(), EngineError::NoDrawing);
        }

        #[test]
        fn zoom_and_reset_view() {
            let mut session = Session::default();
            session.zoom(ZoomDirection::In, Point2::new(0.0, 0.0));
            assert!((session.view().zoom - 1.1).abs() < 1e-9);
            session.reset_view();
            assert_eq!(session.view(), ViewState::default());
        }
    }
}
