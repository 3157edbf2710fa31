use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use cutquote_config::AppConfig;
use cutquote_core::units::Units;
use cutquote_engine::quote::PriceList;
use cutquote_engine::rates::RateTable;
use cutquote_engine::session::{Selections, Session};
use cutquote_io::{entity_histogram, load_entities};
use tracing::{info, warn};

use crate::errors::FrontendError;

/// 命令行对配置默认值的覆盖。
#[derive(Debug, Clone, Default)]
pub struct SelectionOverrides {
    pub units: Option<Units>,
    pub material: Option<String>,
    pub thickness: Option<String>,
}

/// 已载入图纸的会话与文件元信息。
#[derive(Debug)]
pub struct LoadedDrawing {
    pub session: Session,
    pub path: PathBuf,
    pub histogram: BTreeMap<String, usize>,
}

/// 内置速度表叠加配置中的材料。
pub fn rate_table_from_config(config: &AppConfig) -> Result<RateTable, FrontendError> {
    let mut table = RateTable::builtin();
    for (name, material) in &config.materials {
        let display_name = material
            .display_name
            .clone()
            .or_else(|| table.material(name).map(|m| m.display_name.clone()))
            .unwrap_or_else(|| name.to_uppercase());
        table.insert_material(
            name,
            &display_name,
            material
                .rates
                .iter()
                .map(|(label, speed)| (label.clone(), *speed)),
        )?;
        info!(material = %name, thicknesses = material.rates.len(), "已载入自定义材料");
    }
    Ok(table)
}

/// 按配置与覆盖项创建空会话。
pub fn build_session(config: &AppConfig, overrides: &SelectionOverrides) -> Result<Session, FrontendError> {
    let rates = rate_table_from_config(config)?;
    let prices = PriceList::new(config.pricing.cost_per_minute, config.pricing.minimum_price)?;

    let requested_thickness = overrides
        .thickness
        .clone()
        .unwrap_or_else(|| config.defaults.thickness.clone());
    let selections = Selections {
        units: overrides.units.unwrap_or(config.defaults.units),
        material: overrides
            .material
            .clone()
            .unwrap_or_else(|| config.defaults.material.clone()),
        thickness: requested_thickness.clone(),
    };
    let session = Session::new(rates, prices, selections)?;

    if session.selections().thickness != requested_thickness {
        warn!(
            requested = %requested_thickness,
            material = %session.selections().material,
            used = %session.selections().thickness,
            "所选厚度不在材料目录中，已改用第一档"
        );
    }
    Ok(session)
}

/// 读取文件并载入会话。
pub fn load_into_session(path: &Path, mut session: Session) -> Result<LoadedDrawing, FrontendError> {
    let raw_entities = load_entities(path)?;
    let histogram = entity_histogram(&raw_entities);
    info!(path = %path.display(), ?histogram, "实体类型统计");
    session.load_drawing(&raw_entities)?;
    Ok(LoadedDrawing {
        session,
        path: path.to_path_buf(),
        histogram,
    })
}
