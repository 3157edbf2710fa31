use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cutquote_core::units::Units;
use serde::Deserialize;
use thiserror::Error;

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub defaults: SelectionDefaults,
    /// 覆盖或新增材料的切割速度表，键为材料名。
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialConfig>,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `CUTQUOTE_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os("CUTQUOTE_CONFIG") {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 报价参数：每分钟机时费用与最低收费（含上料与穿孔）。
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "PricingConfig::default_cost_per_minute")]
    pub cost_per_minute: f64,
    #[serde(default = "PricingConfig::default_minimum_price")]
    pub minimum_price: f64,
    #[serde(default = "PricingConfig::default_currency_symbol")]
    pub currency_symbol: String,
}

impl PricingConfig {
    fn default_cost_per_minute() -> f64 {
        5.0
    }

    fn default_minimum_price() -> f64 {
        50.0
    }

    fn default_currency_symbol() -> String {
        "$".to_string()
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            cost_per_minute: Self::default_cost_per_minute(),
            minimum_price: Self::default_minimum_price(),
            currency_symbol: Self::default_currency_symbol(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "PreviewConfig::default_width")]
    pub width: u32,
    #[serde(default = "PreviewConfig::default_height")]
    pub height: u32,
    #[serde(default = "PreviewConfig::default_background")]
    pub background: String,
    #[serde(default = "PreviewConfig::default_stroke")]
    pub stroke: String,
    #[serde(default = "PreviewConfig::default_stroke_width")]
    pub stroke_width: f32,
}

impl PreviewConfig {
    fn default_width() -> u32 {
        600
    }

    fn default_height() -> u32 {
        400
    }

    fn default_background() -> String {
        "#000000".to_string()
    }

    fn default_stroke() -> String {
        "#E6007E".to_string()
    }

    fn default_stroke_width() -> f32 {
        2.0
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            background: Self::default_background(),
            stroke: Self::default_stroke(),
            stroke_width: Self::default_stroke_width(),
        }
    }
}

/// 启动时的单位、材料与厚度选择。
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionDefaults {
    #[serde(default)]
    pub units: Units,
    #[serde(default = "SelectionDefaults::default_material")]
    pub material: String,
    #[serde(default = "SelectionDefaults::default_thickness")]
    pub thickness: String,
}

impl SelectionDefaults {
    fn default_material() -> String {
        "hierro".to_string()
    }

    fn default_thickness() -> String {
        "3".to_string()
    }
}

impl Default for SelectionDefaults {
    fn default() -> Self {
        Self {
            units: Units::default(),
            material: Self::default_material(),
            thickness: Self::default_thickness(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialConfig {
    #[serde(default)]
    pub display_name: Option<String>,
    /// 厚度标签（毫米）到切割速度（m/s）。
    pub rates: BTreeMap<String, f64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_price_list() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.logging.level, "info");
        assert!((cfg.pricing.cost_per_minute - 5.0).abs() < f64::EPSILON);
        assert!((cfg.pricing.minimum_price - 50.0).abs() < f64::EPSILON);
        assert_eq!(cfg.preview.width, 600);
        assert_eq!(cfg.preview.height, 400);
        assert_eq!(cfg.defaults.units, Units::Millimeters);
        assert_eq!(cfg.defaults.material, "hierro");
        assert!(cfg.materials.is_empty());
    }

    #[test]
    fn load_from_temp_file() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(
            file,
            r##"
            [logging]
            level = "debug"

            [pricing]
            cost_per_minute = 7.5

            [preview]
            stroke = "#00FF00"

            [defaults]
            units = "in"
            material = "inox"
            thickness = "1.5"

            [materials.acrilico]
            display_name = "ACRÍLICO"
            rates = {{ "3" = 0.05, "10" = 0.01 }}
            "##
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("load config");
        assert_eq!(cfg.logging.level, "debug");
        assert!((cfg.pricing.cost_per_minute - 7.5).abs() < f64::EPSILON);
        assert!((cfg.pricing.minimum_price - 50.0).abs() < f64::EPSILON);
        assert_eq!(cfg.preview.stroke, "#00FF00");
        assert_eq!(cfg.preview.width, 600);
        assert_eq!(cfg.defaults.units, Units::Inches);
        assert_eq!(cfg.defaults.thickness, "1.5");
        let acrylic = cfg.materials.get("acrilico").expect("custom material");
        assert_eq!(acrylic.display_name.as_deref(), Some("ACRÍLICO"));
        assert_eq!(acrylic.rates.len(), 2);
        assert_eq!(acrylic.rates.get("10"), Some(&0.01));
    }

    #[test]
    fn parse_error_reports_path() {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "[pricing]\ncost_per_minute = \"cheap\"").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
