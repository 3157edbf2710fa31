//! 材料/厚度 → 切割速度（m/s）的离散目录。

use crate::errors::ConfigurationError;

const THICKNESS_TOLERANCE: f64 = 1e-9;

/// 目录中的一档厚度。`label` 保留原始写法（如 `"2.5"`），用于展示与配置回写。
#[derive(Debug, Clone, PartialEq)]
pub struct ThicknessRate {
    pub label: String,
    pub thickness_mm: f64,
    pub speed_m_per_s: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRates {
    pub name: String,
    pub display_name: String,
    rates: Vec<ThicknessRate>,
}

impl MaterialRates {
    /// 按厚度升序排列的目录。
    #[inline]
    pub fn rates(&self) -> &[ThicknessRate] {
        &self.rates
    }

    pub fn thickness_labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.rates.iter().map(|rate| rate.label.as_str())
    }

    #[inline]
    pub fn first(&self) -> Option<&ThicknessRate> {
        self.rates.first()
    }

    /// 按数值匹配厚度，`"3"` 与 `"3.0"` 视为同一档。
    pub fn rate(&self, thickness: &str) -> Option<&ThicknessRate> {
        let value = parse_thickness(thickness)?;
        self.rates
            .iter()
            .find(|rate| (rate.thickness_mm - value).abs() < THICKNESS_TOLERANCE)
    }

    #[inline]
    pub fn offers(&self, thickness: &str) -> bool {
        self.rate(thickness).is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    materials: Vec<MaterialRates>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 内置速度表（hierro / inox / aluminio / galvanizado）。
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (name, display_name, rates) in BUILTIN {
            // 内置数据全部为正数，插入不会失败
            let _ = table.insert_material(
                name,
                display_name,
                rates.iter().map(|(label, speed)| (label.to_string(), *speed)),
            );
        }
        table
    }

    /// 新增或替换一种材料。任一速度非正或厚度无法解析时拒绝整种材料，表保持不变。
    pub fn insert_material<I>(
        &mut self,
        name: &str,
        display_name: &str,
        rates: I,
    ) -> Result<(), ConfigurationError>
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut collected = Vec::new();
        for (label, speed) in rates {
            let thickness_mm = parse_thickness(&label).ok_or_else(|| {
                ConfigurationError::UnknownThickness {
                    material: name.to_string(),
                    thickness: label.clone(),
                }
            })?;
            if !(speed.is_finite() && speed > 0.0) {
                return Err(ConfigurationError::InvalidSpeed {
                    material: name.to_string(),
                    thickness: label,
                    speed,
                });
            }
            collected.push(ThicknessRate {
                label,
                thickness_mm,
                speed_m_per_s: speed,
            });
        }
        if collected.is_empty() {
            return Err(ConfigurationError::EmptyCatalog(name.to_string()));
        }
        collected.sort_by(|a, b| a.thickness_mm.total_cmp(&b.thickness_mm));

        let material = MaterialRates {
            name: name.to_string(),
            display_name: display_name.to_string(),
            rates: collected,
        };
        match self.materials.iter_mut().find(|m| m.name == name) {
            Some(existing) => *existing = material,
            None => self.materials.push(material),
        }
        Ok(())
    }

    pub fn materials(&self) -> impl Iterator<Item = &MaterialRates> {
        self.materials.iter()
    }

    pub fn material(&self, name: &str) -> Option<&MaterialRates> {
        self.materials.iter().find(|m| m.name == name)
    }

    /// 查询切割速度；目录之外的组合返回配置错误而非 panic。
    pub fn speed(&self, material: &str, thickness: &str) -> Result<f64, ConfigurationError> {
        let rates = self
            .material(material)
            .ok_or_else(|| ConfigurationError::UnknownMaterial(material.to_string()))?;
        let rate = rates
            .rate(thickness)
            .ok_or_else(|| ConfigurationError::UnknownThickness {
                material: material.to_string(),
                thickness: thickness.to_string(),
            })?;
        Ok(rate.speed_m_per_s)
    }
}

fn parse_thickness(label: &str) -> Option<f64> {
    label
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

/// 厚度选项的展示文本，例如 `"3"` → `"3.0 mm"`。
pub fn format_thickness_label(label: &str) -> String {
    match parse_thickness(label) {
        Some(value) => format!("{value:.1} mm"),
        None => format!("{label} mm"),
    }
}

type BuiltinMaterial = (&'static str, &'static str, &'static [(&'static str, f64)]);

const BUILTIN: [BuiltinMaterial; 4] = [
    (
        "hierro",
        "HIERRO NEGRO",
        &[
            ("0.5", 0.25),
            ("0.8", 0.24),
            ("1", 0.233),
            ("1.2", 0.22),
            ("1.5", 0.20),
            ("2", 0.15),
            ("2.5", 0.13),
            ("3", 0.117),
            ("4", 0.08),
            ("5", 0.02),
            ("6", 0.015),
            ("8", 0.008),
            ("10", 0.003),
            ("12", 0.002),
            ("15", 0.00167),
            ("20", 0.001),
        ],
    ),
    (
        "inox",
        "ACERO INOXIDABLE",
        &[
            ("0.5", 0.025),
            ("0.8", 0.024),
            ("1", 0.023),
            ("1.2", 0.02),
            ("1.5", 0.015),
            ("2", 0.01),
            ("2.5", 0.008),
            ("3", 0.0067),
            ("4", 0.005),
            ("5", 0.0038),
            ("6", 0.003),
            ("8", 0.0025),
            ("10", 0.0022),
            ("12", 0.0018),
            ("15", 0.0013),
            ("20", 0.00075),
        ],
    ),
    (
        "aluminio",
        "ALUMINIO",
        &[
            ("0.5", 0.022),
            ("0.8", 0.021),
            ("1", 0.02),
            ("1.2", 0.018),
            ("1.5", 0.016),
            ("2", 0.014),
            // 2.5 与 3 mm 的数值沿用现行价目表
            ("2.5", 0.155),
            ("3", 0.15),
            ("4", 0.01),
            ("5", 0.0058),
            ("6", 0.0045),
            ("8", 0.0037),
            ("10", 0.0033),
            ("12", 0.0028),
            ("15", 0.0022),
        ],
    ),
    (
        "galvanizado",
        "GALVANIZADO",
        &[
            ("0.5", 0.018),
            ("0.8", 0.017),
            ("1", 0.016),
            ("1.2", 0.014),
            ("1.5", 0.012),
            ("2", 0.011),
            ("2.5", 0.009),
            ("3", 0.008),
            ("4", 0.006),
            ("5", 0.0047),
            ("6", 0.0037),
            ("8", 0.003),
            ("10", 0.0027),
            ("12", 0.0022),
            ("15", 0.0016),
        ],
    ),
];
