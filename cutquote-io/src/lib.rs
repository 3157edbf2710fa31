use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cutquote_core::raw::{RawEntity, RawPoint};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid DXF structure: {0}")]
    InvalidDocument(String),
    #[error("invalid entity JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// 外部解析器接口：把文件内容转换为松散的实体记录序列。
pub trait EntityLoader {
    fn load_str(&self, source: &str) -> Result<Vec<RawEntity>, IoError>;

    fn load(&self, path: &Path) -> Result<Vec<RawEntity>, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let entities = self.load_str(&data)?;
        info!(
            path = %path.display(),
            entity_count = entities.len(),
            "实体读取完成"
        );
        Ok(entities)
    }
}

/// ASCII DXF 读取器，仅处理 ENTITIES 段。
#[derive(Debug, Default, Clone, Copy)]
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }
}

impl EntityLoader for DxfFacade {
    fn load_str(&self, source: &str) -> Result<Vec<RawEntity>, IoError> {
        DxfParser::new(source)
            .parse()
            .map_err(|err| IoError::InvalidDocument(err.message))
    }
}

/// 读取 JSON 形式的实体列表：`{"entities": [...]}` 或直接为数组。
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFacade;

impl JsonFacade {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonDocument {
    Bare(Vec<RawEntity>),
    Parsed {
        #[serde(default)]
        entities: Option<Vec<RawEntity>>,
    },
}

impl EntityLoader for JsonFacade {
    fn load_str(&self, source: &str) -> Result<Vec<RawEntity>, IoError> {
        let document: JsonDocument = serde_json::from_str(source)?;
        Ok(match document {
            JsonDocument::Bare(entities) => entities,
            JsonDocument::Parsed { entities } => entities.unwrap_or_default(),
        })
    }
}

/// 按扩展名选择读取器。
pub fn load_entities(path: &Path) -> Result<Vec<RawEntity>, IoError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("dxf") => DxfFacade::new().load(path),
        Some("json") => JsonFacade::new().load(path),
        other => Err(IoError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

/// 统计各实体类型数量，按类型名排序。
pub fn entity_histogram(entities: &[RawEntity]) -> BTreeMap<String, usize> {
    let mut histogram = BTreeMap::new();
    for entity in entities {
        *histogram.entry(entity.kind.clone()).or_insert(0) += 1;
    }
    histogram
}

#[derive(Debug)]
struct DxfError {
    message: String,
}

impl DxfError {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    fn parse(mut self) -> Result<Vec<RawEntity>, DxfError> {
        let mut entities = Vec::new();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code == 999 {
                continue;
            }
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "ENTITIES" => self.parse_entities(&mut entities)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(entities)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, entities: &mut Vec<RawEntity>) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            let kind = value.trim().to_string();
            match kind.as_str() {
                "ENDSEC" => break,
                "SEQEND" | "VERTEX" => self.skip_entity_body()?,
                "LINE" => entities.push(self.parse_line()?),
                "CIRCLE" | "ARC" => entities.push(self.parse_circular(&kind)?),
                "ELLIPSE" => entities.push(self.parse_ellipse()?),
                "LWPOLYLINE" => entities.push(self.parse_lwpolyline()?),
                "POLYLINE" => entities.push(self.parse_polyline()?),
                "SPLINE" => entities.push(self.parse_spline()?),
                _ => {
                    debug!(kind = %kind, "跳过无几何规则的实体");
                    self.skip_entity_body()?;
                    entities.push(RawEntity::new(kind));
                }
            }
        }
        Ok(())
    }

    /// 读取实体体内的全部组码对，直到下一个组码 0。
    fn entity_body(&mut self, kind: &str) -> Result<Vec<(i32, String)>, DxfError> {
        let mut pairs = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value))?;
                    break;
                }
                Some(pair) => pairs.push(pair),
                None => return Err(DxfError::invalid(format!("{kind} 未正确结束"))),
            }
        }
        Ok(pairs)
    }

    fn parse_line(&mut self) -> Result<RawEntity, DxfError> {
        let mut entity = RawEntity::new("LINE");
        let mut start = PointSlot::default();
        let mut end = PointSlot::default();
        for (code, value) in self.entity_body("LINE")? {
            match code {
                8 => entity.layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut start.x, &value, "LINE 起点 X（组码 10）")?,
                20 => assign_coord(&mut start.y, &value, "LINE 起点 Y（组码 20）")?,
                11 => assign_coord(&mut end.x, &value, "LINE 终点 X（组码 11）")?,
                21 => assign_coord(&mut end.y, &value, "LINE 终点 Y（组码 21）")?,
                _ => {}
            }
        }
        // 缺失端点留给下游标记为 Malformed
        entity.vertices = [start.finish(), end.finish()].into_iter().flatten().collect();
        Ok(entity)
    }

    fn parse_circular(&mut self, kind: &str) -> Result<RawEntity, DxfError> {
        let mut entity = RawEntity::new(kind);
        let mut center = PointSlot::default();
        for (code, value) in self.entity_body(kind)? {
            match code {
                8 => entity.layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut center.x, &value, &format!("{kind} 圆心 X"))?,
                20 => assign_coord(&mut center.y, &value, &format!("{kind} 圆心 Y"))?,
                40 => assign_coord(&mut entity.radius, &value, &format!("{kind} 半径"))?,
                // DXF 以角度存储，转换为弧度
                50 => {
                    assign_coord(&mut entity.start_angle, &value, &format!("{kind} 起始角"))?;
                    entity.start_angle = entity.start_angle.map(f64::to_radians);
                }
                51 => {
                    assign_coord(&mut entity.end_angle, &value, &format!("{kind} 终止角"))?;
                    entity.end_angle = entity.end_angle.map(f64::to_radians);
                }
                _ => {}
            }
        }
        entity.center = center.finish();
        Ok(entity)
    }

    fn parse_ellipse(&mut self) -> Result<RawEntity, DxfError> {
        let mut entity = RawEntity::new("ELLIPSE");
        let mut center = PointSlot::default();
        let mut major = PointSlot::default();
        for (code, value) in self.entity_body("ELLIPSE")? {
            match code {
                8 => entity.layer = Some(value.trim().to_string()),
                10 => assign_coord(&mut center.x, &value, "ELLIPSE 圆心 X（组码 10）")?,
                20 => assign_coord(&mut center.y, &value, "ELLIPSE 圆心 Y（组码 20）")?,
                11 => assign_coord(&mut major.x, &value, "ELLIPSE 主轴向量 X（组码 11）")?,
                21 => assign_coord(&mut major.y, &value, "ELLIPSE 主轴向量 Y（组码 21）")?,
                40 => assign_coord(&mut entity.axis_ratio, &value, "ELLIPSE 半径比（组码 40）")?,
                _ => {}
            }
        }
        entity.center = center.finish();
        entity.major_axis_end_point = major.finish();
        Ok(entity)
    }

    fn parse_lwpolyline(&mut self) -> Result<RawEntity, DxfError> {
        let mut entity = RawEntity::new("LWPOLYLINE");
        let mut pending = PointSlot::default();
        for (code, value) in self.entity_body("LWPOLYLINE")? {
            match code {
                8 => entity.layer = Some(value.trim().to_string()),
                70 => {
                    let flag = parse_i32(&value, "LWPOLYLINE 标志（组码 70）")?;
                    entity.shape = flag & 0x01 == 0x01;
                }
                10 => {
                    assign_coord(&mut pending.x, &value, "LWPOLYLINE 顶点 X（组码 10）")?;
                    push_complete(&mut pending, &mut entity.vertices);
                }
                20 => {
                    assign_coord(&mut pending.y, &value, "LWPOLYLINE 顶点 Y（组码 20）")?;
                    push_complete(&mut pending, &mut entity.vertices);
                }
                _ => {}
            }
        }
        if pending.x.is_some() || pending.y.is_some() {
            return Err(DxfError::invalid(
                "LWPOLYLINE 顶点坐标成对出现（组码 10/20），检测到不完整的顶点",
            ));
        }
        Ok(entity)
    }

    /// 旧式 POLYLINE：头部之后跟随 VERTEX 序列并以 SEQEND 结束。
    fn parse_polyline(&mut self) -> Result<RawEntity, DxfError> {
        let mut entity = RawEntity::new("POLYLINE");
        let mut flags = 0;
        for (code, value) in self.entity_body("POLYLINE")? {
            match code {
                8 => entity.layer = Some(value.trim().to_string()),
                70 => flags = parse_i32(&value, "POLYLINE 标志（组码 70）")?,
                _ => {}
            }
        }
        entity.closed = flags & 0x01 != 0;
        let is_mesh = flags & (0x10 | 0x40) != 0;

        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "VERTEX" => {
                        let mut vertex = PointSlot::default();
                        for (code, value) in self.entity_body("VERTEX")? {
                            match code {
                                10 => assign_coord(&mut vertex.x, &value, "VERTEX X（组码 10）")?,
                                20 => assign_coord(&mut vertex.y, &value, "VERTEX Y（组码 20）")?,
                                _ => {}
                            }
                        }
                        if !is_mesh {
                            entity.vertices.extend(vertex.finish());
                        }
                    }
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value))?;
                        break;
                    }
                },
                Some(_) => continue,
                None => return Err(DxfError::invalid("POLYLINE 缺少 SEQEND")),
            }
        }

        if is_mesh {
            // 三维网格不属于切割轮廓
            return Ok(RawEntity::new("POLYLINE_MESH"));
        }
        Ok(entity)
    }

    fn parse_spline(&mut self) -> Result<RawEntity, DxfError> {
        let mut entity = RawEntity::new("SPLINE");
        let mut pending = PointSlot::default();
        for (code, value) in self.entity_body("SPLINE")? {
            match code {
                8 => entity.layer = Some(value.trim().to_string()),
                70 => {
                    let flags = parse_i32(&value, "SPLINE 类型标志（组码 70）")?;
                    entity.closed = flags & 0x01 != 0;
                }
                10 => {
                    assign_coord(&mut pending.x, &value, "SPLINE 控制点 X（组码 10）")?;
                    push_complete(&mut pending, &mut entity.control_points);
                }
                20 => {
                    assign_coord(&mut pending.y, &value, "SPLINE 控制点 Y（组码 20）")?;
                    push_complete(&mut pending, &mut entity.control_points);
                }
                _ => {}
            }
        }
        if let Some(x) = pending.x {
            return Err(DxfError::invalid(format!(
                "SPLINE 控制点 X={x} 缺少对应的 Y（组码 20）"
            )));
        }
        Ok(entity)
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value))?;
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PointSlot {
    x: Option<f64>,
    y: Option<f64>,
}

impl PointSlot {
    fn finish(&self) -> Option<RawPoint> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(RawPoint::new(x, y)),
            _ => None,
        }
    }
}

fn push_complete(slot: &mut PointSlot, target: &mut Vec<RawPoint>) {
    if let Some(point) = slot.finish() {
        target.push(point);
        *slot = PointSlot::default();
    }
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = loop {
            match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    // 文件末尾常见多余空行
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Ok(None),
            }
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(DxfError::invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            DxfError::invalid(format!(
                "第 {} 行的组码 \"{}\" 无法解析为整数",
                self.line_number - 1,
                code_line.trim()
            ))
        })?;
        let value = value_line.trim_end_matches('\r').to_string();
        Ok(Some((code, value)))
    }

    fn put_back(&mut self, pair: (i32, String)) -> Result<(), DxfError> {
        if self.buffer.is_some() {
            return Err(DxfError::invalid("内部错误：尝试多次回退 DXF pair"));
        }
        self.buffer = Some(pair);
        Ok(())
    }
}

fn assign_coord(slot: &mut Option<f64>, raw: &str, context: &str) -> Result<(), DxfError> {
    if slot.is_some() {
        return Err(DxfError::invalid(format!("{context} 出现重复值")));
    }
    *slot = Some(parse_f64(raw, context)?);
    Ok(())
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_counts_kinds() {
        let entities = vec![
            RawEntity::new("LINE"),
            RawEntity::new("CIRCLE"),
            RawEntity::new("LINE"),
        ];
        let histogram = entity_histogram(&entities);
        assert_eq!(histogram.get("LINE"), Some(&2));
        assert_eq!(histogram.get("CIRCLE"), Some(&1));
        assert_eq!(histogram.len(), 2);
    }

    #[test]
    fn json_accepts_bare_array_and_wrapped_document() {
        let loader = JsonFacade::new();
        let bare = loader
            .load_str(r#"[{"type": "CIRCLE", "center": {"x": 1, "y": 2}, "radius": 3}]"#)
            .expect("bare array");
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].radius, Some(3.0));

        let wrapped = loader
            .load_str(r#"{"header": {}, "entities": [{"type": "LINE"}, {"type": "TEXT"}]}"#)
            .expect("wrapped document");
        assert_eq!(wrapped.len(), 2);

        let missing = loader.load_str(r#"{"header": {}}"#).expect("no entities key");
        assert!(missing.is_empty());
    }

    #[test]
    fn json_rejects_garbage() {
        let err = JsonFacade::new().load_str("not json").unwrap_err();
        assert!(matches!(err, IoError::InvalidJson(_)));
    }

    #[test]
    fn reader_rejects_truncated_pair() {
        let err = DxfFacade::new().load_str("0\nSECTION\n2").unwrap_err();
        assert!(matches!(err, IoError::InvalidDocument(_)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_entities(Path::new("part.svg")).unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFormat(ext) if ext == "svg"));
    }
}
