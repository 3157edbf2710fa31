use std::path::PathBuf;

use cutquote_engine::errors::{ConfigurationError, EngineError};
use cutquote_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("材料配置无效: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("无法解析颜色 `{0}`，应为 #RRGGBB 或 #RRGGBBAA")]
    InvalidColor(String),
    #[error("无法创建 {width}×{height} 的画布")]
    Canvas { width: u32, height: u32 },
    #[error("写入预览图 {path:?} 失败: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("命令 `{command}` 执行失败: {message}")]
    Command { command: String, message: String },
}
