use std::path::{Path, PathBuf};

use clap::Parser;
use cutquote_config::{AppConfig, ConfigError};
use cutquote_core::units::Units;
use cutquote_frontend::loader::SelectionOverrides;
use cutquote_frontend::{QuoteOptions, list_materials, run_quote};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 激光切割报价：读取 DXF/JSON 图纸，估算机时与价格。
#[derive(Parser, Debug)]
#[command(name = "cutquote", version)]
struct Cli {
    /// 图纸文件（.dxf 或 .json）
    #[arg(required_unless_present = "list_materials")]
    input: Option<PathBuf>,

    /// 图纸单位：mm 或 in
    #[arg(long)]
    units: Option<Units>,

    /// 材料名，例如 hierro、inox
    #[arg(long)]
    material: Option<String>,

    /// 厚度（毫米）
    #[arg(long)]
    thickness: Option<String>,

    /// 配置文件路径
    #[arg(long)]
    config: Option<PathBuf>,

    /// 导出预览图（PNG）
    #[arg(long)]
    png: Option<PathBuf>,

    /// 以画布中心为锚点缩放的步数，负数为缩小
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    zoom_steps: i32,

    /// 预览平移像素，格式 dx,dy
    #[arg(long, value_parser = parse_pan, allow_hyphen_values = true)]
    pan: Option<(f64, f64)>,

    /// 额外的会话命令，可重复，例如 --command "zoom out 100 100"
    #[arg(long = "command")]
    commands: Vec<String>,

    /// 以 JSON 输出报价
    #[arg(long)]
    json: bool,

    /// 列出材料目录后退出
    #[arg(long)]
    list_materials: bool,
}

fn parse_pan(value: &str) -> Result<(f64, f64), String> {
    let (dx, dy) = value
        .split_once(',')
        .ok_or_else(|| format!("`{value}` 应为 dx,dy"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .ok_or_else(|| format!("`{part}` 不是有效数字"))
    };
    Ok((parse(dx)?, parse(dy)?))
}

fn main() {
    let cli = Cli::parse();
    let (config, fallback) = match load_configuration(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(err) => {
            init_logging(&AppConfig::default());
            error!(error = %err, "加载指定配置失败");
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    init_logging(&config);
    if let Some(err) = fallback {
        report_fallback(&err);
    }
    info!("启动切割报价");

    if cli.list_materials {
        match list_materials(&config) {
            Ok(listing) => print!("{listing}"),
            Err(err) => {
                error!(error = %err, "无法列出材料");
                std::process::exit(1);
            }
        }
        return;
    }

    let Some(input) = cli.input.clone() else {
        eprintln!("需要提供图纸文件路径");
        std::process::exit(1);
    };

    let options = QuoteOptions {
        input,
        overrides: SelectionOverrides {
            units: cli.units,
            material: cli.material.clone(),
            thickness: cli.thickness.clone(),
        },
        commands: session_commands(&cli, &config),
        png: cli.png.clone(),
    };

    match run_quote(&config, &options) {
        Ok(run) => {
            if cli.json {
                match serde_json::to_string_pretty(&run.quote) {
                    Ok(json) => println!("{json}"),
                    Err(err) => {
                        error!(error = %err, "序列化报价失败");
                        std::process::exit(1);
                    }
                }
            } else {
                print!("{}", run.report);
            }
            if run.render_warnings > 0 {
                warn!(count = run.render_warnings, "部分实体未能绘制");
            }
        }
        Err(err) => {
            error!(error = %err, "报价失败");
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

/// 把缩放/平移参数展开为会话命令，后接用户显式给出的命令。
fn session_commands(cli: &Cli, config: &AppConfig) -> Vec<String> {
    let cursor_x = f64::from(config.preview.width) / 2.0;
    let cursor_y = f64::from(config.preview.height) / 2.0;
    let direction = if cli.zoom_steps >= 0 { "in" } else { "out" };

    let mut commands: Vec<String> = (0..cli.zoom_steps.unsigned_abs())
        .map(|_| format!("zoom {direction} {cursor_x} {cursor_y}"))
        .collect();
    if let Some((dx, dy)) = cli.pan {
        commands.push(format!("pan {dx} {dy}"));
    }
    commands.extend(cli.commands.iter().cloned());
    commands
}

/// 显式指定的配置加载失败即返回错误；自动发现失败则退回内建默认值，
/// 并把错误交给调用方在日志初始化之后报告。
fn load_configuration(
    override_path: Option<&Path>,
) -> Result<(AppConfig, Option<ConfigError>), ConfigError> {
    match override_path {
        Some(path) => AppConfig::from_file(path).map(|cfg| (cfg, None)),
        None => Ok(match AppConfig::discover() {
            Ok(cfg) => (cfg, None),
            Err(err) => (AppConfig::default(), Some(err)),
        }),
    }
}

fn report_fallback(err: &ConfigError) {
    match err {
        ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
            warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
        }
        ConfigError::Context { .. } => {
            warn!(error = %err, "加载默认配置失败，使用内建默认值");
        }
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
