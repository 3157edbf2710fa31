pub mod cli;
pub mod errors;
pub mod loader;
pub mod raster;

use std::path::PathBuf;

use cutquote_config::AppConfig;
use cutquote_engine::command::{CommandBus, CommandContext, CommandRequest};
use cutquote_engine::session::Quote;
use cutquote_engine::view::ViewportSize;
use errors::FrontendError;
use loader::{SelectionOverrides, build_session, load_into_session};
use raster::{PreviewStyle, rasterize};
use tracing::info;

/// 一次命令行报价的输入。
#[derive(Debug, Clone, Default)]
pub struct QuoteOptions {
    pub input: PathBuf,
    pub overrides: SelectionOverrides,
    /// 报价前依次执行的会话命令，如 `zoom in 300 200`。
    pub commands: Vec<String>,
    pub png: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct QuoteRun {
    pub quote: Quote,
    pub report: String,
    pub render_warnings: usize,
}

/// 载入图纸、执行命令、计算报价，并按需导出预览图。
pub fn run_quote(config: &AppConfig, options: &QuoteOptions) -> Result<QuoteRun, FrontendError> {
    let session = build_session(config, &options.overrides)?;
    let mut loaded = load_into_session(&options.input, session)?;

    let preview = &config.preview;
    let viewport = ViewportSize::new(f64::from(preview.width), f64::from(preview.height));

    let bus = CommandBus::new();
    let mut context = CommandContext {
        session: &mut loaded.session,
        viewport,
    };
    for line in &options.commands {
        let Some(request) = CommandRequest::parse(line) else {
            continue;
        };
        let response = bus.dispatch(&request, &mut context);
        if !response.success {
            return Err(FrontendError::Command {
                command: line.clone(),
                message: response.message.unwrap_or_default(),
            });
        }
    }

    let session = &mut loaded.session;
    let quote = session.recalculate()?;

    let mut render_warnings = 0;
    if let Some(png) = &options.png {
        let style = PreviewStyle::from_config(preview)?;
        let list = session.render(viewport)?;
        let (surface, failures) = rasterize(&list, preview.width, preview.height, style)?;
        surface.save_png(png)?;
        render_warnings = list.warnings.len() + failures.len();
        info!(path = %png.display(), render_warnings, "预览图已生成");
    }

    let display_name = session
        .rates()
        .material(&quote.material)
        .map(|material| material.display_name.clone())
        .unwrap_or_else(|| quote.material.clone());
    let report = cli::format_report(
        &loaded.path,
        &loaded.histogram,
        &quote,
        &display_name,
        &config.pricing.currency_symbol,
    );

    Ok(QuoteRun {
        quote,
        report,
        render_warnings,
    })
}

/// 列出配置生效后的材料目录。
pub fn list_materials(config: &AppConfig) -> Result<String, FrontendError> {
    let table = loader::rate_table_from_config(config)?;
    Ok(cli::format_materials(&table))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn drawing_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("create temp file");
        writeln!(
            file,
            r#"[
                {{"type": "LINE", "vertices": [{{"x": 0, "y": 0}}, {{"x": 100, "y": 0}}]}},
                {{"type": "CIRCLE", "center": {{"x": 50, "y": 30}}, "radius": 10}},
                {{"type": "TEXT"}}
            ]"#
        )
        .unwrap();
        file
    }

    #[test]
    fn quote_run_reports_and_writes_preview() {
        let file = drawing_file();
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("preview.png");

        let run = run_quote(
            &AppConfig::default(),
            &QuoteOptions {
                input: file.path().to_path_buf(),
                commands: vec!["zoom in 300 200".to_string(), "pan 10 0".to_string()],
                png: Some(png.clone()),
                ..QuoteOptions::default()
            },
        )
        .expect("quote run");

        assert_eq!(run.quote.time_minutes, 1);
        assert_eq!(run.quote.price, 50.0);
        assert_eq!(run.quote.warnings.len(), 1);
        assert_eq!(run.render_warnings, 0);
        assert!(run.report.contains("HIERRO NEGRO"));
        assert!(png.exists());
    }

    #[test]
    fn failing_command_aborts_run() {
        let file = drawing_file();
        let err = run_quote(
            &AppConfig::default(),
            &QuoteOptions {
                input: file.path().to_path_buf(),
                commands: vec!["material madera".to_string()],
                ..QuoteOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, FrontendError::Command { .. }));
    }

    #[test]
    fn materials_listing_includes_builtin_catalog() {
        let listing = list_materials(&AppConfig::default()).unwrap();
        assert!(listing.contains("galvanizado (GALVANIZADO)"));
    }
}
