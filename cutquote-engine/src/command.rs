use std::collections::HashMap;

use cutquote_core::geometry::Point2;
use cutquote_core::units::Units;

use crate::session::Session;
use crate::view::{ViewportSize, ZoomDirection};

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// 按空白拆分一行命令文本，空行返回 `None`。
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let name = parts.next()?.to_string();
        Some(Self {
            name,
            args: parts.map(str::to_string).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub session: &'a mut Session,
    /// 预览画布尺寸，未给出光标的缩放以画布中心为锚点。
    pub viewport: ViewportSize,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(UnitsCommand);
        bus.register(MaterialCommand);
        bus.register(ThicknessCommand);
        bus.register(RecalculateCommand);
        bus.register(ZoomCommand);
        bus.register(PanCommand);
        bus.register(ResetViewCommand);
        bus.register(ClearCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

fn arg<'a>(request: &'a CommandRequest, index: usize, what: &str) -> Result<&'a str, CommandResponse> {
    request
        .args
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| CommandResponse::err(format!("{} 缺少参数: {what}", request.name)))
}

fn number_arg(request: &CommandRequest, index: usize, what: &str) -> Result<f64, CommandResponse> {
    let raw = arg(request, index, what)?;
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CommandResponse::err(format!("{} 的 {what} 不是有效数字: {raw}", request.name)))
}

struct UnitsCommand;

impl CommandHandler for UnitsCommand {
    fn name(&self) -> &'static str {
        "units"
    }

    fn execute(&self, request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        let units = match arg(request, 0, "单位").map(str::parse::<Units>) {
            Ok(Ok(units)) => units,
            Ok(Err(err)) => return CommandResponse::err(err.to_string()),
            Err(response) => return response,
        };
        context.session.set_units(units);
        CommandResponse::ok(format!("单位已切换为 {}", units.label()))
    }
}

struct MaterialCommand;

impl CommandHandler for MaterialCommand {
    fn name(&self) -> &'static str {
        "material"
    }

    fn execute(&self, request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        let material = match arg(request, 0, "材料") {
            Ok(material) => material,
            Err(response) => return response,
        };
        match context.session.set_material(material) {
            Ok(()) => CommandResponse::ok(format!(
                "材料: {}，厚度: {}",
                material,
                context.session.selections().thickness
            )),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct ThicknessCommand;

impl CommandHandler for ThicknessCommand {
    fn name(&self) -> &'static str {
        "thickness"
    }

    fn execute(&self, request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        let thickness = match arg(request, 0, "厚度") {
            Ok(thickness) => thickness,
            Err(response) => return response,
        };
        match context.session.set_thickness(thickness) {
            Ok(()) => CommandResponse::ok(format!("厚度: {thickness}")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct RecalculateCommand;

impl CommandHandler for RecalculateCommand {
    fn name(&self) -> &'static str {
        "recalculate"
    }

    fn execute(&self, _request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        match context.session.recalculate() {
            Ok(quote) => CommandResponse::ok(format!(
                "{} min，{:.2}",
                quote.time_minutes, quote.price
            )),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

/// `zoom <in|out|滚轮增量> [x y]`，光标默认在画布中心。
struct ZoomCommand;

impl CommandHandler for ZoomCommand {
    fn name(&self) -> &'static str {
        "zoom"
    }

    fn execute(&self, request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        let direction = match arg(request, 0, "方向") {
            Ok("in") => ZoomDirection::In,
            Ok("out") => ZoomDirection::Out,
            Ok(_) => match number_arg(request, 0, "方向") {
                Ok(delta) => ZoomDirection::from_wheel_delta(delta),
                Err(response) => return response,
            },
            Err(response) => return response,
        };
        let cursor = if request.args.len() >= 3 {
            match (number_arg(request, 1, "x"), number_arg(request, 2, "y")) {
                (Ok(x), Ok(y)) => Point2::new(x, y),
                (Err(response), _) | (_, Err(response)) => return response,
            }
        } else {
            Point2::new(context.viewport.width / 2.0, context.viewport.height / 2.0)
        };
        context.session.zoom(direction, cursor);
        CommandResponse::ok(format!("缩放: {:.1}", context.session.view().zoom))
    }
}

struct PanCommand;

impl CommandHandler for PanCommand {
    fn name(&self) -> &'static str {
        "pan"
    }

    fn execute(&self, request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        match (number_arg(request, 0, "dx"), number_arg(request, 1, "dy")) {
            (Ok(dx), Ok(dy)) => {
                context.session.pan(dx, dy);
                CommandResponse::ok("视图已平移")
            }
            (Err(response), _) | (_, Err(response)) => response,
        }
    }
}

struct ResetViewCommand;

impl CommandHandler for ResetViewCommand {
    fn name(&self) -> &'static str {
        "reset_view"
    }

    fn execute(&self, _request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        context.session.reset_view();
        CommandResponse::ok("视图已重置")
    }
}

struct ClearCommand;

impl CommandHandler for ClearCommand {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn execute(&self, _request: &CommandRequest, context: &mut CommandContext<'_>) -> CommandResponse {
        context.session.clear();
        CommandResponse::ok("图纸已清除")
    }
}

#[cfg(test)]
mod tests {
    use cutquote_core::raw::{RawEntity, RawPoint};

    use super::*;

    fn loaded_session() -> Session {
        let mut session = Session::default();
        session
            .load_drawing(&[RawEntity {
                vertices: vec![RawPoint::new(0.0, 0.0), RawPoint::new(100.0, 0.0)],
                ..RawEntity::new("LINE")
            }])
            .unwrap();
        session
    }

    fn run(bus: &CommandBus, session: &mut Session, line: &str) -> CommandResponse {
        let request = CommandRequest::parse(line).expect("non-empty command");
        let mut context = CommandContext {
            session,
            viewport: ViewportSize::new(600.0, 400.0),
        };
        bus.dispatch(&request, &mut context)
    }

    #[test]
    fn selection_and_quote_commands() {
        let bus = CommandBus::new();
        let mut session = loaded_session();

        assert!(run(&bus, &mut session, "material inox").success);
        assert!(run(&bus, &mut session, "thickness 1.5").success);
        assert!(run(&bus, &mut session, "units in").success);
        let response = run(&bus, &mut session, "recalculate");
        assert!(response.success, "{:?}", response.message);

        let quote = session.last_quote().expect("quote cached");
        assert_eq!(quote.material, "inox");
        assert_eq!(quote.thickness, "1.5");
        assert!((quote.total_length_mm - 2540.0).abs() < 1e-9);
    }

    #[test]
    fn view_commands_update_state() {
        let bus = CommandBus::new();
        let mut session = loaded_session();

        assert!(run(&bus, &mut session, "zoom in 300 200").success);
        assert!(run(&bus, &mut session, "zoom -120").success);
        assert!((session.view().zoom - 1.2).abs() < 1e-9);

        assert!(run(&bus, &mut session, "pan 5 -5").success);
        assert!(run(&bus, &mut session, "reset_view").success);
        assert!((session.view().zoom - 1.0).abs() < 1e-9);
        assert_eq!(session.view().offset.x(), 0.0);

        assert!(run(&bus, &mut session, "clear").success);
        assert!(session.drawing().is_none());
    }

    #[test]
    fn zoom_without_cursor_anchors_at_canvas_center() {
        let bus = CommandBus::new();
        let mut centered = loaded_session();
        let mut explicit = loaded_session();

        assert!(run(&bus, &mut centered, "zoom in").success);
        assert!(run(&bus, &mut explicit, "zoom in 300 200").success);
        assert_eq!(centered.view(), explicit.view());
        assert!(centered.view().offset.x() != 0.0 || centered.view().offset.y() != 0.0);
    }

    #[test]
    fn bad_arguments_are_reported() {
        let bus = CommandBus::new();
        let mut session = loaded_session();

        assert!(!run(&bus, &mut session, "units cm").success);
        assert!(!run(&bus, &mut session, "material madera").success);
        assert!(!run(&bus, &mut session, "thickness 7").success);
        assert!(!run(&bus, &mut session, "pan 1").success);
        assert!(!run(&bus, &mut session, "zoom sideways").success);

        let response = run(&bus, &mut session, "explode");
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("未知命令: explode"));
    }

    #[test]
    fn parse_ignores_blank_lines() {
        assert!(CommandRequest::parse("   ").is_none());
        let request = CommandRequest::parse(" pan  1 2 ").unwrap();
        assert_eq!(request.name, "pan");
        assert_eq!(request.args, ["1", "2"]);
        assert_eq!(CommandBus::new().available_commands().count(), 8);
    }
}
