//! `trellis render`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Args;
use serde::Serialize;
use trellis_core::{PropertyKind, RenderConfig};
use trellis_dom::{Device, SsrPage};
use trellis_runtime::{Globals, Interpreter, parse_tree};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Descriptor tree: one element object or an array of them.
    pub descriptor: PathBuf,

    /// Initial global state, a JSON object.
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Render configuration, a JSON object.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Start in dark mode.
    #[arg(long)]
    pub dark: bool,

    /// Render for the mobile device.
    #[arg(long)]
    pub mobile: bool,

    /// Write the page here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// One row of `trellis kinds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindRow {
    pub code: i32,
    pub name: &'static str,
}

#[must_use]
pub fn kinds_table() -> Vec<KindRow> {
    PropertyKind::ALL
        .iter()
        .map(|kind| KindRow {
            code: kind.code(),
            name: kind.name(),
        })
        .collect()
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let text = fs::read_to_string(path).map_err(CliError::io(path))?;
    serde_json::from_str(&text).map_err(CliError::json(path))
}

/// Load the configuration file, then apply the flag overrides.
pub fn load_config(args: &RenderArgs) -> Result<RenderConfig> {
    let config = match &args.config {
        Some(path) => serde_json::from_value(read_json(path)?).map_err(CliError::json(path))?,
        None => RenderConfig::default(),
    };
    Ok(if args.dark {
        config.with_dark_mode(true)
    } else {
        config
    })
}

/// Render the page described by `args`.
pub fn render(args: &RenderArgs) -> Result<SsrPage> {
    let config = load_config(args)?;
    let tree = parse_tree(read_json(&args.descriptor)?)?;
    if tree.is_empty() {
        return Err(CliError::invalid(format!(
            "{} holds no elements",
            args.descriptor.display()
        )));
    }
    let globals = match &args.state {
        Some(path) => Globals::from_json(read_json(path)?)?,
        None => Globals::new(),
    };
    let globals = Rc::new(globals);
    let interpreter = Interpreter::new(Rc::clone(&globals));
    tracing::debug!(elements = tree.len(), mobile = args.mobile, "rendering");

    let page = trellis_dom::ssr(config, |root| {
        globals.attach_session(root.session());
        if args.mobile {
            root.session().set_device(Device::Mobile)?;
        }
        interpreter.mount_all(root, &tree)?;
        globals.emit_on_load()
    })?;
    Ok(page)
}

pub fn run_render(args: &RenderArgs) -> Result<()> {
    let html = render(args)?.to_html();
    match &args.out {
        Some(path) => fs::write(path, html).map_err(CliError::io(path)),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(html.as_bytes())
                .map_err(CliError::io("<stdout>"))
        }
    }
}
