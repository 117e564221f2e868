//! CLI command definitions and handlers

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use metric_charts_render::{
    render_documents, ChartKind, Manifest, ManifestFormat, RenderOptions, Renderer, PUSHER_PORT,
};
use metric_charts_values::{parse_override, OverrideKind, Values};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main CLI structure
#[derive(Parser)]
#[command(name = "metric-charts")]
#[command(about = "Render Kubernetes Deployments for the metric scraper and pusher")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Render chart manifests
    Render {
        /// Chart to render; `all` reads umbrella values keyed by chart name
        #[arg(short, long)]
        chart: ChartSelection,

        #[command(flatten)]
        inputs: ValuesArgs,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: OutputFormat,

        /// Write one file per chart into this directory instead of stdout
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Check that values resolve and render, without printing manifests
    Validate {
        /// Chart to validate
        #[arg(short, long)]
        chart: ChartSelection,

        #[command(flatten)]
        inputs: ValuesArgs,
    },

    /// Show chart defaults
    Show {
        #[command(subcommand)]
        command: ShowCommands,
    },

    /// Show system information
    Info,
}

/// `show` subcommands
#[derive(Subcommand)]
pub enum ShowCommands {
    /// Print the default values of a chart as YAML
    Values {
        #[arg(short, long)]
        chart: ChartName,
    },

    /// Print the JSON Schema of a chart's values
    Schema {
        #[arg(short, long)]
        chart: ChartName,
    },
}

/// Values inputs shared by `render` and `validate`
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ValuesArgs {
    /// Values file; repeat to layer several, later files win
    #[arg(short = 'f', long = "values")]
    pub values: Vec<PathBuf>,

    /// Override a value (path=value[,path=value...])
    #[arg(long)]
    pub set: Vec<String>,

    /// Override a value, always as a string
    #[arg(long)]
    pub set_string: Vec<String>,

    /// Namespace for the rendered objects
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Release name for the instance label
    #[arg(long)]
    pub release: Option<String>,
}

impl ValuesArgs {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            namespace: self.namespace.clone(),
            release: self.release.clone(),
        }
    }
}

/// Chart selection for `render` and `validate`
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChartSelection {
    Scraper,
    Pusher,
    All,
}

impl ChartSelection {
    /// The single chart selected, or `None` for `all`
    pub fn kind(&self) -> Option<ChartKind> {
        match self {
            ChartSelection::Scraper => Some(ChartKind::Scraper),
            ChartSelection::Pusher => Some(ChartKind::Pusher),
            ChartSelection::All => None,
        }
    }
}

impl fmt::Display for ChartSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{}", kind),
            None => f.write_str("all charts"),
        }
    }
}

/// A single chart
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChartName {
    Scraper,
    Pusher,
}

impl From<ChartName> for ChartKind {
    fn from(name: ChartName) -> Self {
        match name {
            ChartName::Scraper => ChartKind::Scraper,
            ChartName::Pusher => ChartKind::Pusher,
        }
    }
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl From<OutputFormat> for ManifestFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => ManifestFormat::Yaml,
            OutputFormat::Json => ManifestFormat::Json,
        }
    }
}

/// Command execution result
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct WrittenFile {
    chart: &'static str,
    path: String,
}

/// Execute CLI commands
pub struct CommandExecutor {
    /// Print manifests, defaults and info to stdout
    print: bool,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self { print: true }
    }

    /// Executor that only reports through [`CommandResult`]
    pub fn quiet() -> Self {
        Self { print: false }
    }

    /// Execute a CLI command
    pub fn execute(&mut self, command: Commands) -> Result<CommandResult> {
        match command {
            Commands::Render {
                chart,
                inputs,
                format,
                output_dir,
            } => self.execute_render(chart, &inputs, format, output_dir.as_deref()),
            Commands::Validate { chart, inputs } => self.execute_validate(chart, &inputs),
            Commands::Show { command } => self.execute_show(command),
            Commands::Info => self.execute_info(),
        }
    }

    fn execute_render(
        &self,
        chart: ChartSelection,
        inputs: &ValuesArgs,
        format: OutputFormat,
        output_dir: Option<&Path>,
    ) -> Result<CommandResult> {
        let manifests = render_manifests(chart, inputs)?;
        let format = ManifestFormat::from(format);
        let charts: Vec<&str> = manifests.iter().map(Manifest::name).collect();

        let Some(dir) = output_dir else {
            let mut text = render_documents(&manifests, format)?;
            if !text.ends_with('\n') {
                text.push('\n');
            }
            self.emit(&text);

            return Ok(CommandResult {
                success: true,
                message: format!("Rendered {}", charts.join(", ")),
                data: Some(serde_json::json!({ "charts": charts })),
            });
        };

        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;

        let mut written = Vec::with_capacity(manifests.len());
        for manifest in &manifests {
            let path = dir.join(manifest.file_name(format));
            let text = render_documents(std::slice::from_ref(manifest), format)?;
            fs::write(&path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;

            info!("Wrote {} manifest to {}", manifest.name(), path.display());
            written.push(WrittenFile {
                chart: manifest.name(),
                path: path.display().to_string(),
            });
        }

        Ok(CommandResult {
            success: true,
            message: format!("Wrote {} manifest(s) to {}", written.len(), dir.display()),
            data: Some(serde_json::json!({ "charts": charts, "files": written })),
        })
    }

    fn execute_validate(&self, chart: ChartSelection, inputs: &ValuesArgs) -> Result<CommandResult> {
        match render_manifests(chart, inputs) {
            Ok(manifests) => {
                let charts: Vec<&str> = manifests.iter().map(Manifest::name).collect();
                Ok(CommandResult {
                    success: true,
                    message: format!("Values for {} are valid", chart),
                    data: Some(serde_json::json!({ "charts": charts })),
                })
            }
            Err(err) => Ok(CommandResult {
                success: false,
                message: format!("{:#}", err),
                data: None,
            }),
        }
    }

    fn execute_show(&self, command: ShowCommands) -> Result<CommandResult> {
        let (message, text) = match command {
            ShowCommands::Values { chart } => {
                let kind = ChartKind::from(chart);
                let values = kind.default_values()?;
                (format!("Default values for {}", kind), values.to_yaml_string()?)
            }
            ShowCommands::Schema { chart } => {
                let kind = ChartKind::from(chart);
                let mut schema = serde_json::to_string_pretty(&kind.values_schema())?;
                schema.push('\n');
                (format!("Values schema for {}", kind), schema)
            }
        };

        self.emit(&text);

        Ok(CommandResult {
            success: true,
            message,
            data: Some(serde_json::Value::String(text)),
        })
    }

    fn execute_info(&self) -> Result<CommandResult> {
        let info = serde_json::json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "repository": env!("CARGO_PKG_REPOSITORY"),
            "charts": [
                { "name": ChartKind::Scraper.name(), "ports": [] },
                { "name": ChartKind::Pusher.name(), "ports": [PUSHER_PORT] },
            ],
            "formats": ["yaml", "json"]
        });

        self.emit(&format!("{}\n", serde_json::to_string_pretty(&info)?));

        Ok(CommandResult {
            success: true,
            message: "System information".to_string(),
            data: Some(info),
        })
    }

    fn emit(&self, text: &str) {
        if self.print {
            print!("{}", text);
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Layer values files, then `--set`, then `--set-string`
pub fn load_values(inputs: &ValuesArgs) -> Result<Values> {
    let mut values = Values::new();

    for path in &inputs.values {
        debug!("Loading values from {}", path.display());
        values.merge(Values::from_path(path)?);
    }

    let overrides = inputs
        .set
        .iter()
        .map(|expr| (expr, OverrideKind::Typed))
        .chain(inputs.set_string.iter().map(|expr| (expr, OverrideKind::String)));

    for (expr, kind) in overrides {
        for assignment in parse_override(expr, kind)? {
            debug!("Setting {}", assignment.path);
            assignment.apply(&mut values)?;
        }
    }

    Ok(values)
}

/// Load values, render the selected charts and self-verify every manifest
pub fn render_manifests(chart: ChartSelection, inputs: &ValuesArgs) -> Result<Vec<Manifest>> {
    let values = load_values(inputs)?;
    let renderer = Renderer::new(inputs.render_options());

    let manifests = match chart.kind() {
        Some(kind) => vec![renderer.render(kind, &values)?],
        None => renderer.render_umbrella(&values)?,
    };

    for manifest in &manifests {
        manifest
            .verify()
            .with_context(|| format!("rendered {} manifest failed verification", manifest.name()))?;
    }

    Ok(manifests)
}
