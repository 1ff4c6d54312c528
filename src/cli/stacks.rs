//! Stack synthesis commands

use super::display::table::StackInfo;
use super::display::TableRenderer;
use crate::domain::config::{apply_to_app_conf, parse_dynamic_configs, AppConf};
use crate::domain::stack::{App, Stack, StackValidator, ValidationReport};
use crate::infrastructure::assembly::{AssemblyWriter, FsAssemblyWriter};
use crate::infrastructure::cloudformation::{synthesize, SynthesizedStack, TemplateFormat};
use crate::infrastructure::constants::DEFAULT_OUTPUT_DIR;
use clap::{Args, Parser};

const CONF_FILE_ENV: &str = "INFRA_STACKS_CONF_FILE";

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to the stacks configuration file (TOML)
    /// If not given, reads INFRA_STACKS_CONF_FILE, then falls back to defaults
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Override a configuration value, e.g. -D primary.region=eu-west-1
    #[arg(short = 'D', value_name = "KEY=VALUE")]
    pub properties: Vec<String>,
}

impl ConfigArgs {
    pub fn load(&self) -> anyhow::Result<AppConf> {
        let mut conf = if let Some(ref path) = self.config {
            AppConf::from_file(path)?
        } else if let Ok(env_path) = std::env::var(CONF_FILE_ENV) {
            AppConf::from_file(&env_path)?
        } else {
            tracing::debug!("no configuration file given, using defaults");
            AppConf::default()
        };

        if !self.properties.is_empty() {
            let overrides = parse_dynamic_configs(&self.properties)
                .map_err(|e| anyhow::anyhow!("Failed to parse dynamic configs: {}", e))?;
            apply_to_app_conf(&overrides, &mut conf)
                .map_err(|e| anyhow::anyhow!("Failed to apply dynamic configs: {}", e))?;
        }
        Ok(conf)
    }

    /// Declares every stack from the loaded configuration.
    pub fn build_app(&self) -> anyhow::Result<App> {
        let conf = self.load()?;
        Ok(App::from_conf(&conf)?)
    }
}

fn validate_all(stacks: &[&Stack]) -> Vec<ValidationReport> {
    let validator = StackValidator::new();
    stacks.iter().map(|s| validator.validate(s)).collect()
}

#[derive(Parser, Debug, Clone)]
pub struct SynthCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output directory for the cloud assembly
    #[arg(long, short = 'o', default_value = DEFAULT_OUTPUT_DIR)]
    pub output: String,

    /// Template format (json, yaml)
    #[arg(long, default_value = "json")]
    pub format: String,

    /// Only synthesize the named stack (repeatable)
    #[arg(long = "stack", short = 's', value_name = "NAME")]
    pub stacks: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct ValidateCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Only validate the named stack (repeatable)
    #[arg(long = "stack", short = 's', value_name = "NAME")]
    pub stacks: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct GraphCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Stack to resolve
    #[arg(long = "stack", short = 's', value_name = "NAME")]
    pub stack: String,
}

impl SynthCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let format: TemplateFormat = self
            .format
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid format: {}", e))?;
        let app = self.config.build_app()?;
        let selected = app.select(&self.stacks)?;

        let renderer = TableRenderer::new();
        let reports = validate_all(&selected);
        let mut failed = false;
        for report in &reports {
            if report.has_errors() {
                print!("{}", renderer.render_findings(report));
                failed = true;
            }
        }
        if failed {
            anyhow::bail!("Validation failed, no templates written");
        }

        let synthesized = selected
            .iter()
            .map(|s| synthesize(s))
            .collect::<Result<Vec<SynthesizedStack>, _>>()?;

        let writer = FsAssemblyWriter::new(&self.output);
        let manifest = writer.write(&synthesized, format).await?;
        tracing::info!(
            location = %writer.location(),
            stacks = manifest.stacks.len(),
            "cloud assembly written"
        );
        print!("{}", renderer.render_synth_summary(&manifest, &writer.location()));
        Ok(())
    }
}

impl ListCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let app = self.config.build_app()?;
        let validator = StackValidator::new();

        let stacks: Vec<StackInfo> = app
            .stacks()
            .iter()
            .map(|stack| {
                let report = validator.validate(stack);
                StackInfo {
                    name: stack.name().to_string(),
                    region: stack.env().region.clone(),
                    resources: stack.resources().len(),
                    outputs: stack.outputs().len(),
                    errors: report.errors().count(),
                    warnings: report.warnings().count(),
                }
            })
            .collect();

        print!("{}", TableRenderer::new().render_stacks_list(&stacks));
        Ok(())
    }
}

impl ValidateCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let app = self.config.build_app()?;
        let selected = app.select(&self.stacks)?;

        let renderer = TableRenderer::new();
        let reports = validate_all(&selected);
        for report in &reports {
            print!("{}", renderer.render_findings(report));
        }

        let errors: usize = reports.iter().map(|r| r.errors().count()).sum();
        if errors > 0 {
            anyhow::bail!("{} validation error(s)", errors);
        }
        Ok(())
    }
}

impl GraphCommand {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let app = self.config.build_app()?;
        let stack = app
            .stack(&self.stack)
            .ok_or_else(|| anyhow::anyhow!("Stack '{}' is not declared", self.stack))?;
        let synthesized = synthesize(stack)?;
        print!("{}", TableRenderer::new().render_graph(&synthesized));
        Ok(())
    }
}
