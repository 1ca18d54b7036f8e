//! Plugin inspection commands

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use harbor_core::StartupReport;
use harbor_core::plugins::{Discovery, PluginDescriptor, discover_plugins};
use harbor_server::builtin_routes;

use super::{dylib_host, load_host_config};

/// Plugin inspection arguments
#[derive(Args)]
pub struct PluginArgs {
    #[command(subcommand)]
    pub command: PluginCommands,
}

/// Plugin subcommands
#[derive(Subcommand)]
pub enum PluginCommands {
    /// List discovered plugin bundles
    List {
        /// Plugin directory (overrides config)
        #[arg(long)]
        plugin_dir: Option<PathBuf>,
    },
    /// Run the full lifecycle once and report what happened
    Check {
        /// Plugin directory (overrides config)
        #[arg(long)]
        plugin_dir: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Run plugin command
pub fn run(args: PluginArgs) -> Result<()> {
    match args.command {
        PluginCommands::List { plugin_dir } => {
            list_plugins(&load_host_config(plugin_dir)?.plugin_dir)
        }
        PluginCommands::Check { plugin_dir, json } => check_plugins(plugin_dir, json),
    }
}

fn list_plugins(dir: &Path) -> Result<()> {
    let Discovery {
        descriptors,
        skipped,
    } = discover_plugins(dir)?;

    for failure in &skipped {
        println!("✗ {}", failure);
    }

    if descriptors.is_empty() {
        println!("No plugins installed");
        println!();
        println!("Plugin directory: {}", dir.display());
        println!();
        println!("To install a plugin:");
        println!("  1. Create a bundle directory: mkdir -p {}/my-plugin", dir.display());
        println!("  2. Add plugin.toml with at least: id = \"my-plugin\" and version = \"0.1.0\"");
        println!(
            "  3. Copy the plugin library: cp libmy_plugin.so {}/my-plugin/",
            dir.display()
        );
        return Ok(());
    }

    for descriptor in &descriptors {
        println!("{}", format_descriptor(descriptor));
    }

    Ok(())
}

fn format_descriptor(descriptor: &PluginDescriptor) -> String {
    let description = if descriptor.description().is_empty() {
        "No description"
    } else {
        descriptor.description()
    };
    format!(
        "{} v{}    {}",
        descriptor.id(),
        descriptor.version(),
        description
    )
}

fn check_plugins(plugin_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let mut host = dylib_host(load_host_config(plugin_dir)?);
    let report = host.start_up_with(builtin_routes)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }

    host.shutdown()?;

    if !report.failures.is_empty() {
        bail!("{} plugin failure(s) during start-up", report.failures.len());
    }
    Ok(())
}

fn format_report(report: &StartupReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Discovered {}, loaded {}, started {}",
        report.discovered, report.loaded, report.started
    );
    let _ = writeln!(out, "Routes: {}", report.route_count);

    if !report.extensions.is_empty() {
        let _ = writeln!(out, "\nExtensions:");
        for extension in &report.extensions {
            let _ = writeln!(out, "  [{}] {}", extension.unit_id, extension);
        }
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(
            out,
            "\nWarnings ({} shadowed, {} replaced):",
            report.shadowed_routes(),
            report.replaced_handlers()
        );
        for warning in &report.warnings {
            let _ = writeln!(out, "  {}", warning);
        }
    }

    if !report.failures.is_empty() {
        let _ = writeln!(out, "\nFailures:");
        for failure in &report.failures {
            let _ = writeln!(out, "  ✗ {}", failure);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_core::plugins::{ContributionOwner, ErrorKind};
    use harbor_core::{ExtensionSummary, RouteCollisionWarning, UnitFailure};
    use tempfile::TempDir;

    fn report() -> StartupReport {
        StartupReport {
            discovered: 3,
            loaded: 2,
            started: 1,
            extensions: vec![ExtensionSummary {
                unit_id: "greeter".into(),
                type_name: "greeter_plugin::GreeterExtension".into(),
                identity: "Greetings".into(),
                ordinal: Some(1),
            }],
            failures: vec![UnitFailure::new("broken", ErrorKind::Start, "refused")],
            warnings: vec![RouteCollisionWarning::HandlerReplaced {
                type_name: "Ctl".into(),
                previous: ContributionOwner::new("a", "A"),
                replacement: ContributionOwner::new("b", "B"),
            }],
            route_count: 4,
            completed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_format_report_sections() {
        let text = format_report(&report());
        assert!(text.starts_with("Discovered 3, loaded 2, started 1\n"));
        assert!(text.contains("[greeter] greeter_plugin::GreeterExtension: Greetings"));
        assert!(text.contains("0 shadowed, 1 replaced"));
        assert!(text.contains("broken [start]: refused"));
    }

    #[test]
    fn test_format_descriptor() {
        let dir = TempDir::new().unwrap();
        let bundle = dir.path().join("greeter");
        std::fs::create_dir_all(&bundle).unwrap();
        std::fs::write(
            bundle.join("plugin.toml"),
            "id = \"greeter\"\nversion = \"0.2.0\"\n",
        )
        .unwrap();

        let descriptors = discover_plugins(dir.path()).unwrap().descriptors;
        assert_eq!(
            format_descriptor(&descriptors[0]),
            "greeter v0.2.0    No description"
        );
    }

    #[test]
    fn test_list_missing_dir_is_ok() {
        let dir = TempDir::new().unwrap();
        assert!(list_plugins(&dir.path().join("nothing")).is_ok());
    }
}
