//! # matforge
//!
//! Command-line front end for the material registry:
//!
//! ```bash
//! matforge list
//! matforge inspect standard_surface
//! matforge reload
//! matforge export --exporter summary --output summary.txt --mesh sphere
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use matforge_core::mesh::MeshData;
use matforge_core::mesh::generators::{generate_quad, generate_sphere};
use matforge_graphics::materials::USER_CONSTANT_BUFFER;
use matforge_graphics::{ExportWorkspace, MaterialInstance, PluginRegistry, RegistryConfig, StageKind};

/// Material template and exporter tool.
#[derive(Parser, Debug)]
#[command(name = "matforge", about = "Compile, inspect and export material templates", version)]
struct Args {
    /// Registry configuration file.
    #[arg(long, default_value = "matforge.toml")]
    config: PathBuf,

    /// Extra template directory, searched after the configured ones.
    #[arg(long)]
    templates: Vec<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List loaded templates and discovered exporters.
    List,
    /// Print the reflected bindings of one template.
    Inspect {
        /// Template name.
        name: String,
    },
    /// Load every template, then reload them all and report failures.
    Reload {
        /// Reload only this template.
        name: Option<String>,
    },
    /// Export one instance of each template through an exporter module.
    Export {
        /// Exporter file stem or path to a module.
        #[arg(long)]
        exporter: String,

        /// File the exporter writes to.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Templates to export (default: all).
        #[arg(long = "material")]
        materials: Vec<String>,

        /// Generated mesh to include.
        #[arg(long, value_enum)]
        mesh: Vec<CliMesh>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliMesh {
    Sphere,
    Quad,
}

impl CliMesh {
    fn generate(self) -> MeshData {
        match self {
            Self::Sphere => generate_sphere(1.0, 32, 16),
            Self::Quad => generate_quad(1.0, 1.0),
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = RegistryConfig::load_or_default(&args.config);
    config.template_dirs.extend(args.templates);

    let mut registry = PluginRegistry::new(config);
    registry.load_all();

    let ok = match args.command {
        Command::List => list(&registry),
        Command::Inspect { name } => inspect(&registry, &name),
        Command::Reload { name } => reload(&mut registry, name.as_deref()),
        Command::Export {
            exporter,
            output,
            materials,
            mesh,
        } => export(&registry, &exporter, output, &materials, &mesh),
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn list(registry: &PluginRegistry) -> bool {
    println!("Templates:");
    for template in registry.templates() {
        println!(
            "  {:<24} {:?}  {} properties, CbUser {} bytes  ({})",
            template.name(),
            template.state(),
            template.schema().len(),
            template.constant_buffer_size(StageKind::Lighting),
            template.path().display()
        );
    }
    println!("Exporters:");
    for exporter in registry.exporters() {
        println!("  {}", exporter.display());
    }
    true
}

fn inspect(registry: &PluginRegistry, name: &str) -> bool {
    let Some(template) = registry.find_material(name) else {
        log::error!("No template named '{name}'");
        return false;
    };
    let instance = match MaterialInstance::new(template) {
        Ok(instance) => instance,
        Err(e) => {
            log::error!("{e}");
            return false;
        }
    };

    for stage in StageKind::ALL {
        let Some(bindings) = template.bindings(stage) else {
            continue;
        };
        println!("{stage:?} ({}):", stage.entry_point());
        if let Ok(cb) = bindings.constant_buffer(USER_CONSTANT_BUFFER) {
            let mut members: Vec<_> = cb.members.iter().collect();
            members.sort_by_key(|(_, layout)| layout.offset);
            println!("  {USER_CONSTANT_BUFFER}: {} bytes", cb.total_size);
            for (member, layout) in members {
                println!("    {:>4} {:>3}  {member}", layout.offset, layout.size);
            }
        }
        let mut slots: Vec<_> = bindings.slots.read_only.iter().collect();
        slots.sort_by_key(|(_, slot)| **slot);
        for (resource, slot) in slots {
            println!("  t{slot} {resource}");
        }
        let mut slots: Vec<_> = bindings.slots.read_write.iter().collect();
        slots.sort_by_key(|(_, slot)| **slot);
        for (resource, slot) in slots {
            println!("  u{slot} {resource}");
        }
    }

    println!("Properties:");
    for entry in instance.iter() {
        let status = match entry.resolution(StageKind::Lighting).error() {
            Some(e) => format!("unresolved: {e}"),
            None => format!("@{}", entry.location()),
        };
        println!(
            "  {:<10} {:<20} {:<24} {status}",
            entry.kind().name(),
            entry.target,
            entry.tag
        );
    }
    true
}

fn reload(registry: &mut PluginRegistry, name: Option<&str>) -> bool {
    match name {
        Some(name) => registry.reload_template(name),
        None => {
            let report = registry.reload_shader();
            println!(
                "Reloaded {} templates, {} failed",
                report.succeeded,
                report.failed_count()
            );
            for name in &report.failed {
                println!("  failed: {name}");
            }
            report.is_success()
        }
    }
}

fn export(
    registry: &PluginRegistry,
    exporter: &str,
    output: Option<PathBuf>,
    materials: &[String],
    meshes: &[CliMesh],
) -> bool {
    let module = match registry.find_exporter(exporter) {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(exporter),
    };

    let names: Vec<String> = if materials.is_empty() {
        registry.templates().map(|t| t.name().to_string()).collect()
    } else {
        materials.to_vec()
    };

    let mut instances = Vec::with_capacity(names.len());
    for name in &names {
        match registry.create_instance(name) {
            Ok(instance) => instances.push(instance),
            Err(e) => {
                log::error!("{e}");
                return false;
            }
        }
    }
    let meshes: Vec<MeshData> = meshes.iter().map(|m| m.generate()).collect();

    let mut workspace = ExportWorkspace::new();
    if let Some(output) = output {
        workspace = workspace.with_output_path(output);
    }
    for (name, instance) in names.iter().zip(&instances) {
        workspace.add_material(name, instance);
    }
    for mesh in &meshes {
        workspace.add_mesh(mesh);
    }

    match registry.export(&workspace, &module) {
        Ok(()) => {
            println!(
                "Exported {} materials and {} meshes via {}",
                instances.len(),
                meshes.len(),
                module.display()
            );
            true
        }
        Err(e) => {
            log::error!("Export failed: {e}");
            false
        }
    }
}
