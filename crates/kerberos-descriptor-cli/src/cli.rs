use std::{ffi::OsStr, io::Write, path::PathBuf};

use kerberos_descriptor::{
    Configurations, Descriptor, KerberosDescriptor, MaterializedScope, Update, descriptor,
    materialize,
};
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::{debug, info};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to load descriptor"))]
    LoadDescriptor { source: descriptor::Error },

    #[snafu(display("failed to render combined descriptor"))]
    RenderDescriptor { source: descriptor::Error },

    #[snafu(display("failed to read cluster configuration {path:?}"))]
    ReadClusterConfig {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse cluster configuration {path:?} as JSON"))]
    ParseClusterConfigJson {
        source: serde_json::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse cluster configuration {path:?} as YAML"))]
    ParseClusterConfigYaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },

    #[snafu(display("service {service:?} is not defined in the descriptor"))]
    ServiceNotFound { service: String },

    #[snafu(display("component {component:?} is not defined in service {service:?}"))]
    ComponentNotFound { service: String, component: String },

    #[snafu(display("failed to materialize descriptor"))]
    Materialize { source: materialize::Error },

    #[snafu(display("failed to render output as JSON"))]
    RenderJson { source: serde_json::Error },

    #[snafu(display("failed to render output as YAML"))]
    RenderYaml { source: serde_yaml::Error },

    #[snafu(display("failed to write output"))]
    WriteOutput { source: std::io::Error },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

#[derive(Debug, clap::Parser)]
#[command(
    name = "kerberos-descriptor",
    author,
    version,
    about = "Resolves the Kerberos identities and configurations of a cluster descriptor"
)]
pub struct Opts {
    /// Descriptor file. Files ending in `.json` are read as JSON, everything else as YAML.
    #[arg(long, short = 'd', value_name = "FILE", env = "KERBEROS_DESCRIPTOR_FILE")]
    pub descriptor: PathBuf,

    /// Descriptor files laid on top of the base descriptor, in the given order.
    #[arg(long, value_name = "FILE")]
    pub overlay: Vec<PathBuf>,

    /// Cluster configuration (type to property to value) used to expand variables.
    #[arg(long, value_name = "FILE", env = "KERBEROS_DESCRIPTOR_CLUSTER_CONFIG")]
    pub cluster_config: Option<PathBuf>,

    /// Resolve from the point of view of this service.
    #[arg(long)]
    pub service: Option<String>,

    /// Resolve from the point of view of this component of `--service`.
    #[arg(long, requires = "service")]
    pub component: Option<String>,

    /// Print the combined descriptor instead of materializing it.
    #[arg(long)]
    pub descriptor_only: bool,

    #[arg(long, value_enum, default_value_t)]
    pub output: OutputFormat,
}

/// Loads, combines and resolves the descriptor described by `opts` and writes the result.
pub fn run(opts: &Opts, out: &mut impl Write) -> Result<()> {
    let mut descriptor =
        KerberosDescriptor::from_file(&opts.descriptor).context(LoadDescriptorSnafu)?;

    for overlay in &opts.overlay {
        debug!(overlay = %overlay.display(), "applying descriptor overlay");
        let overlay = KerberosDescriptor::from_file(overlay).context(LoadDescriptorSnafu)?;
        descriptor.update(&overlay);
    }

    if opts.descriptor_only {
        let rendered = match opts.output {
            OutputFormat::Json => descriptor.to_json_string(),
            OutputFormat::Yaml => descriptor.to_yaml_string(),
        }
        .context(RenderDescriptorSnafu)?;
        return write_output(out, &rendered);
    }

    let cluster_configurations = match &opts.cluster_config {
        Some(path) => load_cluster_configurations(path)?,
        None => Configurations::new(),
    };

    let materialized = materialize_scope(
        &descriptor,
        opts.service.as_deref(),
        opts.component.as_deref(),
        &cluster_configurations,
    )?;
    info!(
        identities = materialized.identities.len(),
        configurations = materialized.configurations.len(),
        "resolved descriptor"
    );

    let rendered = match opts.output {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&materialized).context(RenderJsonSnafu)?
        }
        OutputFormat::Yaml => serde_yaml::to_string(&materialized).context(RenderYamlSnafu)?,
    };
    write_output(out, &rendered)
}

fn materialize_scope(
    descriptor: &KerberosDescriptor,
    service: Option<&str>,
    component: Option<&str>,
    cluster_configurations: &Configurations,
) -> Result<MaterializedScope> {
    let mut scope = descriptor.scope();

    if let Some(service) = service {
        scope = scope
            .service(service)
            .context(ServiceNotFoundSnafu { service })?;

        if let Some(component) = component {
            scope = scope
                .component(component)
                .context(ComponentNotFoundSnafu { service, component })?;
        }
    }

    scope
        .materialize(cluster_configurations)
        .context(MaterializeSnafu)
}

fn load_cluster_configurations(path: &std::path::Path) -> Result<Configurations> {
    let contents = std::fs::read_to_string(path).context(ReadClusterConfigSnafu { path })?;

    if path.extension() == Some(OsStr::new("json")) {
        serde_json::from_str(&contents).context(ParseClusterConfigJsonSnafu { path })
    } else {
        serde_yaml::from_str(&contents).context(ParseClusterConfigYamlSnafu { path })
    }
}

fn write_output(out: &mut impl Write, rendered: &str) -> Result<()> {
    out.write_all(rendered.as_bytes()).context(WriteOutputSnafu)?;
    if !rendered.ends_with('\n') {
        writeln!(out).context(WriteOutputSnafu)?;
    }
    Ok(())
}
