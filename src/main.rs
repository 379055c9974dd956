use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use devstack::caddy::{Caddy, ProxyMode};
use devstack::config::{self, DEFAULT_CONFIG_PATH};
use devstack::crud::Crud;
use devstack::source::LocalDir;
use devstack::toolchain::{Arch, MissingManifest, ParsePolicy, Platform};
use devstack::wasi::{Wasi, WasiAction};
use devstack::{Pipeline, Service};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file; defaults apply when it does not exist.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the `.toolchains` manifest of a source tree.
    Toolchains {
        #[arg(long, default_value = ".")]
        source: PathBuf,

        /// Reject malformed manifest lines.
        #[arg(long)]
        strict: bool,

        /// Fail when the tree has no manifest.
        #[arg(long)]
        require_manifest: bool,
    },

    /// Render a Caddyfile.
    Caddyfile {
        #[arg(long, value_enum, default_value_t = Mode::Port)]
        mode: Mode,

        /// Upstream to route to, in order.
        #[arg(long = "bind", value_name = "[LABEL=]NAME:PORT")]
        bindings: Vec<String>,
    },

    /// Emit a pipeline as JSON on stdout.
    #[command(subcommand)]
    Emit(Emit),
}

#[derive(Subcommand)]
enum Emit {
    /// The crud web stack.
    Crud {
        #[arg(long, default_value = ".")]
        source: PathBuf,
    },

    /// A Spin application.
    Wasi {
        #[arg(long, default_value = ".")]
        source: PathBuf,

        #[arg(long, value_enum, default_value_t = Action::Build)]
        action: Action,

        /// OCI reference to push to.
        #[arg(long, required_if_eq("action", "push"))]
        oci: Option<String>,

        /// Build container architecture; defaults to the host.
        #[arg(long, value_enum)]
        arch: Option<CliArch>,

        /// Extra arguments passed to spin.
        #[arg(last = true)]
        args: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Domain,
    Port,
}

impl From<Mode> for ProxyMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Domain => ProxyMode::Domain,
            Mode::Port => ProxyMode::Port,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Action {
    Build,
    Up,
    Push,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliArch {
    Amd64,
    Arm64,
}

impl From<CliArch> for Arch {
    fn from(arch: CliArch) -> Self {
        match arch {
            CliArch::Amd64 => Arch::Amd64,
            CliArch::Arm64 => Arch::Arm64,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "devstack=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = config::load_or_default(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    let mut out = io::stdout().lock();
    match cli.command {
        Command::Toolchains {
            source,
            strict,
            require_manifest,
        } => {
            let mut resolver = config.resolver();
            if strict {
                resolver = resolver.parse_policy(ParsePolicy::Strict);
            }
            if require_manifest {
                resolver = resolver.missing_manifest(MissingManifest::Fail);
            }
            let set = resolver.resolve_tree(&LocalDir::new(&source))?;
            for req in set.iter() {
                writeln!(out, "{}={}", req.name, req.version)?;
            }
        }
        Command::Caddyfile { mode, bindings } => {
            write!(out, "{}", caddyfile(mode.into(), &bindings)?.render())?;
        }
        Command::Emit(Emit::Crud { source }) => {
            let crud = Crud::new(&LocalDir::new(&source), &config)?;
            crud.pipeline().emit_to(&mut out)?;
        }
        Command::Emit(Emit::Wasi {
            source,
            action,
            oci,
            arch,
            args,
        }) => {
            let platform = arch.map(|a| Platform::new(a.into())).unwrap_or_else(Platform::host);
            let action = match action {
                Action::Build => WasiAction::Build,
                Action::Up => WasiAction::Up,
                Action::Push => match oci {
                    Some(reference) => WasiAction::Push { reference },
                    None => bail!("--oci is required to push"),
                },
            };
            let wasi = Wasi::new(&LocalDir::new(&source), &config, platform)?;
            wasi.pipeline(&action, &args).emit_to(&mut out)?;
        }
    }
    Ok(())
}

/// Builds a proxy from `[LABEL=]NAME:PORT` bindings.
fn caddyfile(mode: ProxyMode, bindings: &[String]) -> Result<Caddy> {
    // Handles only need a name to render; the pipeline is discarded.
    let mut pipeline = Pipeline::new();
    let mut handles: HashMap<String, Service> = HashMap::new();
    let mut caddy = Caddy::new(mode);

    for binding in bindings {
        let (label, upstream) = match binding.split_once('=') {
            Some((label, upstream)) => (Some(label), upstream),
            None => (None, binding.as_str()),
        };
        let Some((name, port)) = upstream.rsplit_once(':') else {
            bail!("binding {:?} is not [LABEL=]NAME:PORT", binding);
        };
        if name.is_empty() {
            bail!("binding {:?} has no upstream name", binding);
        }
        let port: i32 = port
            .parse()
            .with_context(|| format!("binding {:?} has an invalid port", binding))?;

        let handle = handles
            .entry(name.to_string())
            .or_insert_with(|| pipeline.service(name).container("scratch").handle());
        caddy = caddy.with_service(handle, label, name, port);
    }
    Ok(caddy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(mode: ProxyMode, bindings: &[&str]) -> Result<String> {
        let bindings: Vec<String> = bindings.iter().map(|b| b.to_string()).collect();
        Ok(caddyfile(mode, &bindings)?.render())
    }

    #[test]
    fn test_caddyfile_bindings() {
        let out = render(ProxyMode::Domain, &["api.local=backend:8080", "frontend:3000"]).unwrap();
        assert_eq!(
            out,
            "http://api.local {\n\treverse_proxy backend:8080\n}\n\nhttp://frontend {\n\treverse_proxy frontend:3000\n}\n\n"
        );
    }

    #[test]
    fn test_caddyfile_same_upstream_twice() {
        let out = render(ProxyMode::Port, &["backend:8080", "backend:8081"]).unwrap();
        assert!(out.contains(":8081 {\n\treverse_proxy backend:8081"));
    }

    #[test]
    fn test_caddyfile_rejects_malformed_binding() {
        assert!(render(ProxyMode::Port, &["backend"]).is_err());
        assert!(render(ProxyMode::Port, &["backend:http"]).is_err());
        assert!(render(ProxyMode::Port, &[":8080"]).is_err());
    }

    #[test]
    fn test_cli_parses_wasi_push() {
        let cli = Cli::try_parse_from([
            "devstack", "emit", "wasi", "--action", "push", "--oci", "ttl.sh/app:1h", "--", "--insecure",
        ])
        .unwrap();
        match cli.command {
            Command::Emit(Emit::Wasi { oci, args, .. }) => {
                assert_eq!(oci.as_deref(), Some("ttl.sh/app:1h"));
                assert_eq!(args, vec!["--insecure"]);
            }
            _ => panic!("expected emit wasi"),
        }
    }

    #[test]
    fn test_cli_push_requires_oci() {
        assert!(Cli::try_parse_from(["devstack", "emit", "wasi", "--action", "push"]).is_err());
    }
}
