//! Pipelines for Spin/WASI applications.
//!
//! Every action runs in the same build environment: a plain base image
//! with the toolchains from `.toolchains` installed on top. Spin is always
//! installed, whether the manifest names it or not.

use tracing::info;

use crate::config::{Config, WasiConfig};
use crate::error::Result;
use crate::source::SourceTree;
use crate::toolchain::{Platform, ToolchainKind, ToolchainSet};
use crate::{Pipeline, Service};

const APP_DIR: &str = "/app";
const DOCKER_CONFIG_PATH: &str = "/root/.docker/config.json";

/// What to do with the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WasiAction {
    /// `spin build`.
    Build,
    /// Build, then serve with `spin up`.
    Up,
    /// `spin registry push` to an OCI reference.
    Push { reference: String },
}

/// A Spin application and its build environment.
#[derive(Debug, Clone)]
pub struct Wasi {
    config: WasiConfig,
    toolchains: ToolchainSet,
    platform: Platform,
}

impl Wasi {
    /// Resolves the toolchains for `tree`.
    pub fn new<T: SourceTree + ?Sized>(tree: &T, config: &Config, platform: Platform) -> Result<Self> {
        let toolchains = config
            .resolver()
            .resolve_tree(tree)?
            .ensure(ToolchainKind::Spin, &config.toolchains);

        Ok(Self {
            config: config.wasi.clone(),
            toolchains,
            platform,
        })
    }

    pub fn toolchains(&self) -> &ToolchainSet {
        &self.toolchains
    }

    // Installs run in /tmp so downloads stay out of the source mount.
    fn env_commands(&self) -> Vec<String> {
        let mut commands = vec![
            "apt-get update".to_string(),
            "apt-get install -y wget curl build-essential".to_string(),
            "cd /tmp".to_string(),
        ];
        commands.extend(self.toolchains.install_steps(&self.platform));
        commands.push(format!("cd {}", APP_DIR));
        commands
    }

    /// Builds the application with `spin build`.
    pub fn build(&self, p: &mut Pipeline, args: &[String]) {
        let src = p.dir(".");
        let mut task = p
            .task("spin-build")
            .container(&self.config.base_image)
            .mount(&src, APP_DIR)
            .workdir(APP_DIR);
        for cmd in self.env_commands() {
            task = task.run(&cmd);
        }
        task.run(&shell(&["spin", "build"], args))
            .output("app", APP_DIR);
    }

    /// Serves the application on the configured port.
    pub fn up(&self, p: &mut Pipeline, args: &[String]) -> Service {
        let src = p.dir(".");
        let listen = format!("--listen=0.0.0.0:{}", self.config.port);
        let mut spin_args = vec!["spin", "up", listen.as_str()];
        spin_args.extend(args.iter().map(String::as_str));

        let mut svc = p
            .service("spin")
            .container(&self.config.base_image)
            .mount(&src, APP_DIR)
            .workdir(APP_DIR);
        for cmd in self.env_commands() {
            svc = svc.run(&cmd);
        }
        svc.run(&shell(&["spin", "build"], args))
            .expose(self.config.port)
            .args(&spin_args)
            .handle()
    }

    /// Pushes the application to `reference`, authenticating with the
    /// configured Docker config secret if there is one.
    pub fn push(&self, p: &mut Pipeline, reference: &str, args: &[String]) {
        let src = p.dir(".");
        let secret = self
            .config
            .docker_config_secret
            .as_deref()
            .map(|name| p.secret(name));

        let mut task = p
            .task("spin-push")
            .container(&self.config.base_image)
            .mount(&src, APP_DIR)
            .workdir(APP_DIR);
        if let Some(secret) = &secret {
            task = task.mount_secret(secret, DOCKER_CONFIG_PATH);
        }
        for cmd in self.env_commands() {
            task = task.run(&cmd);
        }
        task.run(&shell(&["spin", "registry", "push", reference], args));
    }

    /// A pipeline running `action`.
    pub fn pipeline(&self, action: &WasiAction, args: &[String]) -> Pipeline {
        let mut p = Pipeline::new();
        match action {
            WasiAction::Build => self.build(&mut p, args),
            WasiAction::Up => {
                self.up(&mut p, args);
            }
            WasiAction::Push { reference } => self.push(&mut p, reference, args),
        }
        info!(?action, toolchains = self.toolchains.len(), "built wasi pipeline");
        p
    }
}

// Every word is quoted, so caller arguments reach spin unsplit.
fn shell(cmd: &[&str], args: &[String]) -> String {
    shell_words::join(cmd.iter().copied().chain(args.iter().map(String::as_str)))
}
