//! Pipeline for the crud web stack.
//!
//! The source tree is expected to look like:
//!
//! ```text
//! .toolchains        optional go/postgres pins
//! backend/           Go service, with sql/schema.sql
//! ui/                current frontend (pnpm)
//! ui-old/            optional legacy frontend (yarn)
//! ```
//!
//! ```text
//! [backend-build] ─> (backend) ─> (db)
//! [frontend-generate] ─> (frontend)
//! (frontend-old)
//! (caddy) ─> backend:8080, backend-pprof:8081, frontend:3000, frontend-old:3001
//! (prometheus) ─> backend:8081
//! ```

use tracing::{info, warn};

use crate::caddy::{Caddy, ProxyMode};
use crate::config::{CaddyConfig, Config, CrudConfig};
use crate::error::Result;
use crate::source::SourceTree;
use crate::toolchain::{ToolchainKind, ToolchainSet};
use crate::{Pipeline, Service};

const BACKEND_PORT: u16 = 8080;
const PPROF_PORT: u16 = 8081;
const FRONTEND_PORT: u16 = 3000;
const FRONTEND_OLD_PORT: u16 = 3001;
const PROMETHEUS_PORT: u16 = 9090;

/// Hostname the backend expects its database under.
pub const DATABASE_HOST: &str = "db.postgres.svc.cluster.local";

const SCHEMA_PATH: &str = "backend/sql/schema.sql";
const PROMETHEUS_CONFIG_PATH: &str = "/etc/prometheus/prometheus.yml";

const PROMETHEUS_CONFIG: &str = r#"---
scrape_configs:
- job_name: 'backend'
  scrape_interval: 15s
  metrics_path: '/metrics'
  static_configs:
    - targets: ['backend:8081']
"#;

const SOURCE_MOUNT: &str = "/src";
const WORK_DIR: &str = "/work";

// The legacy UI pins an auth module that still default-imports nanoid.
const NANOID_PATCH: &str = r#"sed -i "s/import nanoid from 'nanoid'/import { nanoid } from 'nanoid'/g" node_modules/@nuxtjs/auth/lib/schemes/oauth2.js"#;

/// The crud stack: backend, database, frontends, metrics and proxy.
#[derive(Debug, Clone)]
pub struct Crud {
    config: CrudConfig,
    caddy: CaddyConfig,
    toolchains: ToolchainSet,
    schema: Option<String>,
    old_ui: bool,
}

impl Crud {
    /// Reads the toolchain manifest and layout of `tree`.
    ///
    /// Go and Postgres are always resolved; the manifest may pin them.
    pub fn new<T: SourceTree + ?Sized>(tree: &T, config: &Config) -> Result<Self> {
        let toolchains = config
            .resolver()
            .base(&[ToolchainKind::Go, ToolchainKind::Postgres])
            .resolve_tree(tree)?;
        let schema = tree.read_file(SCHEMA_PATH)?;
        if schema.is_none() {
            warn!(path = SCHEMA_PATH, "no database schema, db starts empty");
        }
        let old_ui = tree.contains("ui-old")?;

        Ok(Self {
            config: config.crud.clone(),
            caddy: config.caddy.clone(),
            toolchains,
            schema,
            old_ui,
        })
    }

    pub fn toolchains(&self) -> &ToolchainSet {
        &self.toolchains
    }

    /// Whether the legacy `ui-old` frontend is present.
    pub fn has_old_ui(&self) -> bool {
        self.old_ui
    }

    fn version(&self, kind: ToolchainKind) -> &str {
        // Both kinds are base toolchains, so they are always resolved.
        self.toolchains.version(kind).unwrap_or_default()
    }

    /// Compiles the backend binary.
    pub fn backend_build(&self, p: &mut Pipeline) {
        let src = p.dir("backend");
        let mod_cache = p.cache("go-mod");
        let build_cache = p.cache("go-build");
        let go = self.version(ToolchainKind::Go);
        let name = &self.config.app_name;

        p.task("backend-build")
            .container(&format!("golang:{}-alpine", go))
            .mount(&src, "/src")
            .mount_cache(&mod_cache, "/go/pkg/mod")
            .mount_cache(&build_cache, "/root/.cache/go-build")
            .workdir("/src")
            .env("CGO_ENABLED", "0")
            .inputs(&["**/*.go", "go.mod", "go.sum"])
            .run(&format!("go build -o /out/{} .", name))
            .output("binary", &format!("/out/{}", name));
    }

    /// Postgres seeded with the backend schema, when there is one.
    pub fn database(&self, p: &mut Pipeline) -> Service {
        let image = ToolchainKind::Postgres
            .image(self.version(ToolchainKind::Postgres))
            .unwrap_or_default();

        let mut db = p
            .service("db")
            .container(&image)
            .env("POSTGRES_DB", &self.config.app_name)
            .env("POSTGRES_PASSWORD", &self.config.db_password)
            .env("POSTGRES_USER", "postgres")
            .env("PGDATA", "/data/postgresql/pgdata2")
            .expose(5432);
        if let Some(schema) = &self.schema {
            db = db.file("/docker-entrypoint-initdb.d/schema.sql", schema);
        }
        db.handle()
    }

    /// The backend service, bound to its database. Local runs disable auth.
    pub fn backend(&self, p: &mut Pipeline, db: &Service) -> Service {
        self.backend_build(p);
        let binary = format!("/usr/local/bin/{}", self.config.app_name);

        p.service("backend")
            .container("alpine:latest")
            .env("GODEBUG", "gctrace=1")
            .env("LOCAL_AUTH_ENABLED", "true")
            .input_from("backend-build", "binary", &binary)
            .entrypoint(&[binary.as_str()])
            .expose(BACKEND_PORT)
            .expose(PPROF_PORT)
            .bind(DATABASE_HOST, db)
            .handle()
    }

    /// Generates the static frontend.
    pub fn frontend_generate(&self, p: &mut Pipeline) {
        let src = p.dir("ui");
        let cache = p.cache("pnpm-cache");

        p.task("frontend-generate")
            .container(&self.node_image(&self.config.node_version))
            .mount_cache(&cache, "/root/.pnpm-store")
            .mount(&src, SOURCE_MOUNT)
            .workdir(WORK_DIR)
            .run(&copy_source())
            .run(&format!("npm install -g pnpm@{}", self.config.pnpm_version))
            .run("pnpm install")
            .run("pnpm generate --dotenv .env.local")
            .output("public", "/work/.output/public");
    }

    /// Serves the generated frontend.
    pub fn frontend(&self, p: &mut Pipeline) -> Service {
        self.frontend_generate(p);
        let cache = p.cache("pnpm-cache");
        let port = FRONTEND_PORT.to_string();

        p.service("frontend")
            .container(&self.node_image(&self.config.node_version))
            .mount_cache(&cache, "/root/.pnpm-store")
            .input_from("frontend-generate", "public", "/app")
            .workdir("/app")
            .run(&format!("npm install -g pnpm@{}", self.config.pnpm_version))
            .run("pnpm add serve")
            .expose(FRONTEND_PORT)
            .args(&["npx", "serve", ".", "--debug", "--cors", "--no-port-switching", "-l", port.as_str()])
            .handle()
    }

    /// Builds and serves the legacy frontend.
    pub fn frontend_old(&self, p: &mut Pipeline) -> Service {
        let src = p.dir("ui-old");
        let cache = p.cache("global-yarn-cache");
        let port = FRONTEND_OLD_PORT.to_string();

        p.service("frontend-old")
            .container(&self.node_image(&self.config.old_node_version))
            .mount_cache(&cache, "/usr/local/share/.cache/yarn")
            .mount(&src, SOURCE_MOUNT)
            .workdir(WORK_DIR)
            .run(&copy_source())
            .run("yarn install")
            .run(NANOID_PATCH)
            .run("yarn generate --dotenv .env.local")
            .run("yarn add serve")
            .expose(FRONTEND_OLD_PORT)
            .args(&["npx", "serve", "dist", "--debug", "--cors", "--no-port-switching", "-l", port.as_str()])
            .handle()
    }

    /// Prometheus scraping the backend metrics port.
    pub fn prometheus(&self, p: &mut Pipeline, backend: &Service) -> Service {
        let flag = format!("--config.file={}", PROMETHEUS_CONFIG_PATH);
        p.service("prometheus")
            .container("prom/prometheus")
            .file(PROMETHEUS_CONFIG_PATH, PROMETHEUS_CONFIG)
            .bind("backend", backend)
            .expose(PROMETHEUS_PORT)
            .args(&[flag.as_str()])
            .handle()
    }

    /// Runs the whole stack behind a Caddy front door.
    pub fn serve(&self, p: &mut Pipeline) -> Service {
        self.stack(p).0
    }

    // Returns the proxy and the backend.
    fn stack(&self, p: &mut Pipeline) -> (Service, Service) {
        let db = self.database(p);
        let backend = self.backend(p, &db);
        let frontend = self.frontend(p);

        let mut caddy = Caddy::new(self.caddy.mode)
            .image(&self.caddy.image)
            .with_service(&backend, self.label("backend"), "backend", BACKEND_PORT.into())
            .with_service(&backend, self.label("backend-pprof"), "backend-pprof", PPROF_PORT.into())
            .with_service(&frontend, self.label("frontend"), "frontend", FRONTEND_PORT.into());

        if self.old_ui {
            let old = self.frontend_old(p);
            caddy = caddy.with_service(
                &old,
                self.label("frontend-old"),
                "frontend-old",
                FRONTEND_OLD_PORT.into(),
            );
        }

        (caddy.service(p, "caddy"), backend)
    }

    /// The full pipeline: the served stack plus metrics.
    pub fn pipeline(&self) -> Pipeline {
        let mut p = Pipeline::new();
        let (_, backend) = self.stack(&mut p);
        self.prometheus(&mut p, &backend);
        info!(old_ui = self.old_ui, "built crud pipeline");
        p
    }

    fn label(&self, name: &'static str) -> Option<&'static str> {
        match self.caddy.mode {
            ProxyMode::Domain => Some(name),
            ProxyMode::Port => None,
        }
    }

    fn node_image(&self, version: &str) -> String {
        ToolchainKind::Node.image(version).unwrap_or_default()
    }
}

// Installs write node_modules, so frontends build from a copy of the
// mounted checkout, without its node_modules.
fn copy_source() -> String {
    format!(
        "mkdir -p {work} && tar -C {src} --exclude=./node_modules -cf - . | tar -C {work} -xf -",
        src = SOURCE_MOUNT,
        work = WORK_DIR
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryTree;

    fn tree(with_old_ui: bool) -> MemoryTree {
        let tree = MemoryTree::new()
            .file("backend/main.go", "package main")
            .file("backend/sql/schema.sql", "create table items (id serial);")
            .file("ui/package.json", "{}");
        if with_old_ui {
            tree.file("ui-old/package.json", "{}")
        } else {
            tree
        }
    }

    fn emit(p: &Pipeline) -> serde_json::Value {
        let mut buf = Vec::new();
        p.emit_to(&mut buf).unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    fn service<'a>(json: &'a serde_json::Value, name: &str) -> &'a serde_json::Value {
        json["services"]
            .as_array()
            .unwrap()
            .iter()
            .find(|s| s["name"] == name)
            .unwrap_or_else(|| panic!("no service {name}"))
    }

    #[test]
    fn test_defaults_without_manifest() {
        let crud = Crud::new(&tree(false), &Config::default()).unwrap();
        assert_eq!(crud.toolchains().get("go"), Some("1.23.6"));
        assert_eq!(crud.toolchains().get("postgres"), Some("17.4"));
        assert!(!crud.has_old_ui());
    }

    #[test]
    fn test_manifest_pins_versions() {
        let tree = tree(false).file(".toolchains", "golang=1.22.3\npostgresql=16.2\n");
        let crud = Crud::new(&tree, &Config::default()).unwrap();

        let json = emit(&crud.pipeline());
        let build = &json["tasks"][0];
        assert_eq!(build["name"], "backend-build");
        assert_eq!(build["container"], "golang:1.22.3-alpine");
        assert_eq!(service(&json, "db")["container"], "postgres:16.2");
    }

    #[test]
    fn test_unknown_toolchain_aborts() {
        let tree = tree(false).file(".toolchains", "ruby\n");
        assert!(Crud::new(&tree, &Config::default()).is_err());
    }

    #[test]
    fn test_pipeline_without_old_ui() {
        let crud = Crud::new(&tree(false), &Config::default()).unwrap();
        let p = crud.pipeline();
        assert_eq!(p.service_names(), vec!["db", "backend", "frontend", "caddy", "prometheus"]);
        assert_eq!(p.task_names(), vec!["backend-build", "frontend-generate"]);

        let json = emit(&p);
        let caddy = service(&json, "caddy");
        assert_eq!(caddy["ports"], serde_json::json!([8080, 8081, 3000]));
        let caddyfile = caddy["files"]["/opt/caddy/caddyfile"].as_str().unwrap();
        assert!(caddyfile.starts_with(":8080 {"));
        assert!(caddyfile.contains("reverse_proxy backend-pprof:8081"));
        assert!(!caddyfile.contains("frontend-old"));
    }

    #[test]
    fn test_pipeline_with_old_ui() {
        let crud = Crud::new(&tree(true), &Config::default()).unwrap();
        assert!(crud.has_old_ui());

        let json = emit(&crud.pipeline());
        let old = service(&json, "frontend-old");
        assert_eq!(old["container"], "node:16.13.1-alpine");
        assert!(old["command"].as_str().unwrap().contains("import { nanoid } from 'nanoid'"));

        let caddy = service(&json, "caddy");
        let aliases: Vec<&str> = caddy["services"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["alias"].as_str().unwrap())
            .collect();
        assert_eq!(aliases, vec!["backend", "backend-pprof", "frontend", "frontend-old"]);
    }

    #[test]
    fn test_backend_wiring() {
        let crud = Crud::new(&tree(false), &Config::default()).unwrap();
        let json = emit(&crud.pipeline());

        let backend = service(&json, "backend");
        assert_eq!(backend["services"][0]["alias"], DATABASE_HOST);
        assert_eq!(backend["services"][0]["service"], "db");
        assert_eq!(backend["env"]["LOCAL_AUTH_ENABLED"], "true");
        assert_eq!(backend["task_inputs"][0]["dest"], "/usr/local/bin/crud");
        assert_eq!(backend["entrypoint"][0], "/usr/local/bin/crud");

        let db = service(&json, "db");
        assert_eq!(db["env"]["POSTGRES_DB"], "crud");
        assert_eq!(
            db["files"]["/docker-entrypoint-initdb.d/schema.sql"],
            "create table items (id serial);"
        );
    }

    #[test]
    fn test_database_without_schema() {
        let tree = MemoryTree::new().file("backend/main.go", "package main");
        let crud = Crud::new(&tree, &Config::default()).unwrap();

        let mut p = Pipeline::new();
        crud.database(&mut p);
        let json = emit(&p);
        assert!(service(&json, "db").get("files").is_none());
    }

    #[test]
    fn test_frontends_build_from_a_copy() {
        let crud = Crud::new(&tree(true), &Config::default()).unwrap();
        let json = emit(&crud.pipeline());

        let generate = &json["tasks"][1];
        assert_eq!(generate["name"], "frontend-generate");
        let old = service(&json, "frontend-old");
        for (mounts, command) in [
            (&generate["mounts"], generate["command"].as_str().unwrap()),
            (&old["mounts"], old["command"].as_str().unwrap()),
        ] {
            let source = mounts
                .as_array()
                .unwrap()
                .iter()
                .find(|m| m["type"] == "directory")
                .unwrap();
            assert_eq!(source["path"], "/src");
            assert!(command.contains("tar -C /src --exclude=./node_modules -cf - . | tar -C /work -xf -"));
            assert!(!command.contains("rm -rf"));
        }
        assert_eq!(generate["outputs"]["public"], "/work/.output/public");
    }

    #[test]
    fn test_prometheus_scrapes_backend() {
        let crud = Crud::new(&tree(false), &Config::default()).unwrap();
        let json = emit(&crud.pipeline());

        let prom = service(&json, "prometheus");
        assert_eq!(prom["services"][0]["alias"], "backend");
        assert!(prom["files"][PROMETHEUS_CONFIG_PATH]
            .as_str()
            .unwrap()
            .contains("targets: ['backend:8081']"));
    }

    #[test]
    fn test_domain_mode_uses_labels() {
        let mut config = Config::default();
        config.caddy.mode = ProxyMode::Domain;
        let crud = Crud::new(&tree(false), &config).unwrap();

        let json = emit(&crud.pipeline());
        let caddy = service(&json, "caddy");
        let caddyfile = caddy["files"]["/opt/caddy/caddyfile"].as_str().unwrap();
        assert!(caddyfile.starts_with("http://backend {"));
        assert_eq!(caddy["ports"], serde_json::json!([80]));
    }
}
