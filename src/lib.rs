//! devstack - CI pipelines for the crud web stack and the WASI toolchain
//!
//! Pipelines are plain data: tasks (containers that run to completion) and
//! services (containers that keep running), wired together with mounts,
//! service bindings and artifact inputs. The pipeline is emitted as JSON
//! and executed by an external runner.
//!
//! # Simple usage
//!
//! ```rust
//! use devstack::Pipeline;
//!
//! let mut p = Pipeline::new();
//! p.task("test").run("go test ./...");
//! p.task("build").run("go build -o app .").after(&["test"]);
//!
//! let mut out = Vec::new();
//! p.emit_to(&mut out).unwrap();
//! ```
//!
//! # Services and bindings
//!
//! ```rust
//! use devstack::Pipeline;
//!
//! let mut p = Pipeline::new();
//! let db = p
//!     .service("db")
//!     .container("postgres:17.4")
//!     .env("POSTGRES_PASSWORD", "secret")
//!     .expose(5432)
//!     .handle();
//!
//! p.task("migrate")
//!     .container("golang:1.23.6-alpine")
//!     .bind("db.postgres.svc.cluster.local", &db)
//!     .run("go run ./cmd/migrate");
//!
//! let mut out = Vec::new();
//! p.emit_to(&mut out).unwrap();
//! ```

pub mod caddy;
pub mod config;
pub mod crud;
pub mod error;
pub mod source;
pub mod toolchain;
pub mod wasi;

pub use error::{Error, Result};

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use tracing::info;

use crate::toolchain::{Platform, ToolchainSet};

// =============================================================================
// RESOURCES
// =============================================================================

/// A directory resource that can be mounted into containers.
#[derive(Clone)]
pub struct Directory {
    path: String,
}

impl Directory {
    /// Returns the resource ID for this directory.
    pub fn id(&self) -> String {
        format!("src:{}", self.path)
    }
}

/// A named cache volume that persists between runs.
#[derive(Clone)]
pub struct CacheVolume {
    name: String,
}

impl CacheVolume {
    /// Returns the resource ID for this cache.
    pub fn id(&self) -> String {
        self.name.clone()
    }
}

/// A secret the runner resolves by name and mounts as a file.
#[derive(Clone)]
pub struct Secret {
    name: String,
}

impl Secret {
    /// Returns the resource ID for this secret.
    pub fn id(&self) -> String {
        format!("secret:{}", self.name)
    }
}

/// Handle to a service defined in a pipeline.
///
/// Handles are only names; the pipeline owns the service definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Service {
    name: String,
}

impl Service {
    /// Returns the service name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

// =============================================================================
// MOUNTS, BINDINGS, INPUTS
// =============================================================================

#[derive(Clone)]
struct Mount {
    resource: String,
    path: String,
    mount_type: String,
}

#[derive(Clone)]
struct Binding {
    alias: String,
    service: String,
}

#[derive(Clone)]
struct TaskInput {
    task: String,
    output: String,
    dest: String,
}

fn check_container_path(path: &str) {
    if path.is_empty() || !path.starts_with('/') {
        panic!("container mount path must be absolute (start with /)");
    }
}

// =============================================================================
// TASK
// =============================================================================

/// A task in the pipeline.
pub struct Task<'a> {
    pipeline: &'a mut Pipeline,
    index: usize,
}

#[derive(Clone, Default)]
struct TaskData {
    name: String,
    commands: Vec<String>,
    container: Option<String>,
    workdir: Option<String>,
    env: HashMap<String, String>,
    mounts: Vec<Mount>,
    files: BTreeMap<String, String>,
    inputs: Vec<String>,
    outputs: HashMap<String, String>,
    task_inputs: Vec<TaskInput>,
    depends_on: Vec<String>,
    bindings: Vec<Binding>,
}

impl<'a> Task<'a> {
    fn data(&mut self) -> &mut TaskData {
        &mut self.pipeline.tasks[self.index]
    }

    /// Returns the task name.
    pub fn name(&self) -> &str {
        &self.pipeline.tasks[self.index].name
    }

    /// Appends a command. Commands run in order in a single shell.
    pub fn run(mut self, cmd: &str) -> Self {
        if cmd.is_empty() {
            panic!("command cannot be empty");
        }
        self.data().commands.push(cmd.to_string());
        self
    }

    /// Appends the install steps of every toolchain in `set`.
    pub fn toolchains(mut self, set: &ToolchainSet, platform: &Platform) -> Self {
        self.data().commands.extend(set.install_steps(platform));
        self
    }

    /// Sets the container image for this task.
    pub fn container(mut self, image: &str) -> Self {
        if image.is_empty() {
            panic!("container image cannot be empty");
        }
        self.data().container = Some(image.to_string());
        self
    }

    /// Mounts a directory into the container.
    pub fn mount(mut self, dir: &Directory, path: &str) -> Self {
        check_container_path(path);
        self.data().mounts.push(Mount {
            resource: dir.id(),
            path: path.to_string(),
            mount_type: "directory".to_string(),
        });
        self
    }

    /// Mounts a cache volume into the container.
    pub fn mount_cache(mut self, cache: &CacheVolume, path: &str) -> Self {
        check_container_path(path);
        self.data().mounts.push(Mount {
            resource: cache.id(),
            path: path.to_string(),
            mount_type: "cache".to_string(),
        });
        self
    }

    /// Mounts a secret as a file in the container.
    pub fn mount_secret(mut self, secret: &Secret, path: &str) -> Self {
        check_container_path(path);
        self.data().mounts.push(Mount {
            resource: secret.id(),
            path: path.to_string(),
            mount_type: "secret".to_string(),
        });
        self
    }

    /// Sets the working directory inside the container.
    pub fn workdir(mut self, path: &str) -> Self {
        if !path.starts_with('/') {
            panic!("container working directory must be absolute (start with /)");
        }
        self.data().workdir = Some(path.to_string());
        self
    }

    /// Sets an environment variable.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        if key.is_empty() {
            panic!("environment variable key cannot be empty");
        }
        self.data().env.insert(key.to_string(), value.to_string());
        self
    }

    /// Writes a file with the given contents before the commands run.
    pub fn file(mut self, path: &str, contents: &str) -> Self {
        check_container_path(path);
        self.data()
            .files
            .insert(path.to_string(), contents.to_string());
        self
    }

    /// Sets input file patterns for caching.
    pub fn inputs(mut self, patterns: &[&str]) -> Self {
        self.data()
            .inputs
            .extend(patterns.iter().map(|s| s.to_string()));
        self
    }

    /// Sets a named output path.
    pub fn output(mut self, name: &str, path: &str) -> Self {
        if name.is_empty() {
            panic!("output name cannot be empty");
        }
        if path.is_empty() {
            panic!("output path cannot be empty");
        }
        self.data()
            .outputs
            .insert(name.to_string(), path.to_string());
        self
    }

    /// Makes the `output` of `task` available at `dest` and runs after it.
    pub fn input_from(mut self, task: &str, output: &str, dest: &str) -> Self {
        check_container_path(dest);
        let data = self.data();
        data.task_inputs.push(TaskInput {
            task: task.to_string(),
            output: output.to_string(),
            dest: dest.to_string(),
        });
        if !data.depends_on.iter().any(|d| d == task) {
            data.depends_on.push(task.to_string());
        }
        self
    }

    /// Sets dependencies - this task runs after the named tasks.
    pub fn after(mut self, tasks: &[&str]) -> Self {
        self.data()
            .depends_on
            .extend(tasks.iter().map(|s| s.to_string()));
        self
    }

    /// Makes `service` reachable from this task under the hostname `alias`.
    pub fn bind(mut self, alias: &str, service: &Service) -> Self {
        if alias.is_empty() {
            panic!("service alias cannot be empty");
        }
        self.data().bindings.push(Binding {
            alias: alias.to_string(),
            service: service.name.clone(),
        });
        self
    }
}

// =============================================================================
// SERVICE
// =============================================================================

/// A long-running container in the pipeline.
pub struct ServiceBuilder<'a> {
    pipeline: &'a mut Pipeline,
    index: usize,
}

#[derive(Clone, Default)]
struct ServiceData {
    name: String,
    container: Option<String>,
    workdir: Option<String>,
    env: HashMap<String, String>,
    mounts: Vec<Mount>,
    files: BTreeMap<String, String>,
    commands: Vec<String>,
    ports: Vec<u16>,
    entrypoint: Option<Vec<String>>,
    args: Vec<String>,
    task_inputs: Vec<TaskInput>,
    bindings: Vec<Binding>,
}

impl<'a> ServiceBuilder<'a> {
    fn data(&mut self) -> &mut ServiceData {
        &mut self.pipeline.services[self.index]
    }

    /// Sets the container image for this service.
    pub fn container(mut self, image: &str) -> Self {
        if image.is_empty() {
            panic!("container image cannot be empty");
        }
        self.data().container = Some(image.to_string());
        self
    }

    /// Appends a setup command, run once before the service starts.
    pub fn run(mut self, cmd: &str) -> Self {
        if cmd.is_empty() {
            panic!("command cannot be empty");
        }
        self.data().commands.push(cmd.to_string());
        self
    }

    /// Mounts a directory into the container.
    pub fn mount(mut self, dir: &Directory, path: &str) -> Self {
        check_container_path(path);
        self.data().mounts.push(Mount {
            resource: dir.id(),
            path: path.to_string(),
            mount_type: "directory".to_string(),
        });
        self
    }

    /// Mounts a cache volume into the container.
    pub fn mount_cache(mut self, cache: &CacheVolume, path: &str) -> Self {
        check_container_path(path);
        self.data().mounts.push(Mount {
            resource: cache.id(),
            path: path.to_string(),
            mount_type: "cache".to_string(),
        });
        self
    }

    /// Sets the working directory inside the container.
    pub fn workdir(mut self, path: &str) -> Self {
        if !path.starts_with('/') {
            panic!("container working directory must be absolute (start with /)");
        }
        self.data().workdir = Some(path.to_string());
        self
    }

    /// Sets an environment variable.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        if key.is_empty() {
            panic!("environment variable key cannot be empty");
        }
        self.data().env.insert(key.to_string(), value.to_string());
        self
    }

    /// Writes a file with the given contents before the service starts.
    pub fn file(mut self, path: &str, contents: &str) -> Self {
        check_container_path(path);
        self.data()
            .files
            .insert(path.to_string(), contents.to_string());
        self
    }

    /// Exposes a TCP port to bound containers.
    pub fn expose(mut self, port: u16) -> Self {
        let data = self.data();
        if !data.ports.contains(&port) {
            data.ports.push(port);
        }
        self
    }

    /// Overrides the image entrypoint.
    pub fn entrypoint(mut self, cmd: &[&str]) -> Self {
        self.data().entrypoint = Some(cmd.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Sets the arguments the service is started with.
    pub fn args(mut self, args: &[&str]) -> Self {
        self.data().args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Makes the `output` of `task` available at `dest`.
    pub fn input_from(mut self, task: &str, output: &str, dest: &str) -> Self {
        check_container_path(dest);
        self.data().task_inputs.push(TaskInput {
            task: task.to_string(),
            output: output.to_string(),
            dest: dest.to_string(),
        });
        self
    }

    /// Makes `service` reachable from this service under the hostname `alias`.
    pub fn bind(mut self, alias: &str, service: &Service) -> Self {
        if alias.is_empty() {
            panic!("service alias cannot be empty");
        }
        self.data().bindings.push(Binding {
            alias: alias.to_string(),
            service: service.name.clone(),
        });
        self
    }

    /// Finishes the definition and returns a handle to it.
    pub fn handle(self) -> Service {
        Service {
            name: self.pipeline.services[self.index].name.clone(),
        }
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

/// A CI pipeline with tasks, services and resources.
pub struct Pipeline {
    tasks: Vec<TaskData>,
    services: Vec<ServiceData>,
    dirs: Vec<Directory>,
    caches: Vec<CacheVolume>,
    secrets: Vec<Secret>,
}

impl Pipeline {
    /// Creates a new pipeline.
    pub fn new() -> Self {
        Pipeline {
            tasks: Vec::new(),
            services: Vec::new(),
            dirs: Vec::new(),
            caches: Vec::new(),
            secrets: Vec::new(),
        }
    }

    /// Creates a directory resource.
    pub fn dir(&mut self, path: &str) -> Directory {
        if path.is_empty() {
            panic!("directory path cannot be empty");
        }
        if let Some(existing) = self.dirs.iter().find(|d| d.path == path) {
            return existing.clone();
        }
        let dir = Directory {
            path: path.to_string(),
        };
        self.dirs.push(dir.clone());
        dir
    }

    /// Creates a named cache volume.
    pub fn cache(&mut self, name: &str) -> CacheVolume {
        if name.is_empty() {
            panic!("cache name cannot be empty");
        }
        let cache = CacheVolume {
            name: name.to_string(),
        };
        if !self.caches.iter().any(|c| c.name == name) {
            self.caches.push(cache.clone());
        }
        cache
    }

    /// Creates a secret reference.
    pub fn secret(&mut self, name: &str) -> Secret {
        if name.is_empty() {
            panic!("secret name cannot be empty");
        }
        let secret = Secret {
            name: name.to_string(),
        };
        if !self.secrets.iter().any(|s| s.name == name) {
            self.secrets.push(secret.clone());
        }
        secret
    }

    /// Creates a new task with the given name.
    pub fn task(&mut self, name: &str) -> Task<'_> {
        if name.is_empty() {
            panic!("task name cannot be empty");
        }
        if self.tasks.iter().any(|t| t.name == name) {
            panic!("task {:?} already exists", name);
        }
        self.tasks.push(TaskData {
            name: name.to_string(),
            ..Default::default()
        });
        let index = self.tasks.len() - 1;
        Task {
            pipeline: self,
            index,
        }
    }

    /// Creates a new service with the given name.
    pub fn service(&mut self, name: &str) -> ServiceBuilder<'_> {
        if name.is_empty() {
            panic!("service name cannot be empty");
        }
        if self.services.iter().any(|s| s.name == name) {
            panic!("service {:?} already exists", name);
        }
        self.services.push(ServiceData {
            name: name.to_string(),
            ..Default::default()
        });
        let index = self.services.len() - 1;
        ServiceBuilder {
            pipeline: self,
            index,
        }
    }

    /// Returns the names of all tasks, in definition order.
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }

    /// Returns the names of all services, in definition order.
    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }

    fn validate(&self) -> io::Result<()> {
        let invalid = |msg: String| io::Error::new(io::ErrorKind::InvalidData, msg);
        let task_names = self.task_names();
        let service_names = self.service_names();

        let check_inputs = |owner: &str, inputs: &[TaskInput]| -> io::Result<()> {
            for input in inputs {
                let source = self.tasks.iter().find(|t| t.name == input.task).ok_or_else(|| {
                    invalid(format!("{} takes input from unknown task {:?}", owner, input.task))
                })?;
                if !source.outputs.contains_key(&input.output) {
                    return Err(invalid(format!(
                        "{} takes unknown output {:?} from task {:?}",
                        owner, input.output, input.task
                    )));
                }
            }
            Ok(())
        };
        let check_bindings = |owner: &str, bindings: &[Binding]| -> io::Result<()> {
            for b in bindings {
                if !service_names.contains(&b.service.as_str()) {
                    return Err(invalid(format!(
                        "{} binds unknown service {:?}",
                        owner, b.service
                    )));
                }
            }
            Ok(())
        };

        for t in &self.tasks {
            let owner = format!("task {:?}", t.name);
            if t.commands.is_empty() {
                return Err(invalid(format!("task {:?} has no command", t.name)));
            }
            for dep in &t.depends_on {
                if !task_names.contains(&dep.as_str()) {
                    return Err(invalid(format!(
                        "task {:?} depends on unknown task {:?}",
                        t.name, dep
                    )));
                }
            }
            check_inputs(&owner, &t.task_inputs)?;
            check_bindings(&owner, &t.bindings)?;
        }

        for s in &self.services {
            let owner = format!("service {:?}", s.name);
            if s.container.is_none() {
                return Err(invalid(format!("service {:?} has no container image", s.name)));
            }
            check_inputs(&owner, &s.task_inputs)?;
            for b in &s.bindings {
                if b.service == s.name {
                    return Err(invalid(format!("service {:?} binds itself", s.name)));
                }
            }
            check_bindings(&owner, &s.bindings)?;
        }
        Ok(())
    }

    /// Writes the pipeline JSON to the given writer.
    pub fn emit_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        self.validate()?;

        // Detect version based on usage
        let has_v3_features = !self.services.is_empty()
            || !self.secrets.is_empty()
            || self.tasks.iter().any(|t| {
                !t.bindings.is_empty() || !t.files.is_empty() || !t.task_inputs.is_empty()
            });
        let has_v2_features = has_v3_features
            || !self.dirs.is_empty()
            || !self.caches.is_empty()
            || self
                .tasks
                .iter()
                .any(|t| t.container.is_some() || !t.mounts.is_empty());

        let version = if has_v3_features {
            "3"
        } else if has_v2_features {
            "2"
        } else {
            "1"
        };

        let output = JsonPipeline {
            version: version.to_string(),
            resources: if has_v2_features {
                Some(self.json_resources())
            } else {
                None
            },
            tasks: self.tasks.iter().map(JsonTask::from).collect(),
            services: if self.services.is_empty() {
                None
            } else {
                Some(self.services.iter().map(JsonService::from).collect())
            },
        };

        info!(
            version,
            tasks = self.tasks.len(),
            services = self.services.len(),
            "emitting pipeline"
        );
        serde_json::to_writer(&mut *w, &output)?;
        writeln!(w)?;
        Ok(())
    }

    fn json_resources(&self) -> HashMap<String, JsonResource> {
        let mut resources = HashMap::new();
        for d in &self.dirs {
            resources.insert(
                d.id(),
                JsonResource {
                    type_: "directory".to_string(),
                    path: Some(d.path.clone()),
                    name: None,
                },
            );
        }
        for c in &self.caches {
            resources.insert(
                c.id(),
                JsonResource {
                    type_: "cache".to_string(),
                    path: None,
                    name: Some(c.name.clone()),
                },
            );
        }
        for s in &self.secrets {
            resources.insert(
                s.id(),
                JsonResource {
                    type_: "secret".to_string(),
                    path: None,
                    name: Some(s.name.clone()),
                },
            );
        }
        resources
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// JSON SERIALIZATION
// =============================================================================

fn non_empty<T: Clone>(items: &[T]) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items.to_vec())
    }
}

fn json_list<T, U>(items: &[T]) -> Option<Vec<U>>
where
    for<'x> U: From<&'x T>,
{
    if items.is_empty() {
        None
    } else {
        Some(items.iter().map(U::from).collect())
    }
}

#[derive(Serialize)]
struct JsonPipeline {
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    resources: Option<HashMap<String, JsonResource>>,
    tasks: Vec<JsonTask>,
    #[serde(skip_serializing_if = "Option::is_none")]
    services: Option<Vec<JsonService>>,
}

#[derive(Serialize)]
struct JsonResource {
    #[serde(rename = "type")]
    type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Serialize)]
struct JsonTask {
    name: String,
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workdir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    env: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mounts: Option<Vec<JsonMount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inputs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outputs: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_inputs: Option<Vec<JsonTaskInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    depends_on: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    services: Option<Vec<JsonBinding>>,
}

impl From<&TaskData> for JsonTask {
    fn from(t: &TaskData) -> Self {
        JsonTask {
            name: t.name.clone(),
            command: t.commands.join(" && "),
            container: t.container.clone(),
            workdir: t.workdir.clone(),
            env: if t.env.is_empty() {
                None
            } else {
                Some(t.env.clone())
            },
            mounts: json_list(&t.mounts),
            files: if t.files.is_empty() {
                None
            } else {
                Some(t.files.clone())
            },
            inputs: non_empty(&t.inputs),
            outputs: if t.outputs.is_empty() {
                None
            } else {
                Some(t.outputs.clone())
            },
            task_inputs: json_list(&t.task_inputs),
            depends_on: non_empty(&t.depends_on),
            services: json_list(&t.bindings),
        }
    }
}

#[derive(Serialize)]
struct JsonService {
    name: String,
    container: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workdir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    env: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mounts: Option<Vec<JsonMount>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ports: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entrypoint: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_inputs: Option<Vec<JsonTaskInput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    services: Option<Vec<JsonBinding>>,
}

impl From<&ServiceData> for JsonService {
    fn from(s: &ServiceData) -> Self {
        JsonService {
            name: s.name.clone(),
            container: s.container.clone().unwrap_or_default(),
            command: if s.commands.is_empty() {
                None
            } else {
                Some(s.commands.join(" && "))
            },
            workdir: s.workdir.clone(),
            env: if s.env.is_empty() {
                None
            } else {
                Some(s.env.clone())
            },
            mounts: json_list(&s.mounts),
            files: if s.files.is_empty() {
                None
            } else {
                Some(s.files.clone())
            },
            ports: non_empty(&s.ports),
            entrypoint: s.entrypoint.clone(),
            args: non_empty(&s.args),
            task_inputs: json_list(&s.task_inputs),
            services: json_list(&s.bindings),
        }
    }
}

#[derive(Serialize)]
struct JsonMount {
    resource: String,
    path: String,
    #[serde(rename = "type")]
    type_: String,
}

impl From<&Mount> for JsonMount {
    fn from(m: &Mount) -> Self {
        JsonMount {
            resource: m.resource.clone(),
            path: m.path.clone(),
            type_: m.mount_type.clone(),
        }
    }
}

#[derive(Serialize)]
struct JsonBinding {
    alias: String,
    service: String,
}

impl From<&Binding> for JsonBinding {
    fn from(b: &Binding) -> Self {
        JsonBinding {
            alias: b.alias.clone(),
            service: b.service.clone(),
        }
    }
}

#[derive(Serialize)]
struct JsonTaskInput {
    from_task: String,
    output: String,
    dest: String,
}

impl From<&TaskInput> for JsonTaskInput {
    fn from(i: &TaskInput) -> Self {
        JsonTaskInput {
            from_task: i.task.clone(),
            output: i.output.clone(),
            dest: i.dest.clone(),
        }
    }
}
