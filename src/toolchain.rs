//! Toolchain resolution.
//!
//! A project declares the build tools it needs in a `.toolchains` manifest at
//! its root, one tool per line, optionally pinned:
//!
//! ```text
//! go=1.22.0
//! rust
//! spin
//! ```
//!
//! Bare names resolve to that tool's own default version; pins override the
//! default for that resolution only.
//!
//! ```rust
//! use devstack::toolchain::{parse_manifest, resolve, DefaultVersions, ToolchainKind};
//!
//! let entries = parse_manifest("go=1.22.0\nrust\n");
//! let set = resolve(&entries, &DefaultVersions::default(), &[ToolchainKind::Go, ToolchainKind::Rust]).unwrap();
//!
//! assert_eq!(set.get("go"), Some("1.22.0"));
//! assert_eq!(set.get("rust"), Some("1.82.0"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::source::SourceTree;

/// Path of the manifest inside a source tree.
pub const MANIFEST_PATH: &str = ".toolchains";

// =============================================================================
// TOOLCHAIN KIND
// =============================================================================

/// A supported build tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolchainKind {
    Go,
    Rust,
    #[serde(rename = "tinygo")]
    TinyGo,
    Spin,
    Node,
    WasmTools,
    Postgres,
}

impl ToolchainKind {
    /// Every supported tool, in install order.
    pub const ALL: [ToolchainKind; 7] = [
        ToolchainKind::Go,
        ToolchainKind::Rust,
        ToolchainKind::TinyGo,
        ToolchainKind::Spin,
        ToolchainKind::Node,
        ToolchainKind::WasmTools,
        ToolchainKind::Postgres,
    ];

    /// Looks up a tool by any of its manifest names.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.aliases().contains(&name))
    }

    /// Canonical manifest name.
    pub fn name(&self) -> &'static str {
        self.aliases()[0]
    }

    /// All names accepted in a manifest, canonical name first.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ToolchainKind::Go => &["go", "golang"],
            ToolchainKind::Rust => &["rust"],
            ToolchainKind::TinyGo => &["tinygo"],
            ToolchainKind::Spin => &["spin"],
            ToolchainKind::Node => &["node", "nodejs"],
            ToolchainKind::WasmTools => &["wasm-tools", "wasmtools"],
            ToolchainKind::Postgres => &["postgres", "postgresql"],
        }
    }

    /// Official container image for this tool at `version`, if there is one.
    pub fn image(&self, version: &str) -> Option<String> {
        match self {
            ToolchainKind::Go => Some(format!("golang:{}-alpine", version)),
            ToolchainKind::Rust => Some(format!("rust:{}", version)),
            ToolchainKind::Node => Some(format!("node:{}-alpine", version)),
            ToolchainKind::Postgres => Some(format!("postgres:{}", version)),
            ToolchainKind::TinyGo => Some(format!("tinygo/tinygo:{}", version)),
            ToolchainKind::Spin | ToolchainKind::WasmTools => None,
        }
    }

    /// Shell steps that install this tool into a Debian-like container.
    ///
    /// Steps are meant to run in a single shell, in order, so `export`s
    /// carry over to later steps.
    pub fn install(&self, version: &str, platform: &Platform) -> Vec<String> {
        match self {
            ToolchainKind::Go => {
                let tarball = format!("go{}.linux-{}.tar.gz", version, platform.go_arch());
                vec![
                    format!("wget https://go.dev/dl/{} -O {}", tarball, tarball),
                    "rm -rf /usr/local/go".to_string(),
                    format!("tar -C /usr/local -xzf {}", tarball),
                    "export PATH=/usr/local/go/bin:$PATH".to_string(),
                ]
            }
            ToolchainKind::Rust => vec![
                "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y".to_string(),
                "export PATH=$PATH:/root/.cargo/bin".to_string(),
                format!(
                    "rustup toolchain install {} --component=clippy --component=rustfmt --no-self-update",
                    version
                ),
                format!("rustup default {}", version),
                "rustup target add wasm32-wasi".to_string(),
                "rustup target add wasm32-unknown-unknown".to_string(),
            ],
            ToolchainKind::TinyGo => {
                let tarball = format!("tinygo{}.linux-{}.tar.gz", version, platform.go_arch());
                vec![
                    format!(
                        "wget https://github.com/tinygo-org/tinygo/releases/download/v{}/{} -O {}",
                        version, tarball, tarball
                    ),
                    format!("tar -xzf {}", tarball),
                    "mkdir -p /opt".to_string(),
                    "mv tinygo /opt/tinygo".to_string(),
                    "export TINYGOROOT=/opt/tinygo".to_string(),
                    "export PATH=/opt/tinygo/bin:$PATH".to_string(),
                ]
            }
            ToolchainKind::Spin => {
                let tarball = format!("spin-v{}-linux-{}.tar.gz", version, platform.spin_arch());
                vec![
                    format!(
                        "wget https://github.com/fermyon/spin/releases/download/v{}/{} -O {}",
                        version, tarball, tarball
                    ),
                    format!("tar -xzf {} spin", tarball),
                    "mv spin /usr/local/bin/spin".to_string(),
                ]
            }
            ToolchainKind::Node => {
                let tarball = format!("node-v{}-linux-{}.tar.xz", version, platform.node_arch());
                vec![
                    format!("wget https://nodejs.org/dist/v{}/{} -O {}", version, tarball, tarball),
                    format!("tar -C /usr/local --strip-components=1 -xJf {}", tarball),
                ]
            }
            ToolchainKind::WasmTools => {
                let dir = format!("wasm-tools-{}-{}-linux", version, platform.wasm_tools_arch());
                vec![
                    format!(
                        "wget https://github.com/bytecodealliance/wasm-tools/releases/download/v{}/{}.tar.gz -O {}.tar.gz",
                        version, dir, dir
                    ),
                    format!("tar -xzf {}.tar.gz", dir),
                    format!("mv {}/wasm-tools /usr/local/bin/wasm-tools", dir),
                ]
            }
            // Server versions are picked through `image`; the build env only needs the client.
            ToolchainKind::Postgres => vec![
                "apt-get install -y postgresql-client".to_string(),
            ],
        }
    }
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// PLATFORM
// =============================================================================

/// CPU architecture of the build container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    Arm64,
}

/// Target platform for install steps. Containers are always linux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub arch: Arch,
}

impl Platform {
    /// Creates a linux platform for `arch`.
    pub fn new(arch: Arch) -> Self {
        Self { arch }
    }

    /// The platform matching the host CPU.
    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "aarch64" => Self::new(Arch::Arm64),
            _ => Self::new(Arch::Amd64),
        }
    }

    fn go_arch(&self) -> &'static str {
        match self.arch {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }

    fn spin_arch(&self) -> &'static str {
        match self.arch {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "aarch64",
        }
    }

    fn node_arch(&self) -> &'static str {
        match self.arch {
            Arch::Amd64 => "x64",
            Arch::Arm64 => "arm64",
        }
    }

    fn wasm_tools_arch(&self) -> &'static str {
        match self.arch {
            Arch::Amd64 => "x86_64",
            Arch::Arm64 => "aarch64",
        }
    }
}

// =============================================================================
// DEFAULT VERSIONS
// =============================================================================

/// Default version of every tool, used for bare manifest entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultVersions {
    pub go: String,
    pub rust: String,
    pub tinygo: String,
    pub spin: String,
    pub node: String,
    #[serde(rename = "wasm-tools", alias = "wasmtools")]
    pub wasm_tools: String,
    pub postgres: String,
}

impl DefaultVersions {
    /// Returns the default version for `kind`.
    pub fn get(&self, kind: ToolchainKind) -> &str {
        match kind {
            ToolchainKind::Go => &self.go,
            ToolchainKind::Rust => &self.rust,
            ToolchainKind::TinyGo => &self.tinygo,
            ToolchainKind::Spin => &self.spin,
            ToolchainKind::Node => &self.node,
            ToolchainKind::WasmTools => &self.wasm_tools,
            ToolchainKind::Postgres => &self.postgres,
        }
    }
}

impl Default for DefaultVersions {
    fn default() -> Self {
        Self {
            go: "1.23.6".to_string(),
            rust: "1.82.0".to_string(),
            tinygo: "0.34.0".to_string(),
            spin: "3.0.0".to_string(),
            node: "22.11.0".to_string(),
            wasm_tools: "1.220.0".to_string(),
            postgres: "17.4".to_string(),
        }
    }
}

// =============================================================================
// MANIFEST
// =============================================================================

/// One non-empty line of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// 1-based line number.
    pub line: usize,
    pub name: String,
    /// `None` for a bare name.
    pub version: Option<String>,
}

/// How to treat lines with more than one `=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    /// Keep the first two segments, ignore the rest.
    #[default]
    Lenient,
    /// Reject the line with [`Error::MalformedEntry`].
    Strict,
}

impl ParsePolicy {
    /// Parses manifest `content` under this policy.
    pub fn parse(&self, content: &str) -> Result<Vec<ManifestEntry>> {
        let mut entries = Vec::new();
        for (i, line) in content.split('\n').enumerate() {
            if line.is_empty() {
                continue;
            }
            if *self == ParsePolicy::Strict && line.matches('=').count() > 1 {
                return Err(Error::MalformedEntry {
                    line: i + 1,
                    entry: line.to_string(),
                });
            }
            entries.push(parse_entry(i + 1, line));
        }
        Ok(entries)
    }
}

/// Parses a manifest leniently. Lines are not trimmed.
pub fn parse_manifest(content: &str) -> Vec<ManifestEntry> {
    content
        .split('\n')
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(i, line)| parse_entry(i + 1, line))
        .collect()
}

fn parse_entry(line: usize, text: &str) -> ManifestEntry {
    match text.split_once('=') {
        Some((name, rest)) => ManifestEntry {
            line,
            name: name.to_string(),
            version: rest.split('=').next().map(|v| v.to_string()),
        },
        None => ManifestEntry {
            line,
            name: text.to_string(),
            version: None,
        },
    }
}

/// Reads the manifest from `tree`.
///
/// Returns [`Error::ManifestUnavailable`] when the tree has no manifest.
pub fn load_manifest<T: SourceTree + ?Sized>(tree: &T) -> Result<String> {
    tree.read_file(MANIFEST_PATH)?
        .ok_or_else(|| Error::ManifestUnavailable {
            path: MANIFEST_PATH.to_string(),
        })
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// A tool with its resolved version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainRequirement {
    /// Name as written in the manifest, or the canonical name for defaults.
    pub name: String,
    pub kind: ToolchainKind,
    pub version: String,
}

impl ToolchainRequirement {
    /// Install steps for this requirement.
    pub fn install(&self, platform: &Platform) -> Vec<String> {
        self.kind.install(&self.version, platform)
    }
}

/// Resolved tools in first-requested order, one entry per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainSet {
    entries: Vec<ToolchainRequirement>,
}

impl ToolchainSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding `kinds` at their default versions.
    pub fn with_defaults(kinds: &[ToolchainKind], defaults: &DefaultVersions) -> Self {
        let mut set = Self::new();
        for kind in kinds {
            set.insert(ToolchainRequirement {
                name: kind.name().to_string(),
                kind: *kind,
                version: defaults.get(*kind).to_string(),
            });
        }
        set
    }

    /// Adds a requirement. A kind already present keeps its position and
    /// takes the new name and version.
    pub fn insert(&mut self, req: ToolchainRequirement) {
        match self.entries.iter_mut().find(|e| e.kind == req.kind) {
            Some(existing) => *existing = req,
            None => self.entries.push(req),
        }
    }

    /// Appends `kind` at its default version unless it is already present.
    pub fn ensure(mut self, kind: ToolchainKind, defaults: &DefaultVersions) -> Self {
        if !self.contains(kind) {
            self.entries.push(ToolchainRequirement {
                name: kind.name().to_string(),
                kind,
                version: defaults.get(kind).to_string(),
            });
        }
        self
    }

    pub fn contains(&self, kind: ToolchainKind) -> bool {
        self.entries.iter().any(|e| e.kind == kind)
    }

    /// Version resolved for `kind`.
    pub fn version(&self, kind: ToolchainKind) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.version.as_str())
    }

    /// Version resolved for the tool called `name` (any alias).
    pub fn get(&self, name: &str) -> Option<&str> {
        ToolchainKind::from_name(name).and_then(|kind| self.version(kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolchainRequirement> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name to version mapping.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.version.clone()))
            .collect()
    }

    /// Install steps for every tool, in order.
    pub fn install_steps(&self, platform: &Platform) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|e| e.install(platform))
            .collect()
    }
}

/// Resolves manifest entries against per-tool defaults.
///
/// Fails with [`Error::UnknownToolchain`] on the first entry whose name is
/// not an alias of one of `known`; no partial set is returned.
pub fn resolve(
    entries: &[ManifestEntry],
    defaults: &DefaultVersions,
    known: &[ToolchainKind],
) -> Result<ToolchainSet> {
    resolve_onto(ToolchainSet::new(), entries, defaults, known)
}

fn resolve_onto(
    mut set: ToolchainSet,
    entries: &[ManifestEntry],
    defaults: &DefaultVersions,
    known: &[ToolchainKind],
) -> Result<ToolchainSet> {
    for entry in entries {
        let kind = ToolchainKind::from_name(&entry.name)
            .filter(|kind| known.contains(kind))
            .ok_or_else(|| Error::UnknownToolchain(entry.name.clone()))?;

        let version = match &entry.version {
            Some(pinned) => pinned.clone(),
            None => defaults.get(kind).to_string(),
        };
        debug!(line = entry.line, name = %entry.name, %version, "resolved toolchain");

        set.insert(ToolchainRequirement {
            name: entry.name.clone(),
            kind,
            version,
        });
    }
    Ok(set)
}

/// What to do when a source tree has no manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingManifest {
    /// Resolve to the base tools only.
    #[default]
    Ignore,
    /// Return [`Error::ManifestUnavailable`].
    Fail,
}

/// Loads, parses and resolves manifests with a fixed set of options.
#[derive(Debug, Clone)]
pub struct Resolver {
    defaults: DefaultVersions,
    known: Vec<ToolchainKind>,
    base: Vec<ToolchainKind>,
    policy: ParsePolicy,
    missing: MissingManifest,
}

impl Resolver {
    /// Creates a resolver that knows every tool and has no base tools.
    pub fn new(defaults: DefaultVersions) -> Self {
        Self {
            defaults,
            known: ToolchainKind::ALL.to_vec(),
            base: Vec::new(),
            policy: ParsePolicy::default(),
            missing: MissingManifest::default(),
        }
    }

    /// Restricts the recognized tools.
    pub fn known(mut self, kinds: &[ToolchainKind]) -> Self {
        self.known = kinds.to_vec();
        self
    }

    /// Tools that are always resolved, at their defaults unless the manifest pins them.
    pub fn base(mut self, kinds: &[ToolchainKind]) -> Self {
        self.base = kinds.to_vec();
        self
    }

    pub fn parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn missing_manifest(mut self, missing: MissingManifest) -> Self {
        self.missing = missing;
        self
    }

    pub fn defaults(&self) -> &DefaultVersions {
        &self.defaults
    }

    /// Resolves manifest `content`.
    pub fn resolve_str(&self, content: &str) -> Result<ToolchainSet> {
        let entries = self.policy.parse(content)?;
        let base = ToolchainSet::with_defaults(&self.base, &self.defaults);
        let set = resolve_onto(base, &entries, &self.defaults, &self.known)?;
        info!(toolchains = set.len(), "resolved toolchain manifest");
        Ok(set)
    }

    /// Reads and resolves the manifest of `tree`.
    pub fn resolve_tree<T: SourceTree + ?Sized>(&self, tree: &T) -> Result<ToolchainSet> {
        match load_manifest(tree) {
            Ok(content) => self.resolve_str(&content),
            Err(Error::ManifestUnavailable { path }) if self.missing == MissingManifest::Ignore => {
                warn!(%path, "no toolchain manifest, using base toolchains only");
                Ok(ToolchainSet::with_defaults(&self.base, &self.defaults))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryTree;
    use ToolchainKind::*;

    fn go_rust() -> [ToolchainKind; 2] {
        [Go, Rust]
    }

    #[test]
    fn test_parse_bare_and_pinned() {
        let entries = parse_manifest("go=1.22.0\nrust\n");
        assert_eq!(
            entries,
            vec![
                ManifestEntry { line: 1, name: "go".into(), version: Some("1.22.0".into()) },
                ManifestEntry { line: 2, name: "rust".into(), version: None },
            ]
        );
    }

    #[test]
    fn test_parse_skips_empty_lines_but_keeps_line_numbers() {
        let entries = parse_manifest("\n\nspin\n\n");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].line, 3);
    }

    #[test]
    fn test_parse_does_not_trim() {
        let entries = parse_manifest("go \r\n");
        assert_eq!(entries[0].name, "go \r");
    }

    #[test]
    fn test_parse_lenient_extra_equals() {
        let entries = parse_manifest("go=1.22.0=extra=more");
        assert_eq!(entries[0].name, "go");
        assert_eq!(entries[0].version.as_deref(), Some("1.22.0"));
    }

    #[test]
    fn test_parse_empty_pin_is_kept() {
        let entries = parse_manifest("go=");
        assert_eq!(entries[0].version.as_deref(), Some(""));
    }

    #[test]
    fn test_parse_strict_rejects_extra_equals() {
        let err = ParsePolicy::Strict.parse("rust\ngo=1=2\n").unwrap_err();
        match err {
            Error::MalformedEntry { line, entry } => {
                assert_eq!(line, 2);
                assert_eq!(entry, "go=1=2");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_strict_accepts_well_formed() {
        let entries = ParsePolicy::Strict.parse("go=1.22.0\nrust\n").unwrap();
        assert_eq!(entries, parse_manifest("go=1.22.0\nrust\n"));
    }

    #[test]
    fn test_resolve_pin_overrides_default() {
        let set = resolve(
            &parse_manifest("go=1.22.0\nrust\n"),
            &DefaultVersions::default(),
            &go_rust(),
        )
        .unwrap();

        let expected: BTreeMap<String, String> = [
            ("go".to_string(), "1.22.0".to_string()),
            ("rust".to_string(), "1.82.0".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.to_map(), expected);
    }

    #[test]
    fn test_resolve_bare_names_use_each_tools_own_default() {
        let defaults = DefaultVersions::default();
        let set = resolve(
            &parse_manifest("tinygo\nwasm-tools\nnode\nspin\n"),
            &defaults,
            &ToolchainKind::ALL,
        )
        .unwrap();

        assert_eq!(set.version(TinyGo), Some("0.34.0"));
        assert_eq!(set.version(WasmTools), Some("1.220.0"));
        assert_eq!(set.version(Node), Some("22.11.0"));
        assert_eq!(set.version(Spin), Some("3.0.0"));
        assert!(!set.contains(Go));
    }

    #[test]
    fn test_resolve_unknown_toolchain_fails() {
        let err = resolve(
            &parse_manifest("ruby=3.2\n"),
            &DefaultVersions::default(),
            &go_rust(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownToolchain(ref name) if name == "ruby"));
    }

    #[test]
    fn test_resolve_unknown_toolchain_fails_in_any_position() {
        for manifest in ["ruby\ngo\nrust\n", "go\nruby\nrust\n", "go\nrust\nruby\n"] {
            let result = resolve(
                &parse_manifest(manifest),
                &DefaultVersions::default(),
                &go_rust(),
            );
            assert!(matches!(result, Err(Error::UnknownToolchain(_))), "{manifest:?}");
        }
    }

    #[test]
    fn test_resolve_recognized_but_not_known_fails() {
        let result = resolve(&parse_manifest("spin\n"), &DefaultVersions::default(), &go_rust());
        assert!(matches!(result, Err(Error::UnknownToolchain(ref name)) if name == "spin"));
    }

    #[test]
    fn test_resolve_last_duplicate_wins() {
        let set = resolve(
            &parse_manifest("go=1.21.0\nrust\ngolang=1.22.1\n"),
            &DefaultVersions::default(),
            &go_rust(),
        )
        .unwrap();

        assert_eq!(set.len(), 2);
        let first = set.iter().next().unwrap();
        assert_eq!(first.kind, Go);
        assert_eq!(first.name, "golang");
        assert_eq!(first.version, "1.22.1");
        assert_eq!(set.get("go"), Some("1.22.1"));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let entries = parse_manifest("go=1.22.0\nrust\n");
        let defaults = DefaultVersions::default();
        let a = resolve(&entries, &defaults, &go_rust()).unwrap();
        let b = resolve(&entries, &defaults, &go_rust()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pin_does_not_leak_into_defaults() {
        let defaults = DefaultVersions::default();
        let resolver = Resolver::new(defaults.clone());
        resolver.resolve_str("go=1.1.0\n").unwrap();
        let set = resolver.resolve_str("go\n").unwrap();
        assert_eq!(set.get("go"), Some(defaults.go.as_str()));
    }

    #[test]
    fn test_ensure_appends_missing_tool() {
        let defaults = DefaultVersions::default();
        let set = resolve(&parse_manifest("rust\n"), &defaults, &ToolchainKind::ALL)
            .unwrap()
            .ensure(Spin, &defaults);
        let kinds: Vec<_> = set.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![Rust, Spin]);
    }

    #[test]
    fn test_ensure_keeps_pinned_version() {
        let defaults = DefaultVersions::default();
        let set = resolve(&parse_manifest("spin=2.7.0\n"), &defaults, &ToolchainKind::ALL)
            .unwrap()
            .ensure(Spin, &defaults);
        assert_eq!(set.len(), 1);
        assert_eq!(set.version(Spin), Some("2.7.0"));
    }

    #[test]
    fn test_resolver_base_tools_overridden_by_manifest() {
        let resolver = Resolver::new(DefaultVersions::default()).base(&[Go, Postgres]);
        let set = resolver.resolve_str("postgresql=16.2\n").unwrap();
        assert_eq!(set.version(Go), Some("1.23.6"));
        assert_eq!(set.version(Postgres), Some("16.2"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_resolver_missing_manifest_ignored() {
        let resolver = Resolver::new(DefaultVersions::default()).base(&[Go]);
        let set = resolver.resolve_tree(&MemoryTree::new()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.version(Go), Some("1.23.6"));
    }

    #[test]
    fn test_resolver_missing_manifest_fails() {
        let resolver = Resolver::new(DefaultVersions::default()).missing_manifest(MissingManifest::Fail);
        let err = resolver.resolve_tree(&MemoryTree::new()).unwrap_err();
        assert!(matches!(err, Error::ManifestUnavailable { ref path } if path == ".toolchains"));
    }

    #[test]
    fn test_resolver_reads_tree_manifest() {
        let tree = MemoryTree::new().file(".toolchains", "rust=1.80.0\ntinygo\n");
        let set = Resolver::new(DefaultVersions::default()).resolve_tree(&tree).unwrap();
        assert_eq!(set.get("rust"), Some("1.80.0"));
        assert_eq!(set.get("tinygo"), Some("0.34.0"));
    }

    #[test]
    fn test_resolver_strict_policy() {
        let resolver = Resolver::new(DefaultVersions::default()).parse_policy(ParsePolicy::Strict);
        assert!(matches!(resolver.resolve_str("go=1=2"), Err(Error::MalformedEntry { .. })));
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!(ToolchainKind::from_name("golang"), Some(Go));
        assert_eq!(ToolchainKind::from_name("nodejs"), Some(Node));
        assert_eq!(ToolchainKind::from_name("wasmtools"), Some(WasmTools));
        assert_eq!(ToolchainKind::from_name("postgresql"), Some(Postgres));
        assert_eq!(ToolchainKind::from_name("Go"), None);
        assert_eq!(WasmTools.to_string(), "wasm-tools");
    }

    #[test]
    fn test_install_steps_follow_platform() {
        let amd = Go.install("1.22.0", &Platform::new(Arch::Amd64));
        assert!(amd[0].contains("go1.22.0.linux-amd64.tar.gz"));

        let arm = WasmTools.install("1.220.0", &Platform::new(Arch::Arm64));
        assert!(arm[0].contains("wasm-tools-1.220.0-aarch64-linux.tar.gz"));

        let node = Node.install("22.11.0", &Platform::new(Arch::Amd64));
        assert!(node[0].contains("node-v22.11.0-linux-x64.tar.xz"));
    }

    #[test]
    fn test_rust_install_adds_wasm_targets() {
        let steps = Rust.install("1.82.0", &Platform::new(Arch::Amd64));
        assert!(steps.contains(&"rustup default 1.82.0".to_string()));
        assert!(steps.contains(&"rustup target add wasm32-wasi".to_string()));
    }

    #[test]
    fn test_images() {
        assert_eq!(Go.image("1.23.6").as_deref(), Some("golang:1.23.6-alpine"));
        assert_eq!(Postgres.image("17.4").as_deref(), Some("postgres:17.4"));
        assert_eq!(Spin.image("3.0.0"), None);
    }

    #[test]
    fn test_default_versions_from_toml() {
        let defaults: DefaultVersions = toml::from_str("go = \"1.22.0\"\nwasm-tools = \"1.219.0\"\n").unwrap();
        assert_eq!(defaults.get(Go), "1.22.0");
        assert_eq!(defaults.get(WasmTools), "1.219.0");
        assert_eq!(defaults.get(Rust), "1.82.0");
    }
}
