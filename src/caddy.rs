//! Caddy reverse proxy in front of pipeline services.
//!
//! Bindings are collected with [`Caddy::with_service`] and rendered into a
//! Caddyfile with one site block per binding, in the order they were added.
//!
//! ```rust
//! use devstack::caddy::{Caddy, ProxyMode};
//! use devstack::Pipeline;
//!
//! let mut p = Pipeline::new();
//! let backend = p.service("backend").container("alpine").expose(8080).handle();
//!
//! let caddy = Caddy::new(ProxyMode::Port).with_service(&backend, None, "backend", 8080);
//! assert_eq!(caddy.render(), ":8080 {\n\treverse_proxy backend:8080\n}\n\n");
//! ```

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Pipeline, Service};

/// Image used when none is configured.
pub const DEFAULT_IMAGE: &str = "caddy:2.8.4";

/// Where the rendered Caddyfile is written inside the proxy container.
pub const CADDYFILE_PATH: &str = "/opt/caddy/caddyfile";

/// How site blocks are addressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    /// `http://<label>`, one virtual host per binding.
    #[default]
    Domain,
    /// `:<port>`, one listener per upstream port.
    Port,
}

/// One upstream routed by the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyBinding {
    /// Domain name in domain mode. Unused in port mode.
    pub label: Option<String>,
    pub upstream_name: String,
    pub upstream_port: i32,
    pub upstream: Service,
}

impl ProxyBinding {
    fn stanza(&self, mode: ProxyMode) -> String {
        let address = match mode {
            ProxyMode::Domain => format!(
                "http://{}",
                self.label.as_deref().unwrap_or(&self.upstream_name)
            ),
            ProxyMode::Port => format!(":{}", self.upstream_port),
        };
        format!(
            "{} {{\n\treverse_proxy {}:{}\n}}\n\n",
            address, self.upstream_name, self.upstream_port
        )
    }
}

/// Reverse proxy configuration builder.
#[derive(Debug, Clone)]
pub struct Caddy {
    mode: ProxyMode,
    image: String,
    bindings: Vec<ProxyBinding>,
}

impl Caddy {
    /// Creates a proxy with no bindings.
    pub fn new(mode: ProxyMode) -> Self {
        Self {
            mode,
            image: DEFAULT_IMAGE.to_string(),
            bindings: Vec::new(),
        }
    }

    /// Overrides the proxy image.
    pub fn image(mut self, image: &str) -> Self {
        self.image = image.to_string();
        self
    }

    /// Routes traffic to `upstream_name:upstream_port`.
    ///
    /// Nothing is validated; a bad name or port shows up verbatim in the
    /// rendered Caddyfile.
    pub fn with_service(
        mut self,
        upstream: &Service,
        label: Option<&str>,
        upstream_name: &str,
        upstream_port: i32,
    ) -> Self {
        self.bindings.push(ProxyBinding {
            label: label.map(|l| l.to_string()),
            upstream_name: upstream_name.to_string(),
            upstream_port,
            upstream: upstream.clone(),
        });
        self
    }

    pub fn mode(&self) -> ProxyMode {
        self.mode
    }

    pub fn bindings(&self) -> &[ProxyBinding] {
        &self.bindings
    }

    /// Renders the Caddyfile. No bindings render to an empty string.
    pub fn render(&self) -> String {
        self.bindings
            .iter()
            .map(|b| b.stanza(self.mode))
            .collect()
    }

    /// Defines the proxy as a service of `pipeline` and returns its handle.
    ///
    /// Every upstream is bound under its upstream name. Empty names are not
    /// bound, and a name keeps the first service it was bound to. Port mode
    /// exposes each upstream port; domain mode exposes port 80.
    pub fn service(&self, pipeline: &mut Pipeline, name: &str) -> Service {
        let caddyfile = self.render();
        let mut svc = pipeline
            .service(name)
            .container(&self.image)
            .file(CADDYFILE_PATH, &caddyfile)
            .args(&["caddy", "run", "--config", CADDYFILE_PATH]);

        let mut bound: Vec<(&str, &Service)> = Vec::new();
        for b in &self.bindings {
            if b.upstream_name.is_empty() {
                warn!(service = %b.upstream.name(), "not binding upstream with an empty name");
                continue;
            }
            match bound.iter().find(|(name, _)| *name == b.upstream_name.as_str()) {
                Some((_, existing)) if **existing == b.upstream => {}
                Some((_, existing)) => warn!(
                    upstream = %b.upstream_name,
                    bound = %existing.name(),
                    ignored = %b.upstream.name(),
                    "upstream name already bound to another service"
                ),
                None => {
                    svc = svc.bind(&b.upstream_name, &b.upstream);
                    bound.push((b.upstream_name.as_str(), &b.upstream));
                }
            }
        }

        match self.mode {
            ProxyMode::Domain => svc = svc.expose(80),
            ProxyMode::Port => {
                for b in &self.bindings {
                    match u16::try_from(b.upstream_port) {
                        Ok(port) => svc = svc.expose(port),
                        Err(_) => warn!(
                            upstream = %b.upstream_name,
                            port = b.upstream_port,
                            "not exposing out-of-range proxy port"
                        ),
                    }
                }
            }
        }

        info!(
            service = name,
            mode = ?self.mode,
            bindings = self.bindings.len(),
            "defined reverse proxy"
        );
        svc.handle()
    }
}
