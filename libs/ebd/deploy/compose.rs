//! Compose file model and checks
//!
//! Covers the subset of the compose format the deployment uses: services
//! with `image`/`build`, `container_name`, `ports`, `environment`,
//! `depends_on` and `volumes`, plus top-level named volumes.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("Failed to read compose file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse compose file: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Dependency cycle between services: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

pub type Result<T> = std::result::Result<T, ComposeError>;

// ==================== MODEL ====================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeFile {
    /// Obsolete in current compose releases; kept so older files parse
    #[serde(default)]
    pub version: Option<serde_yaml::Value>,

    #[serde(default)]
    pub services: BTreeMap<String, Service>,

    /// Top-level named volumes; `postgres_data:` with no body is allowed
    #[serde(default)]
    pub volumes: BTreeMap<String, Option<serde_yaml::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub build: Option<Build>,

    #[serde(default)]
    pub container_name: Option<String>,

    #[serde(default)]
    pub ports: Vec<PortEntry>,

    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub depends_on: DependsOn,

    #[serde(default)]
    pub volumes: Vec<VolumeEntry>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Build {
    Context(String),
    Config {
        context: String,
        #[serde(default)]
        dockerfile: Option<String>,
    },
}

impl Build {
    pub fn context(&self) -> &str {
        match self {
            Build::Context(context) => context,
            Build::Config { context, .. } => context,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PortEntry {
    Number(u32),
    Short(String),
    Long {
        target: u32,
        #[serde(default)]
        published: Option<serde_yaml::Value>,
        #[serde(default)]
        host_ip: Option<String>,
        #[serde(default)]
        protocol: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VolumeEntry {
    Short(String),
    Long {
        #[serde(default, rename = "type")]
        kind: Option<String>,
        #[serde(default)]
        source: Option<String>,
        target: String,
        #[serde(default)]
        read_only: bool,
    },
}

/// `environment` in either list (`KEY=value`) or map form
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Environment {
    List(Vec<String>),
    Map(BTreeMap<String, Option<serde_yaml::Value>>),
}

impl Default for Environment {
    fn default() -> Self {
        Environment::List(Vec::new())
    }
}

impl Environment {
    /// `(key, value)` pairs; a bare key has no value and passes through
    /// from the invoking shell
    pub fn entries(&self) -> Vec<(String, Option<String>)> {
        match self {
            Environment::List(items) => items
                .iter()
                .map(|item| match item.split_once('=') {
                    Some((key, value)) => (key.to_string(), Some(value.to_string())),
                    None => (item.clone(), None),
                })
                .collect(),
            Environment::Map(map) => map
                .iter()
                .map(|(key, value)| (key.clone(), value.as_ref().and_then(scalar_to_string)))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries()
            .into_iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DependencyCondition {
    #[serde(default)]
    pub condition: Option<String>,
}

/// `depends_on` in either list or map (`service: {condition: ...}`) form
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DependsOn {
    List(Vec<String>),
    Map(BTreeMap<String, DependencyCondition>),
}

impl Default for DependsOn {
    fn default() -> Self {
        DependsOn::List(Vec::new())
    }
}

impl DependsOn {
    pub fn names(&self) -> Vec<&str> {
        match self {
            DependsOn::List(names) => names.iter().map(String::as_str).collect(),
            DependsOn::Map(map) => map.keys().map(String::as_str).collect(),
        }
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ==================== PORTS & VOLUMES ====================

/// Inclusive port range; a single port has `start == end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn span(&self) -> u32 {
        u32::from(self.end - self.start) + 1
    }

    fn parse(raw: &str) -> std::result::Result<Self, String> {
        let (start, end) = match raw.split_once('-') {
            Some((start, end)) => (parse_port(start)?, parse_port(end)?),
            None => {
                let port = parse_port(raw)?;
                (port, port)
            }
        };
        if start > end {
            return Err(format!("range {} is reversed", raw));
        }
        Ok(PortRange { start, end })
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

fn parse_port(raw: &str) -> std::result::Result<u16, String> {
    let port: u32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a port number", raw))?;
    if !(1..=65535).contains(&port) {
        return Err(format!("port {} is outside 1-65535", port));
    }
    Ok(port as u16)
}

/// Parsed `[ip:][host:]container[/protocol]` binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub host_ip: Option<String>,
    pub host: Option<PortRange>,
    pub container: PortRange,
    pub protocol: String,
}

impl PortBinding {
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        let (mapping, protocol) = match raw.rsplit_once('/') {
            Some((mapping, protocol)) => (mapping, protocol.to_ascii_lowercase()),
            None => (raw, "tcp".to_string()),
        };
        if !matches!(protocol.as_str(), "tcp" | "udp" | "sctp") {
            return Err(format!("unknown protocol '{}'", protocol));
        }

        let mut parts = mapping.rsplitn(3, ':');
        let container = PortRange::parse(parts.next().unwrap_or_default())?;
        let host = parts.next().map(PortRange::parse).transpose()?;
        let host_ip = parts.next().map(str::to_string);

        if let Some(host) = host {
            if container.span() > 1 && host.span() != container.span() {
                return Err(format!(
                    "host range {} and container range {} differ in length",
                    host, container
                ));
            }
        }

        Ok(PortBinding {
            host_ip,
            host,
            container,
            protocol,
        })
    }

    fn from_entry(entry: &PortEntry) -> Option<std::result::Result<Self, String>> {
        match entry {
            PortEntry::Number(port) => Some(Self::parse(&port.to_string())),
            PortEntry::Short(raw) if raw.contains('$') => None,
            PortEntry::Short(raw) => Some(Self::parse(raw)),
            PortEntry::Long {
                target,
                published,
                host_ip,
                protocol,
            } => {
                let published = published.as_ref().and_then(scalar_to_string);
                if published.as_deref().is_some_and(|p| p.contains('$')) {
                    return None;
                }
                let mut raw = match published {
                    Some(published) => format!("{}:{}", published, target),
                    None => target.to_string(),
                };
                if let Some(ip) = host_ip {
                    raw = format!("{}:{}", ip, raw);
                }
                if let Some(protocol) = protocol {
                    raw = format!("{}/{}", raw, protocol);
                }
                Some(Self::parse(&raw))
            }
        }
    }
}

/// Parsed service volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Named volume or host path; `None` for an anonymous volume
    pub source: Option<String>,
    pub target: String,
    pub read_only: bool,
}

impl VolumeMount {
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        let parts: Vec<&str> = raw.split(':').collect();
        let (source, target, mode) = match parts.as_slice() {
            [target] => (None, *target, None),
            [source, target] => (Some(*source), *target, None),
            [source, target, mode] => (Some(*source), *target, Some(*mode)),
            _ => return Err(format!("'{}' has too many ':' separators", raw)),
        };
        if target.is_empty() || !target.starts_with('/') {
            return Err(format!("container path '{}' must be absolute", target));
        }
        let mut read_only = false;
        for flag in mode.into_iter().flat_map(|m| m.split(',')) {
            match flag {
                "ro" => read_only = true,
                "rw" | "z" | "Z" | "cached" | "delegated" | "consistent" | "nocopy" => {}
                other => return Err(format!("unknown mode '{}'", other)),
            }
        }
        Ok(VolumeMount {
            source: source.map(str::to_string),
            target: target.to_string(),
            read_only,
        })
    }

    fn from_entry(entry: &VolumeEntry) -> std::result::Result<Self, String> {
        match entry {
            VolumeEntry::Short(raw) => Self::parse(raw),
            VolumeEntry::Long {
                kind,
                source,
                target,
                read_only,
            } => {
                if kind.as_deref().is_some_and(|k| k != "volume" && k != "bind") {
                    // tmpfs and friends carry no source
                    return Ok(VolumeMount {
                        source: None,
                        target: target.clone(),
                        read_only: *read_only,
                    });
                }
                Ok(VolumeMount {
                    source: source.clone(),
                    target: target.clone(),
                    read_only: *read_only,
                })
            }
        }
    }

    /// Named volume to resolve against the top-level `volumes` table
    pub fn named_volume(&self) -> Option<&str> {
        let source = self.source.as_deref()?;
        let is_path = source.starts_with('/')
            || source.starts_with('.')
            || source.starts_with('~')
            || source.contains('/')
            || source.contains('$');
        (!is_path).then_some(source)
    }
}

// ==================== ISSUES ====================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeIssue {
    NoServices,
    MissingImageOrBuild {
        service: String,
    },
    BothImageAndBuild {
        service: String,
    },
    InvalidPort {
        service: String,
        value: String,
        reason: String,
    },
    InvalidVolume {
        service: String,
        value: String,
        reason: String,
    },
    UndeclaredVolume {
        service: String,
        volume: String,
    },
    UnknownDependency {
        service: String,
        dependency: String,
    },
    DependencyCycle {
        services: Vec<String>,
    },
    DuplicateContainerName {
        name: String,
        services: Vec<String>,
    },
}

impl fmt::Display for ComposeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComposeIssue::NoServices => write!(f, "no services declared"),
            ComposeIssue::MissingImageOrBuild { service } => {
                write!(f, "service '{}' needs either 'image' or 'build'", service)
            }
            ComposeIssue::BothImageAndBuild { service } => {
                write!(f, "service '{}' declares both 'image' and 'build'", service)
            }
            ComposeIssue::InvalidPort {
                service,
                value,
                reason,
            } => write!(f, "service '{}' port '{}': {}", service, value, reason),
            ComposeIssue::InvalidVolume {
                service,
                value,
                reason,
            } => write!(f, "service '{}' volume '{}': {}", service, value, reason),
            ComposeIssue::UndeclaredVolume { service, volume } => write!(
                f,
                "service '{}' mounts volume '{}' which is not declared at top level",
                service, volume
            ),
            ComposeIssue::UnknownDependency {
                service,
                dependency,
            } => write!(
                f,
                "service '{}' depends on unknown service '{}'",
                service, dependency
            ),
            ComposeIssue::DependencyCycle { services } => {
                write!(f, "dependency cycle between: {}", services.join(", "))
            }
            ComposeIssue::DuplicateContainerName { name, services } => write!(
                f,
                "container name '{}' used by several services: {}",
                name,
                services.join(", ")
            ),
        }
    }
}

// ==================== OPERATIONS ====================

impl ComposeFile {
    pub fn parse(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    /// Every problem found; empty when the file is usable
    pub fn validate(&self) -> Vec<ComposeIssue> {
        let mut issues = Vec::new();

        if self.services.is_empty() {
            issues.push(ComposeIssue::NoServices);
        }

        let mut container_names: BTreeMap<&str, Vec<String>> = BTreeMap::new();

        for (name, service) in &self.services {
            match (&service.image, &service.build) {
                (None, None) => issues.push(ComposeIssue::MissingImageOrBuild {
                    service: name.clone(),
                }),
                (Some(_), Some(_)) => issues.push(ComposeIssue::BothImageAndBuild {
                    service: name.clone(),
                }),
                _ => {}
            }

            for entry in &service.ports {
                if let Some(Err(reason)) = PortBinding::from_entry(entry) {
                    issues.push(ComposeIssue::InvalidPort {
                        service: name.clone(),
                        value: port_entry_label(entry),
                        reason,
                    });
                }
            }

            for entry in &service.volumes {
                match VolumeMount::from_entry(entry) {
                    Ok(mount) => {
                        if let Some(volume) = mount.named_volume() {
                            if !self.volumes.contains_key(volume) {
                                issues.push(ComposeIssue::UndeclaredVolume {
                                    service: name.clone(),
                                    volume: volume.to_string(),
                                });
                            }
                        }
                    }
                    Err(reason) => issues.push(ComposeIssue::InvalidVolume {
                        service: name.clone(),
                        value: volume_entry_label(entry),
                        reason,
                    }),
                }
            }

            for dependency in service.depends_on.names() {
                if !self.services.contains_key(dependency) {
                    issues.push(ComposeIssue::UnknownDependency {
                        service: name.clone(),
                        dependency: dependency.to_string(),
                    });
                }
            }

            if let Some(container_name) = service.container_name.as_deref() {
                container_names
                    .entry(container_name)
                    .or_default()
                    .push(name.clone());
            }
        }

        for (container_name, services) in container_names {
            if services.len() > 1 {
                issues.push(ComposeIssue::DuplicateContainerName {
                    name: container_name.to_string(),
                    services,
                });
            }
        }

        if let Err(ComposeError::Cycle(services)) = self.start_order() {
            issues.push(ComposeIssue::DependencyCycle { services });
        }

        issues
    }

    /// Services in an order where each one follows its dependencies.
    /// Ties are broken by name; unknown dependencies are ignored here and
    /// reported by `validate`.
    pub fn start_order(&self) -> Result<Vec<String>> {
        let mut pending: BTreeMap<&str, BTreeSet<&str>> = self
            .services
            .iter()
            .map(|(name, service)| {
                let deps = service
                    .depends_on
                    .names()
                    .into_iter()
                    .filter(|dep| self.services.contains_key(*dep))
                    .collect();
                (name.as_str(), deps)
            })
            .collect();

        let mut order = Vec::with_capacity(pending.len());
        loop {
            let ready: Option<&str> = pending
                .iter()
                .find(|(_, deps)| deps.is_empty())
                .map(|(name, _)| *name);
            let Some(next) = ready else {
                break;
            };

            pending.remove(next);
            for deps in pending.values_mut() {
                deps.remove(next);
            }
            order.push(next.to_string());
        }

        if !pending.is_empty() {
            return Err(ComposeError::Cycle(
                pending.keys().map(|name| name.to_string()).collect(),
            ));
        }

        Ok(order)
    }

    /// Variables the invoking shell must provide. `${VAR:-default}` and
    /// `${VAR-default}` carry a fallback and are not required.
    pub fn required_variables(&self) -> BTreeSet<String> {
        let mut required = BTreeSet::new();
        for service in self.services.values() {
            for text in service.interpolated_strings() {
                for var in interpolations(&text) {
                    if var.required {
                        required.insert(var.name);
                    }
                }
            }
        }
        required
    }

    /// Required variables that `lookup` cannot resolve
    pub fn missing_variables<F>(&self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.required_variables()
            .into_iter()
            .filter(|name| lookup(name).is_none())
            .collect()
    }
}

impl Service {
    fn interpolated_strings(&self) -> Vec<String> {
        let mut strings = Vec::new();
        strings.extend(self.image.clone());
        strings.extend(self.container_name.clone());
        strings.extend(self.build.as_ref().map(|b| b.context().to_string()));
        for entry in &self.ports {
            if let PortEntry::Short(raw) = entry {
                strings.push(raw.clone());
            }
        }
        for entry in &self.volumes {
            if let VolumeEntry::Short(raw) = entry {
                strings.push(raw.clone());
            }
        }
        strings.extend(self.environment.entries().into_iter().filter_map(|(_, v)| v));
        strings
    }
}

fn port_entry_label(entry: &PortEntry) -> String {
    match entry {
        PortEntry::Number(port) => port.to_string(),
        PortEntry::Short(raw) => raw.clone(),
        PortEntry::Long { target, .. } => format!("target {}", target),
    }
}

fn volume_entry_label(entry: &VolumeEntry) -> String {
    match entry {
        VolumeEntry::Short(raw) => raw.clone(),
        VolumeEntry::Long { target, .. } => format!("target {}", target),
    }
}

// ==================== INTERPOLATION ====================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolation {
    pub name: String,
    pub required: bool,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Variable references in a compose string. `$$` is a literal dollar.
pub fn interpolations(text: &str) -> Vec<Interpolation> {
    let mut found = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '$' {
            continue;
        }
        match chars.peek().map(|(_, next)| *next) {
            Some('$') => {
                chars.next();
            }
            Some('{') => {
                let (open, _) = chars.next().unwrap_or_default();
                let body_start = open + 1;
                let Some(close) = text[body_start..].find('}') else {
                    break;
                };
                let body = &text[body_start..body_start + close];
                let name_len = body.find(|c: char| !is_name_char(c)).unwrap_or(body.len());
                let (name, modifier) = body.split_at(name_len);
                if !name.is_empty() {
                    found.push(Interpolation {
                        name: name.to_string(),
                        required: !(modifier.starts_with(":-") || modifier.starts_with('-')),
                    });
                }
                while let Some((i, _)) = chars.peek() {
                    if *i > body_start + close {
                        break;
                    }
                    chars.next();
                }
            }
            Some(next) if next.is_ascii_alphabetic() || next == '_' => {
                let mut name = String::new();
                while let Some((_, c)) = chars.peek() {
                    if !is_name_char(*c) {
                        break;
                    }
                    name.push(*c);
                    chars.next();
                }
                found.push(Interpolation {
                    name,
                    required: true,
                });
            }
            _ => {}
        }
    }

    found
}
