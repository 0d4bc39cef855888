//! Request paths, request kinds and host surfaces.
//!
//! A subscription is requested on `on/<topic>` and cancelled on `off/<topic>`;
//! both map to the same canonical subscription path `<topic>`.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const INIT: &str = "init";
pub const GET_USER: &str = "get/user";
pub const GET_CONTACT: &str = "get/contact";
pub const GET_CALL: &str = "get/call";
pub const ON_CALL: &str = "on/call";
pub const OFF_CALL: &str = "off/call";

/// Paths that open a standing subscription.
pub const SUBSCRIPTION_PATHS: &[&str] = &[ON_CALL];

const ON_PREFIX: &str = "on/";
const OFF_PREFIX: &str = "off/";

/// The four request life-cycles the scheduler knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Init,
    Get,
    On,
    Off,
}

impl RequestKind {
    /// Classify a raw request path. Anything that is not `init`, `on/..` or
    /// `off/..` is a get-style request.
    pub fn of(path: &str) -> Self {
        if path == INIT {
            Self::Init
        } else if path.starts_with(ON_PREFIX) {
            Self::On
        } else if path.starts_with(OFF_PREFIX) {
            Self::Off
        } else {
            Self::Get
        }
    }
}

/// A request path together with its kind. Built per call, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestPath {
    path: String,
    kind: RequestKind,
}

impl RequestPath {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let kind = RequestKind::of(&path);
        Self { path, kind }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Path under which subscribers are tracked: the topic for `on/`/`off/`
    /// paths, the path itself otherwise.
    pub fn subscription_path(&self) -> &str {
        match self.kind {
            RequestKind::On => &self.path[ON_PREFIX.len()..],
            RequestKind::Off => &self.path[OFF_PREFIX.len()..],
            RequestKind::Init | RequestKind::Get => &self.path,
        }
    }
}

impl fmt::Display for RequestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl From<&str> for RequestPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Host surface a guest is embedded in; each surface permits a fixed path set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    ConversationSidebar,
}

impl Surface {
    pub fn allowed_paths(&self) -> &'static [&'static str] {
        match self {
            Self::ConversationSidebar => &[GET_USER, GET_CONTACT, GET_CALL, INIT, ON_CALL, OFF_CALL],
        }
    }

    pub fn allows(&self, path: &str) -> bool {
        self.allowed_paths().contains(&path)
    }
}
