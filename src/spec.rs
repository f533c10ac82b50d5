//! Package declarations.
//!
//! A [`Spec`] is one declaration of a package: an identity plus optional
//! overrides, hooks, and nested dependency/dependent declarations. The same
//! identity may be declared many times; the graph builder merges them.
//!
//! A [`Scope`] carries the flags of an enclosing declaration group. It is
//! applied to every spec merged inside that group, nested ones included.

use crate::hooks::{Hook, HookStage, Hooks};

/// One declaration of a package.
#[derive(Debug, Default)]
pub struct Spec {
    /// Identity in `namespace/name` form.
    pub id: String,
    /// Local directory name override (`as` in the configuration file).
    pub name: Option<String>,
    /// Remote URL override.
    pub url: Option<String>,
    /// Branch or ref to clone and follow.
    pub branch: Option<String>,
    pub pin: Option<bool>,
    pub disable: Option<bool>,
    /// Packages this one depends on.
    pub requires: Vec<Spec>,
    /// Packages that depend on this one.
    pub wants: Vec<Spec>,
    pub hooks: Hooks,
}

impl Spec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn pin(mut self, pin: bool) -> Self {
        self.pin = Some(pin);
        self
    }

    pub fn disable(mut self, disable: bool) -> Self {
        self.disable = Some(disable);
        self
    }

    pub fn requires(mut self, dependency: Spec) -> Self {
        self.requires.push(dependency);
        self
    }

    pub fn wants(mut self, dependent: Spec) -> Self {
        self.wants.push(dependent);
        self
    }

    pub fn hook(mut self, stage: HookStage, hook: Hook) -> Self {
        self.hooks.stage_mut(stage).push(hook);
        self
    }

    pub fn on_setup<F>(self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + 'static,
    {
        self.hook(HookStage::Setup, Hook::callback(f))
    }

    pub fn on_configure<F>(self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + 'static,
    {
        self.hook(HookStage::Configure, Hook::callback(f))
    }

    pub fn on_load<F>(self, f: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + 'static,
    {
        self.hook(HookStage::Load, Hook::callback(f))
    }
}

impl From<&str> for Spec {
    fn from(id: &str) -> Self {
        Spec::new(id)
    }
}

/// Flags inherited from enclosing declaration groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
    pub pin: bool,
    pub disable: bool,
}

impl Scope {
    /// Combine with a nested group's flags. Both flags are sticky.
    pub fn nest(self, pin: Option<bool>, disable: Option<bool>) -> Self {
        Self {
            pin: self.pin || pin.unwrap_or(false),
            disable: self.disable || disable.unwrap_or(false),
        }
    }
}

/// A top-level configuration entry: a package or a group of entries.
#[derive(Debug)]
pub enum Entry {
    Package(Spec),
    Group(Group),
}

/// A declaration group whose flags apply to everything inside it.
#[derive(Debug, Default)]
pub struct Group {
    pub pin: Option<bool>,
    pub disable: Option<bool>,
    pub entries: Vec<Entry>,
}

impl From<Spec> for Entry {
    fn from(spec: Spec) -> Self {
        Entry::Package(spec)
    }
}
