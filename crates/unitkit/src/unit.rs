//! Units and the actions they expose
//!
//! A unit is a named collection of actions. Each action is a runnable
//! procedure taking an [`ArgumentContext`] and producing an
//! [`ExecutionOutcome`].

use crate::args::ArgumentContext;
use crate::error::{Error, Result};
use crate::outcome::ExecutionOutcome;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// A parameter an action accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

impl Param {
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            required: false,
            description,
        }
    }
}

/// Context passed to an action when it runs on this host
pub struct ActionContext<'a> {
    /// Arguments bound to this invocation
    pub args: &'a ArgumentContext,
    /// Upper bound for any subprocess the action spawns
    pub timeout: Option<Duration>,
}

impl<'a> ActionContext<'a> {
    pub fn new(args: &'a ArgumentContext) -> Self {
        Self {
            args,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Core trait for every runnable action
///
/// Returning `Err` means the action could not run at all (missing tool,
/// spawn failure). A failure the action itself detected belongs in an
/// outcome with a non-zero exit code.
pub trait Action: Send + Sync + fmt::Debug {
    /// Human-readable description
    fn description(&self) -> String;

    /// Parameters this action understands
    fn params(&self) -> &[Param] {
        &[]
    }

    /// Run the action on this host
    fn run(&self, ctx: &ActionContext) -> anyhow::Result<ExecutionOutcome>;
}

/// A boxed action for type-erased storage
pub type BoxedAction = Box<dyn Action>;

/// A named collection of actions
#[derive(Debug)]
pub struct Unit {
    name: String,
    description: String,
    actions: BTreeMap<String, BoxedAction>,
}

impl Unit {
    pub fn builder(name: impl Into<String>) -> UnitBuilder {
        UnitBuilder {
            unit: Unit {
                name: name.into(),
                description: String::new(),
                actions: BTreeMap::new(),
            },
            duplicate: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Look up an action by name
    pub fn resolve_action(&self, action: &str) -> Result<&dyn Action> {
        self.actions
            .get(action)
            .map(AsRef::as_ref)
            .ok_or_else(|| Error::ActionNotFound {
                unit: self.name.clone(),
                action: action.to_string(),
            })
    }

    /// Action names in sorted order
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// Actions in name order
    pub fn actions(&self) -> impl Iterator<Item = (&str, &dyn Action)> {
        self.actions.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

/// Builder for [`Unit`]; rejects duplicate action names at `build()`.
pub struct UnitBuilder {
    unit: Unit,
    duplicate: Option<String>,
}

impl UnitBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.unit.description = description.into();
        self
    }

    pub fn action(self, name: impl Into<String>, action: impl Action + 'static) -> Self {
        self.boxed_action(name, Box::new(action))
    }

    pub fn boxed_action(mut self, name: impl Into<String>, action: BoxedAction) -> Self {
        let name = name.into();
        if self.unit.actions.contains_key(&name) {
            self.duplicate.get_or_insert(name);
        } else {
            self.unit.actions.insert(name, action);
        }
        self
    }

    pub fn build(self) -> Result<Unit> {
        match self.duplicate {
            Some(action) => Err(Error::DuplicateAction {
                unit: self.unit.name,
                action,
            }),
            None => Ok(self.unit),
        }
    }
}

/// Action backed by a plain function, for simple built-ins
pub struct FnAction {
    description: &'static str,
    params: &'static [Param],
    run: fn(&ActionContext) -> anyhow::Result<ExecutionOutcome>,
}

impl FnAction {
    pub const fn new(
        description: &'static str,
        params: &'static [Param],
        run: fn(&ActionContext) -> anyhow::Result<ExecutionOutcome>,
    ) -> Self {
        Self {
            description,
            params,
            run,
        }
    }
}

impl fmt::Debug for FnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction")
            .field("description", &self.description)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Action for FnAction {
    fn description(&self) -> String {
        self.description.to_string()
    }

    fn params(&self) -> &[Param] {
        self.params
    }

    fn run(&self, ctx: &ActionContext) -> anyhow::Result<ExecutionOutcome> {
        (self.run)(ctx)
    }
}
