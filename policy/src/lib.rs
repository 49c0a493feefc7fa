//! # Access Policy
//!
//! This crate provides the access port the wiki view asks before showing or
//! changing anything.
//!
//! ## Philosophy
//!
//! - **Yes or no**: a policy answers one question, "may the current user
//!   exercise this right on this entity", and nothing else.
//! - **Policy observes; it does not own**: policies never touch storage.
//!   Rights that depend on repository state (overwrite) are derived by the
//!   caller from the basic rights.
//! - **Deterministic and side-effect free**: same inputs, same answer.
//!
//! ## Core Concepts
//!
//! - `Right`: view, edit, delete, overwrite
//! - `AccessPolicy`: trait evaluated per (right, entity)
//! - `AllowAll` / `DenyAll`: trivial policies
//! - `GrantTable`: ordered rule table with most-specific-scope-wins semantics
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - Authentication (a policy instance is already bound to one user)
//! - A group/role directory
//! - An audit log

use core::fmt;
use core_types::{EntityRef, PageRef, SpaceRef};
use serde::{Deserialize, Serialize};

/// A right that can be checked on an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Right {
    /// See the entity in listings and read it
    View,
    /// Create or modify the entity
    Edit,
    /// Remove the entity
    Delete,
    /// Replace the entity: delete if it exists, edit otherwise
    Overwrite,
}

impl Right {
    /// Returns the lowercase right name
    pub fn as_str(&self) -> &'static str {
        match self {
            Right::View => "view",
            Right::Edit => "edit",
            Right::Delete => "delete",
            Right::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access policy trait
///
/// Implementations decide whether the user the policy is bound to holds a
/// right on an entity. `Right::Overwrite` is normally resolved by the caller
/// into `Delete` or `Edit` before reaching the policy.
pub trait AccessPolicy: Send + Sync {
    /// Returns true if the right is granted on the target
    fn has_access(&self, right: Right, target: &EntityRef) -> bool;

    /// Returns the name of this policy (for logging)
    fn name(&self) -> &str;
}

/// Policy granting every right
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn has_access(&self, _right: Right, _target: &EntityRef) -> bool {
        true
    }

    fn name(&self) -> &str {
        "AllowAll"
    }
}

/// Policy denying every right
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl AccessPolicy for DenyAll {
    fn has_access(&self, _right: Right, _target: &EntityRef) -> bool {
        false
    }

    fn name(&self) -> &str {
        "DenyAll"
    }
}

/// Where a rule applies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Every entity of the wiki
    Wiki,
    /// A space, its nested spaces, their pages and attachments
    Space(SpaceRef),
    /// One page and its attachments
    Page(PageRef),
}

impl Scope {
    /// Returns the specificity of this scope for `target`, or None if it does
    /// not apply. Higher wins.
    fn specificity(&self, target: &EntityRef) -> Option<usize> {
        match self {
            Scope::Wiki => Some(0),
            Scope::Space(space) => {
                let target_space = target.space()?;
                let depth = space.segments().len();
                let covers = target_space.segments().len() >= depth
                    && target_space.segments()[..depth] == *space.segments();
                covers.then_some(depth)
            }
            Scope::Page(page) => (target.page() == Some(page)).then_some(usize::MAX),
        }
    }
}

/// Whether a rule grants or refuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

/// One entry of a grant table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub right: Right,
    pub scope: Scope,
    pub effect: Effect,
}

/// Rule-based policy
///
/// The most specific matching rule wins (page over nested space over
/// enclosing space over wiki). On a tie, `Deny` wins. Without a matching
/// rule the default effect applies.
///
/// The table is plain data and can be loaded from JSON:
///
/// ```
/// use policy::{AccessPolicy, GrantTable, Right};
/// use core_types::{EntityRef, PageRef, SpaceRef};
///
/// let table: GrantTable = serde_json::from_str(r#"{
///     "default_effect": "allow",
///     "rules": [
///         { "right": "edit", "scope": { "space": { "segments": ["Archive"] } }, "effect": "deny" }
///     ]
/// }"#).unwrap();
///
/// let page = EntityRef::Page(PageRef::new("Old", SpaceRef::new("Archive")));
/// assert!(table.has_access(Right::View, &page));
/// assert!(!table.has_access(Right::Edit, &page));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantTable {
    default_effect: Effect,
    #[serde(default)]
    rules: Vec<Rule>,
}

impl GrantTable {
    /// Creates a table allowing everything not explicitly denied
    pub fn permissive() -> Self {
        Self {
            default_effect: Effect::Allow,
            rules: Vec::new(),
        }
    }

    /// Creates a table denying everything not explicitly allowed
    pub fn restrictive() -> Self {
        Self {
            default_effect: Effect::Deny,
            rules: Vec::new(),
        }
    }

    /// Adds an allow rule
    pub fn allow(mut self, right: Right, scope: Scope) -> Self {
        self.rules.push(Rule {
            right,
            scope,
            effect: Effect::Allow,
        });
        self
    }

    /// Adds a deny rule
    pub fn deny(mut self, right: Right, scope: Scope) -> Self {
        self.rules.push(Rule {
            right,
            scope,
            effect: Effect::Deny,
        });
        self
    }

    /// Returns the rules in insertion order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluates the table
    pub fn evaluate(&self, right: Right, target: &EntityRef) -> Effect {
        let mut best: Option<(usize, Effect)> = None;
        for rule in self.rules.iter().filter(|r| r.right == right) {
            let Some(specificity) = rule.scope.specificity(target) else {
                continue;
            };
            best = match best {
                Some((current, _)) if specificity < current => best,
                Some((current, Effect::Deny)) if specificity == current => best,
                _ => Some((specificity, rule.effect)),
            };
        }
        best.map(|(_, effect)| effect).unwrap_or(self.default_effect)
    }
}

impl Default for GrantTable {
    fn default() -> Self {
        Self::permissive()
    }
}

impl AccessPolicy for GrantTable {
    fn has_access(&self, right: Right, target: &EntityRef) -> bool {
        self.evaluate(right, target) == Effect::Allow
    }

    fn name(&self) -> &str {
        "GrantTable"
    }
}
