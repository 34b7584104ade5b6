//! The option tree node.
//!
//! # Design
//!
//! - [`Options`] is a shared handle (`Rc<RefCell<..>>`) to a tree node.
//!   Cloning the handle aliases the same node; identity is [`Options::same_node`].
//! - Children are owned by the parent's map; the parent link is a `Weak`
//!   back-reference used only for path computation and re-parenting, never
//!   for deallocation, so there are no reference cycles.
//! - The tree is built and consulted during a single-threaded setup phase,
//!   so `Rc`/`RefCell` suffice and no locking exists.
//!
//! # Example
//!
//! ```rust
//! use torus_options::Options;
//!
//! let options = Options::new();
//! options.at("mesh").set("nx", 64, "input file").unwrap();
//!
//! let nx = options.at("mesh").get("nx", 128, true).unwrap();
//! assert_eq!(nx, 64);
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::attributes::AttributeStore;
use crate::error::{OptionsError, Result};
use crate::value::{OptionScalar, OptionValue};

pub(crate) struct NodeInner {
    /// Local name, case preserved for display; empty for a root.
    pub(crate) name: String,
    pub(crate) value: OptionValue,
    /// Free-text provenance recorded at the most recent write.
    pub(crate) value_source: String,
    /// True once the value has been successfully read.
    pub(crate) used: bool,
    /// Default recorded by the first defaulted read of this still-unset node.
    pub(crate) default_value: Option<OptionValue>,
    pub(crate) attributes: AttributeStore,
    /// Children keyed by lowercased name, insertion order preserved.
    pub(crate) children: IndexMap<String, Options>,
    pub(crate) parent: Weak<RefCell<NodeInner>>,
}

/// A node in the hierarchical options tree.
///
/// A node owns a value, an attribute store, and named children; sectioning
/// and value assignment are independent facets, so a node may hold both a
/// scalar and children.
#[derive(Clone)]
pub struct Options {
    pub(crate) inner: Rc<RefCell<NodeInner>>,
}

thread_local! {
    /// Process-wide root, lazily constructed on first access and torn down
    /// at thread exit. The tree is single-threaded by design.
    static ROOT: Options = Options::new();
}

impl Options {
    /// Create a standalone, detached node.
    pub fn new() -> Self {
        Self::with_name_and_parent(String::new(), Weak::new())
    }

    fn with_name_and_parent(name: String, parent: Weak<RefCell<NodeInner>>) -> Self {
        Options {
            inner: Rc::new(RefCell::new(NodeInner {
                name,
                value: OptionValue::Unset,
                value_source: String::new(),
                used: false,
                default_value: None,
                attributes: AttributeStore::new(),
                children: IndexMap::new(),
                parent,
            })),
        }
    }

    /// The process-wide root. Every call returns the same node.
    pub fn root() -> Options {
        ROOT.with(Options::clone)
    }

    /// True if `self` and `other` are the same node (handle identity).
    pub fn same_node(&self, other: &Options) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Local name, case preserved for display.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Qualified path: the ':'-joined chain of ancestor names from root to
    /// this node. The root's path is empty.
    pub fn path(&self) -> String {
        let (name, parent) = {
            let inner = self.inner.borrow();
            (inner.name.clone(), inner.parent.upgrade())
        };
        match parent {
            None => name,
            Some(parent) => {
                let parent_path = Options { inner: parent }.path();
                if parent_path.is_empty() {
                    name
                } else {
                    format!("{parent_path}:{name}")
                }
            }
        }
    }

    /// The owning parent, or `None` for a root.
    pub fn parent(&self) -> Option<Options> {
        self.inner
            .borrow()
            .parent
            .upgrade()
            .map(|inner| Options { inner })
    }

    /// Resolve a section or key by name, creating it on demand.
    ///
    /// Lookup is case-insensitive; the empty name resolves to this node
    /// itself. A created child records `name` as its display name and this
    /// node as its parent.
    pub fn at(&self, name: &str) -> Options {
        if name.is_empty() {
            return self.clone();
        }
        let key = name.to_lowercase();
        let existing = self.inner.borrow().children.get(&key).cloned();
        if let Some(child) = existing {
            return child;
        }
        let child = Options::with_name_and_parent(name.to_string(), Rc::downgrade(&self.inner));
        self.inner.borrow_mut().children.insert(key, child.clone());
        child
    }

    /// Non-creating lookup of a child by name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<Options> {
        if name.is_empty() {
            return Some(self.clone());
        }
        self.inner.borrow().children.get(&name.to_lowercase()).cloned()
    }

    /// Children in insertion order.
    pub fn children(&self) -> Vec<Options> {
        self.inner.borrow().children.values().cloned().collect()
    }

    /// True if this node has children.
    pub fn is_section(&self) -> bool {
        !self.inner.borrow().children.is_empty()
    }

    /// True if this node holds a value.
    pub fn is_value(&self) -> bool {
        !self.inner.borrow().value.is_unset()
    }

    /// True if this node's value has been explicitly set.
    ///
    /// A defaulted read records its default but does not count as set.
    pub fn is_set(&self) -> bool {
        self.is_value()
    }

    /// True if the named key exists and is set. Does not create the key.
    pub fn is_set_key(&self, key: &str) -> bool {
        self.find(key).is_some_and(|child| child.is_set())
    }

    /// Provenance recorded at the most recent write, empty if never set.
    pub fn source(&self) -> String {
        self.inner.borrow().value_source.clone()
    }

    /// True once the value has been successfully read.
    pub fn is_used(&self) -> bool {
        self.inner.borrow().used
    }

    // ---- typed reads ------------------------------------------------------

    fn read_value<T: OptionScalar>(&self) -> Result<T> {
        let converted = T::from_value(&self.inner.borrow().value);
        match converted {
            Some(value) => {
                self.inner.borrow_mut().used = true;
                Ok(value)
            }
            None => Err(self.conversion_error(T::TYPE_NAME)),
        }
    }

    fn conversion_error(&self, to: &'static str) -> OptionsError {
        let path = self.path();
        OptionsError::Conversion {
            path,
            from: self.inner.borrow().value.tag(),
            to,
        }
    }

    /// Read the value as `T`, marking the node used on success.
    pub fn value_as<T: OptionScalar>(&self) -> Result<T> {
        self.read_value()
    }

    /// Read as bool. See [`OptionValue::to_bool`] for the text rule.
    pub fn as_bool(&self) -> Result<bool> {
        self.value_as()
    }

    /// Read as integer. Reals must be integral within tolerance.
    pub fn as_int(&self) -> Result<i64> {
        self.value_as()
    }

    /// Read as real.
    pub fn as_real(&self) -> Result<f64> {
        self.value_as()
    }

    /// Read as text: the canonical rendering of the stored tag.
    pub fn as_text(&self) -> Result<String> {
        self.value_as()
    }

    /// Read an opaque payload by exact type. Fails on any other tag or on a
    /// payload of a different type.
    pub fn as_opaque<T: 'static>(&self) -> Result<Rc<T>> {
        let payload = match &self.inner.borrow().value {
            OptionValue::Opaque(opaque) => opaque.downcast::<T>(),
            _ => None,
        };
        match payload {
            Some(payload) => {
                self.inner.borrow_mut().used = true;
                Ok(payload)
            }
            None => Err(self.conversion_error("opaque")),
        }
    }

    // ---- defaulted reads --------------------------------------------------

    /// Read the value, falling back to `default` when unset.
    ///
    /// The first defaulted read of an unset node records the default; a
    /// later defaulted read of the same still-unset node must supply an
    /// equal default or it fails with
    /// [`OptionsError::InconsistentDefault`] — call sites are assumed to
    /// agree on the canonical default for an optional parameter. The
    /// default path never marks the node used; a successful read of an
    /// explicitly set value always does. Once the node is set the guard no
    /// longer applies.
    pub fn with_default<T: OptionScalar>(&self, default: T) -> Result<T> {
        self.defaulted_read(default, false)
    }

    /// Keyed defaulted read: `at(key)` followed by the default guard.
    ///
    /// `log` controls diagnostic logging of the resolved value only; it
    /// has no effect on semantics or usage tracking.
    pub fn get<T: OptionScalar>(&self, key: &str, default: T, log: bool) -> Result<T> {
        self.at(key).defaulted_read(default, log)
    }

    fn defaulted_read<T: OptionScalar>(&self, default: T, log: bool) -> Result<T> {
        if self.is_set() {
            let value = self.read_value()?;
            if log {
                tracing::debug!(
                    option = %self.path(),
                    value = %self.inner.borrow().value,
                    "Option read"
                );
            }
            return Ok(value);
        }
        let requested = default.clone().into_value();
        let recorded = self.inner.borrow().default_value.clone();
        match recorded {
            None => {
                self.inner.borrow_mut().default_value = Some(requested.clone());
                if log {
                    tracing::debug!(option = %self.path(), value = %requested, "Option defaulted");
                }
                Ok(default)
            }
            Some(previous) if previous == requested => Ok(default),
            Some(previous) => Err(OptionsError::InconsistentDefault {
                path: self.path(),
                previous: previous.to_string(),
                requested: requested.to_string(),
            }),
        }
    }

    // ---- writes -----------------------------------------------------------

    fn write_value(&self, value: OptionValue, source: &str, force: bool) -> Result<()> {
        let conflict = {
            let inner = self.inner.borrow();
            if !force && !inner.value.is_unset() && inner.value != value {
                Some((inner.value.to_string(), inner.value_source.clone()))
            } else {
                None
            }
        };
        if let Some((existing, previous_source)) = conflict {
            return Err(OptionsError::AlreadySet {
                path: self.path(),
                existing,
                previous_source,
            });
        }
        let mut inner = self.inner.borrow_mut();
        // The used flag stays monotonic across a rewrite to the same value;
        // only storing something genuinely new makes the node unread again.
        if inner.value != value {
            inner.value = value;
            inner.used = false;
        }
        inner.value_source = source.to_string();
        Ok(())
    }

    /// Set a key's value with provenance.
    ///
    /// Fails with [`OptionsError::AlreadySet`] when the key already holds a
    /// different explicitly set value; setting the identical value again is
    /// permitted. A previously recorded default does not block a set.
    pub fn set<V: Into<OptionValue>>(&self, key: &str, value: V, source: &str) -> Result<()> {
        self.at(key).write_value(value.into(), source, false)
    }

    /// Set a key's value unconditionally, overwriting any prior value and
    /// updating its provenance.
    pub fn force_set<V: Into<OptionValue>>(&self, key: &str, value: V, source: &str) {
        // Forced writes cannot conflict
        let _ = self.at(key).write_value(value.into(), source, true);
    }

    /// Assign this node's own value unconditionally.
    pub fn assign<V: Into<OptionValue>>(&self, value: V) {
        self.assign_with_source(value, "");
    }

    /// Assign this node's own value unconditionally, recording provenance.
    pub fn assign_with_source<V: Into<OptionValue>>(&self, value: V, source: &str) {
        let _ = self.write_value(value.into(), source, true);
    }

    /// Overwrite this node's own value. Alias of [`Options::assign`] kept
    /// for call sites that want the overwrite intent spelled out.
    pub fn force<V: Into<OptionValue>>(&self, value: V) {
        self.assign(value);
    }

    // ---- attributes -------------------------------------------------------

    /// Insert or overwrite an attribute. Attributes are independent of the
    /// node's own value and survive its reassignment.
    pub fn set_attribute<V: Into<OptionValue>>(&self, name: &str, value: V) {
        self.inner.borrow_mut().attributes.set(name, value.into());
    }

    /// True if the attribute exists.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.inner.borrow().attributes.contains(name)
    }

    /// Read an attribute as bool; missing reads as `false`.
    pub fn attribute_bool(&self, name: &str) -> Result<bool> {
        let path = self.path();
        self.inner.borrow().attributes.read_bool(name, &path)
    }

    /// Read an attribute as integer; missing reads as `0`.
    pub fn attribute_int(&self, name: &str) -> Result<i64> {
        let path = self.path();
        self.inner.borrow().attributes.read_int(name, &path)
    }

    /// Read an attribute as real; missing reads as `0.0`.
    pub fn attribute_real(&self, name: &str) -> Result<f64> {
        let path = self.path();
        self.inner.borrow().attributes.read_real(name, &path)
    }

    /// Read an attribute as text; missing is an error.
    pub fn attribute_text(&self, name: &str) -> Result<String> {
        let path = self.path();
        self.inner.borrow().attributes.read_text(name, &path)
    }

    /// Attach a documentation string, stored under the `doc` attribute.
    /// Returns the handle for chaining.
    pub fn doc(self, docstring: &str) -> Self {
        self.set_attribute("doc", docstring);
        self
    }

    // ---- copy / assignment ------------------------------------------------

    /// Deep-copy this subtree into newly owned nodes.
    ///
    /// Value, provenance, usage state, default bookkeeping, attributes and
    /// children are all cloned; every cloned child's parent points at its
    /// cloned parent, never back into the source tree. The copy's own
    /// parent link is detached.
    pub fn deep_copy(&self) -> Options {
        self.clone_subtree(Weak::new())
    }

    fn clone_subtree(&self, parent: Weak<RefCell<NodeInner>>) -> Options {
        let (copy, children) = {
            let src = self.inner.borrow();
            let copy = Options {
                inner: Rc::new(RefCell::new(NodeInner {
                    name: src.name.clone(),
                    value: src.value.clone(),
                    value_source: src.value_source.clone(),
                    used: src.used,
                    default_value: src.default_value.clone(),
                    attributes: src.attributes.clone(),
                    children: IndexMap::new(),
                    parent,
                })),
            };
            let children: Vec<(String, Options)> = src
                .children
                .iter()
                .map(|(key, child)| (key.clone(), child.clone()))
                .collect();
            (copy, children)
        };
        for (key, child) in children {
            let cloned = child.clone_subtree(Rc::downgrade(&copy.inner));
            copy.inner.borrow_mut().children.insert(key, cloned);
        }
        copy
    }

    /// Deep-assign from another subtree, preserving this node's identity.
    ///
    /// Replaces this node's value, provenance, attributes, default
    /// bookkeeping and children with deep copies of the source's; this
    /// node's own name and parent link are unchanged, and every copied
    /// child's parent is rebound to this node. Self-assignment is a no-op.
    pub fn copy_from(&self, source: &Options) {
        if self.same_node(source) {
            return;
        }
        let snapshot = source.deep_copy();
        {
            let snap = snapshot.inner.borrow();
            let mut inner = self.inner.borrow_mut();
            inner.value = snap.value.clone();
            inner.value_source = snap.value_source.clone();
            inner.used = snap.used;
            inner.default_value = snap.default_value.clone();
            inner.attributes = snap.attributes.clone();
            inner.children = snap.children.clone();
        }
        for child in self.children() {
            child.inner.borrow_mut().parent = Rc::downgrade(&self.inner);
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::new()
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Options")
            .field("path", &self.path())
            .field("value", &inner.value)
            .field("children", &inner.children.len())
            .finish()
    }
}

// Equality and ordering against literals coerce the literal to the stored
// tag; an impossible coercion compares unequal / unordered. Comparisons do
// not mark the node used.

macro_rules! impl_literal_compare {
    ($($ty:ty),*) => {
        $(
            impl PartialEq<$ty> for Options {
                fn eq(&self, other: &$ty) -> bool {
                    self.inner
                        .borrow()
                        .value
                        .coerced_eq(&OptionValue::from(other.clone()))
                }
            }

            impl PartialOrd<$ty> for Options {
                fn partial_cmp(&self, other: &$ty) -> Option<std::cmp::Ordering> {
                    self.inner
                        .borrow()
                        .value
                        .coerced_cmp(&OptionValue::from(other.clone()))
                }
            }
        )*
    };
}

impl_literal_compare!(bool, i32, i64, f64, &str, String);
