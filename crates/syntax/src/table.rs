//! Scope registry and grammar loader.
//!
//! A [`SyntaxTable`] maps scope names to loaded grammar roots. Lookups come
//! from tokenizer threads on every keystroke and vastly outnumber loads, so
//! the scope map is a copy-on-write snapshot behind [`ArcSwap`]: reads are
//! lock-free, writers clone the map and publish with compare-and-swap.
//!
//! Loading turns one grammar's property-list tree into a rule graph. It runs
//! single-threaded per grammar; includes become reference nodes without
//! recursing into their targets, so grammars may be loaded in any order and
//! cross-grammar includes connect lazily at query time.

use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use strata_plist::{Plist, PlistValue};

use crate::capture::Capture;
use crate::constants::{
	BASE_INCLUDE, CaptureKey, INCLUDE_KEY, INJECTIONS_KEY, NAME_KEY, PATTERNS_KEY, REPOSITORY_KEY,
	SCOPE_NAME_KEY, SELF_INCLUDE, StringKey,
};
use crate::injection::Injection;
use crate::interner::Interner;
use crate::node::{NodeInner, RuleBuilder, RuleId, SyntaxNode};
use crate::proxy::{Reference, ReferenceKind};

/// Registry of loaded grammars, keyed by scope name.
///
/// Cloning the table yields another handle to the same registry. Scope
/// lookups are lock-free; loading takes a short mutex only to intern
/// repository names.
#[derive(Clone, Default)]
pub struct SyntaxTable {
	shared: Arc<TableShared>,
}

pub(crate) struct TableShared {
	scopes: ArcSwap<FxHashMap<Arc<str>, SyntaxNode>>,
	rule_ids: Mutex<RuleIdState>,
}

/// Load-time repository-name interner. The name→id map is transient and
/// dropped by `compact()`; the counter is not, so ids assigned after a
/// compaction never collide with ids already baked into loaded nodes.
struct RuleIdState {
	names: Option<FxHashMap<Arc<str>, RuleId>>,
	next: RuleId,
}

impl Default for RuleIdState {
	fn default() -> Self {
		Self {
			names: None,
			next: RuleId::FIRST,
		}
	}
}

impl Default for TableShared {
	fn default() -> Self {
		Self {
			scopes: ArcSwap::from_pointee(FxHashMap::default()),
			rule_ids: Mutex::new(RuleIdState::default()),
		}
	}
}

impl TableShared {
	pub(crate) fn get_syntax(&self, scope: &str) -> SyntaxNode {
		match self.scopes.load().get(scope) {
			Some(root) => root.clone(),
			None => {
				// Expected when a language's grammar bundle is not installed.
				tracing::info!(scope, "no grammar registered for scope");
				SyntaxNode::empty()
			}
		}
	}
}

impl SyntaxTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Loads one grammar from its parsed property-list tree and registers its
	/// root under the grammar's declared scope name.
	///
	/// Returns the interned scope name, or `None` when the tree declares
	/// none (the grammar is then loaded but unreachable, matching bundles
	/// that ship partial files).
	///
	/// Not re-entrant for the same grammar across threads; different
	/// grammars may load from different threads, and lookups may run
	/// concurrently throughout.
	pub fn load_syntax(&self, grammar: &Plist, interner: &mut dyn Interner) -> Option<Arc<str>> {
		let root = self.load_concrete(grammar, None, interner);
		let scope = root.declared_scope_name()?;
		self.register(scope.clone(), root);
		tracing::trace!(scope = scope.as_ref(), "registered grammar root");
		Some(scope)
	}

	/// Returns the registered root for `scope`, or the shared empty node.
	pub fn get_syntax(&self, scope: &str) -> SyntaxNode {
		self.shared.get_syntax(scope)
	}

	/// Drops every registered scope. Nodes already handed out stay valid;
	/// scope includes into this table resolve to the empty node afterwards
	/// unless the scope is re-registered before their first resolution.
	pub fn clear(&self) {
		self.shared.scopes.store(Arc::new(FxHashMap::default()));
	}

	/// Drops the transient repository-name interner. Ids already baked into
	/// loaded nodes stay valid; later loads re-create the map on demand.
	/// Idempotent.
	pub fn compact(&self) {
		self.shared.rule_ids.lock().names = None;
	}

	/// Interns a repository name, assigning the next id on first sight.
	pub(crate) fn rule_id(&self, name: Arc<str>) -> RuleId {
		let mut guard = self.shared.rule_ids.lock();
		let state = &mut *guard;
		let names = state.names.get_or_insert_with(FxHashMap::default);
		if let Some(&existing) = names.get(&*name) {
			return existing;
		}
		let assigned = state.next;
		state.next = assigned.next();
		names.insert(name, assigned);
		assigned
	}

	fn register(&self, scope: Arc<str>, root: SyntaxNode) {
		loop {
			let current = self.shared.scopes.load_full();
			let mut next = (*current).clone();
			next.insert(scope.clone(), root.clone());
			let previous = self.shared.scopes.compare_and_swap(&current, Arc::new(next));
			if Arc::ptr_eq(&previous, &current) {
				return;
			}
		}
	}

	/// Loads a rule dictionary that may be an include directive.
	fn load_rule(
		&self,
		dict: &Plist,
		parent: &Weak<NodeInner>,
		interner: &mut dyn Interner,
	) -> SyntaxNode {
		if let Some(include) = dict.get(INCLUDE_KEY).and_then(PlistValue::as_str) {
			return self.load_reference(include, parent, interner);
		}
		self.load_concrete(dict, Some(parent), interner)
	}

	/// Loads a concrete rule. The grammar's top level always comes through
	/// here: an `include` key on the root dictionary is not a rule position
	/// and is ignored like any other unknown key.
	fn load_concrete(
		&self,
		dict: &Plist,
		parent: Option<&Weak<NodeInner>>,
		interner: &mut dyn Interner,
	) -> SyntaxNode {
		let inner = Arc::new_cyclic(|node| {
			let mut builder = RuleBuilder::default();
			for (key, value) in dict.entries() {
				self.load_key(&mut builder, key, value, node, interner);
			}
			NodeInner {
				parent: parent.cloned(),
				kind: crate::node::NodeKind::Rule(builder.freeze()),
			}
		});
		SyntaxNode::from_inner(inner)
	}

	fn load_key(
		&self,
		builder: &mut RuleBuilder,
		key: &str,
		value: &PlistValue,
		node: &Weak<NodeInner>,
		interner: &mut dyn Interner,
	) {
		if key == SCOPE_NAME_KEY {
			if let Some(scope) = value.as_str() {
				builder.set_scope_name(interner.intern(scope));
			}
		} else if let Some(string_key) = StringKey::from_key(key) {
			if let Some(text) = value.as_str() {
				builder.set_string(string_key, interner.intern(text));
			}
		} else if let Some(capture_key) = CaptureKey::from_key(key) {
			if let Some(dict) = value.as_dict() {
				builder.set_captures(capture_key, self.load_captures(dict, node, interner));
			}
		} else if key == REPOSITORY_KEY {
			if let Some(dict) = value.as_dict() {
				for (name, entry) in dict.entries() {
					if let Some(entry_dict) = entry.as_dict() {
						let rule_id = self.rule_id(interner.intern(name));
						builder.put_repository_rule(rule_id, self.load_rule(entry_dict, node, interner));
					}
				}
			}
		} else if key == PATTERNS_KEY {
			if let Some(items) = value.as_array() {
				for item in items {
					if let Some(item_dict) = item.as_dict() {
						builder.push_child(self.load_rule(item_dict, node, interner));
					}
				}
			}
		} else if key == INJECTIONS_KEY {
			if let Some(dict) = value.as_dict() {
				for (selector, entry) in dict.entries() {
					if let Some(entry_dict) = entry.as_dict() {
						let target = self.load_rule(entry_dict, node, interner);
						builder.push_injection(Injection::new(interner.intern(selector), target));
					}
				}
			}
		}
		// Remaining keys (firstLineMatch, fileTypes, comment, ...) carry data
		// for collaborators outside this core.
	}

	/// Loads one capture block into a dense, hole-preserving array.
	///
	/// Keys are regex group numbers; capture blocks commonly mix numeric and
	/// non-numeric siblings, so non-numeric keys are skipped rather than
	/// treated as errors. A capture dictionary with a `name` tags the group;
	/// anything else is a nested rule whose lexical parent is the rule being
	/// built, so its repository lookups go through the right ancestors.
	fn load_captures(
		&self,
		dict: &Plist,
		node: &Weak<NodeInner>,
		interner: &mut dyn Interner,
	) -> Box<[Option<Capture>]> {
		let mut groups: Vec<(usize, Capture)> = Vec::with_capacity(dict.len());
		for (key, value) in dict.entries() {
			let Ok(index) = key.parse::<u32>() else { continue };
			let Some(capture_dict) = value.as_dict() else { continue };
			let capture = match capture_dict.get(NAME_KEY).and_then(PlistValue::as_str) {
				Some(name) => Capture::Name(interner.intern(name)),
				None => Capture::Rule(self.load_rule(capture_dict, node, interner)),
			};
			groups.push((index as usize, capture));
		}
		let len = groups.iter().map(|(index, _)| index + 1).max().unwrap_or(0);
		let mut captures = Vec::new();
		captures.resize_with(len, || None);
		for (index, capture) in groups {
			captures[index] = Some(capture);
		}
		captures.into_boxed_slice()
	}

	fn load_reference(
		&self,
		include: &str,
		parent: &Weak<NodeInner>,
		interner: &mut dyn Interner,
	) -> SyntaxNode {
		let kind = if let Some(name) = include.strip_prefix('#') {
			ReferenceKind::Repository(self.rule_id(interner.intern(name)))
		} else if include == SELF_INCLUDE || include == BASE_INCLUDE {
			ReferenceKind::GrammarRoot
		} else {
			let (scope, rule) = match include.split_once('#') {
				Some((scope, name)) => (scope, Some(self.rule_id(interner.intern(name)))),
				None => (include, None),
			};
			ReferenceKind::Scope {
				scope: interner.intern(scope),
				rule,
				table: Arc::downgrade(&self.shared),
			}
		};
		SyntaxNode::new_reference(parent.clone(), Reference::new(kind))
	}
}
