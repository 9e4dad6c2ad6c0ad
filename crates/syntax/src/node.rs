//! Rule nodes.
//!
//! A loaded grammar is a tree of rules with parent back-references, built
//! once by the loader and then read by tokenizer threads for the lifetime of
//! the table entry. Nodes are either concrete rules or references (lazily
//! resolved includes, see [`crate::proxy`]); both sit behind the same
//! [`SyntaxNode`] handle so consumers walk the graph without caring which
//! they hold.
//!
//! Rules are assembled through a builder while the loader recurses and are
//! frozen before anything else can observe them. Freezing trims every backing
//! collection, so long-lived nodes carry no spare capacity.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;

use crate::capture::Capture;
use crate::constants::{CaptureKey, StringKey};
use crate::injection::Injection;
use crate::proxy::Reference;

/// Identifier of a named repository entry.
///
/// Ids are assigned by the owning table's interner, starting at 1 and never
/// reused. "Not found" is expressed by the empty node, never by a reserved
/// id value; zero is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(NonZeroU32);

impl RuleId {
	pub(crate) const FIRST: RuleId = RuleId(NonZeroU32::MIN);

	pub(crate) fn next(self) -> Self {
		Self(self.0.saturating_add(1))
	}

	pub fn get(self) -> u32 {
		self.0.get()
	}
}

/// Shared handle to a rule graph node.
///
/// Cloning is cheap; all clones observe the same node. Identity comparisons
/// go through [`SyntaxNode::ptr_eq`].
#[derive(Clone)]
pub struct SyntaxNode {
	pub(crate) inner: Arc<NodeInner>,
}

pub(crate) struct NodeInner {
	/// Lexical parent in the grammar tree. Non-owning: the tree owns children
	/// downward, back-references stay weak so cyclic include chains cannot
	/// leak the graph.
	pub(crate) parent: Option<Weak<NodeInner>>,
	pub(crate) kind: NodeKind,
}

pub(crate) enum NodeKind {
	Rule(RuleData),
	Reference(Reference),
}

/// Frozen attribute storage of a concrete rule.
#[derive(Default)]
pub(crate) struct RuleData {
	/// Set on a grammar's root node only.
	pub(crate) scope_name: Option<Arc<str>>,
	strings: [Option<Arc<str>>; StringKey::COUNT],
	captures: [Option<Box<[Option<Capture>]>>; CaptureKey::COUNT],
	/// `patterns` in declaration order. Order is match priority; never
	/// re-sorted.
	children: Box<[SyntaxNode]>,
	/// Sorted by id for binary-search lookup.
	repository: Box<[(RuleId, SyntaxNode)]>,
	injections: Box<[Injection]>,
}

impl RuleData {
	fn repository_get(&self, rule_id: RuleId) -> Option<&SyntaxNode> {
		self.repository
			.binary_search_by_key(&rule_id, |(id, _)| *id)
			.ok()
			.map(|index| &self.repository[index].1)
	}
}

static EMPTY: Lazy<SyntaxNode> = Lazy::new(|| SyntaxNode {
	inner: Arc::new(NodeInner {
		parent: None,
		kind: NodeKind::Rule(RuleData::default()),
	}),
});

static EMPTY_DATA: Lazy<RuleData> = Lazy::new(RuleData::default);

impl SyntaxNode {
	/// Returns the shared empty node: no parent, no children, no scope name.
	///
	/// Every "not found" path in this crate answers with this node so callers
	/// can keep walking without null checks.
	pub fn empty() -> SyntaxNode {
		EMPTY.clone()
	}

	/// Returns true if this handle is the shared empty node.
	pub fn is_empty_node(&self) -> bool {
		Arc::ptr_eq(&self.inner, &EMPTY.inner)
	}

	/// Identity comparison: do both handles point at the same node?
	pub fn ptr_eq(a: &SyntaxNode, b: &SyntaxNode) -> bool {
		Arc::ptr_eq(&a.inner, &b.inner)
	}

	/// Returns the scope name declared by this grammar's root, if any.
	pub fn scope_name(&self) -> Option<&str> {
		self.data().scope_name.as_deref()
	}

	/// Returns the string attribute stored under `key`.
	pub fn string_attribute(&self, key: StringKey) -> Option<&str> {
		self.data().strings[key.index()].as_deref()
	}

	/// Returns the capture array for `key`, or `None` if the grammar never
	/// set that key on this rule.
	///
	/// The array is dense with holes: unused group indices are `None` and
	/// must be skipped, not treated as captures.
	pub fn capture_rules(&self, key: CaptureKey) -> Option<&[Option<Capture>]> {
		self.data().captures[key.index()].as_deref()
	}

	/// Returns the rule's `patterns` children in declaration order.
	pub fn children(&self) -> &[SyntaxNode] {
		&self.data().children
	}

	/// Returns the injections declared on this rule.
	pub fn injections(&self) -> &[Injection] {
		&self.data().injections
	}

	/// Returns the lexical parent of this node.
	///
	/// This is the one accessor a reference does not forward: a reference is
	/// transparent for content but keeps its own position in the tree.
	pub fn parent_node(&self) -> Option<SyntaxNode> {
		let parent = self.inner.parent.as_ref()?.upgrade()?;
		Some(SyntaxNode { inner: parent })
	}

	/// Looks up a repository rule, delegating to ancestors when this node has
	/// no entry of its own. Returns the empty node when no ancestor knows the
	/// id.
	pub fn find_in_repository(&self, rule_id: RuleId) -> SyntaxNode {
		match &self.inner.kind {
			NodeKind::Reference(_) => self.resolved().find_in_repository(rule_id),
			NodeKind::Rule(data) => {
				if let Some(found) = data.repository_get(rule_id) {
					return found.clone();
				}
				match self.parent_node() {
					Some(parent) => parent.find_in_repository(rule_id),
					None => {
						tracing::warn!(rule_id = rule_id.get(), "rule not found in any repository");
						SyntaxNode::empty()
					}
				}
			}
		}
	}

	pub(crate) fn from_inner(inner: Arc<NodeInner>) -> Self {
		Self { inner }
	}

	pub(crate) fn new_reference(parent: Weak<NodeInner>, reference: Reference) -> Self {
		Self {
			inner: Arc::new(NodeInner {
				parent: Some(parent),
				kind: NodeKind::Reference(reference),
			}),
		}
	}

	pub(crate) fn is_reference(&self) -> bool {
		matches!(self.inner.kind, NodeKind::Reference(_))
	}

	/// Follows reference resolution to the underlying concrete node.
	/// Resolution runs on first access and is memoized; see [`crate::proxy`].
	pub(crate) fn resolved(&self) -> &SyntaxNode {
		match &self.inner.kind {
			NodeKind::Rule(_) => self,
			NodeKind::Reference(reference) => reference.target(self),
		}
	}

	/// Root scope name without going through reference resolution. Only a
	/// concrete node can answer; the loader uses this on freshly built roots.
	pub(crate) fn declared_scope_name(&self) -> Option<Arc<str>> {
		match &self.inner.kind {
			NodeKind::Rule(data) => data.scope_name.clone(),
			NodeKind::Reference(_) => None,
		}
	}

	fn data(&self) -> &RuleData {
		let node = self.resolved();
		match &node.inner.kind {
			NodeKind::Rule(data) => data,
			// Resolution always lands on a concrete node; keep the accessor
			// total regardless.
			NodeKind::Reference(_) => &EMPTY_DATA,
		}
	}
}

impl fmt::Debug for SyntaxNode {
	// Shallow on purpose: resolved references can point back into their own
	// ancestry, so recursing into children or targets must not happen here.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.inner.kind {
			NodeKind::Rule(data) => f
				.debug_struct("SyntaxNode")
				.field("scope_name", &data.scope_name)
				.field("children", &data.children.len())
				.field("repository", &data.repository.len())
				.field("injections", &data.injections.len())
				.finish_non_exhaustive(),
			NodeKind::Reference(reference) => reference.fmt_shallow(f),
		}
	}
}

/// Accumulates a rule's attributes while the loader recurses over its
/// dictionary, then freezes into [`RuleData`].
#[derive(Default)]
pub(crate) struct RuleBuilder {
	scope_name: Option<Arc<str>>,
	strings: [Option<Arc<str>>; StringKey::COUNT],
	captures: [Option<Box<[Option<Capture>]>>; CaptureKey::COUNT],
	children: Vec<SyntaxNode>,
	repository: Vec<(RuleId, SyntaxNode)>,
	injections: Vec<Injection>,
}

impl RuleBuilder {
	pub(crate) fn set_scope_name(&mut self, scope_name: Arc<str>) {
		self.scope_name = Some(scope_name);
	}

	pub(crate) fn set_string(&mut self, key: StringKey, value: Arc<str>) {
		self.strings[key.index()] = Some(value);
	}

	pub(crate) fn set_captures(&mut self, key: CaptureKey, captures: Box<[Option<Capture>]>) {
		self.captures[key.index()] = Some(captures);
	}

	pub(crate) fn push_child(&mut self, child: SyntaxNode) {
		self.children.push(child);
	}

	pub(crate) fn put_repository_rule(&mut self, rule_id: RuleId, rule: SyntaxNode) {
		self.repository.push((rule_id, rule));
	}

	pub(crate) fn push_injection(&mut self, injection: Injection) {
		self.injections.push(injection);
	}

	/// One-time compaction: trims every collection to its final size and
	/// sorts the repository for binary search. Empty collections end up as
	/// zero-allocation empty slices.
	pub(crate) fn freeze(self) -> RuleData {
		let mut repository = self.repository;
		repository.sort_by_key(|(id, _)| *id);
		RuleData {
			scope_name: self.scope_name,
			strings: self.strings,
			captures: self.captures,
			children: self.children.into_boxed_slice(),
			repository: repository.into_boxed_slice(),
			injections: self.injections.into_boxed_slice(),
		}
	}
}
