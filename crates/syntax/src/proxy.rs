//! Reference nodes: lazily resolved includes.
//!
//! Every `include` directive in a grammar loads as a reference instead of a
//! concrete rule. A reference answers all content accessors by delegating to
//! its target, which is computed on first access and memoized. Targets are
//! found in three ways, one per include form; a chain of includes may pass
//! through several references before landing on a concrete rule, and
//! third-party grammars do ship chains that cycle back on themselves, so the
//! resolution loop tracks what it has seen.
//!
//! The tokenizer re-walks the graph on every keystroke; memoization keeps
//! multi-hop chains from being re-resolved per character.

use std::fmt;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use smallvec::SmallVec;

use crate::node::{NodeKind, RuleId, SyntaxNode};
use crate::table::TableShared;

/// The unresolved side of an include, embedded in a node.
pub(crate) struct Reference {
	kind: ReferenceKind,
	target: OnceCell<SyntaxNode>,
}

pub(crate) enum ReferenceKind {
	/// `#name`: a rule in the nearest enclosing repository.
	Repository(RuleId),
	/// `$self` / `$base`: the including grammar's own root.
	GrammarRoot,
	/// `scope` or `scope#name`: a rule in another grammar, looked up through
	/// the owning table at resolution time. The table reference stays weak;
	/// a reference must not keep its table alive.
	Scope {
		scope: Arc<str>,
		rule: Option<RuleId>,
		table: Weak<TableShared>,
	},
}

impl Reference {
	pub(crate) fn new(kind: ReferenceKind) -> Self {
		Self {
			kind,
			target: OnceCell::new(),
		}
	}

	/// Returns the resolved target, resolving on first call.
	///
	/// Resolution is a pure function of the immutable graph, so two racing
	/// threads compute the same node; the cell guarantees a single stored
	/// winner and hands every caller the same target thereafter.
	pub(crate) fn target<'a>(&'a self, node: &SyntaxNode) -> &'a SyntaxNode {
		self.target.get_or_init(|| resolve(node))
	}

	pub(crate) fn fmt_shallow(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.kind {
			ReferenceKind::Repository(rule_id) => f
				.debug_struct("SyntaxNode::Repository")
				.field("rule_id", &rule_id.get())
				.finish(),
			ReferenceKind::GrammarRoot => f.write_str("SyntaxNode::GrammarRoot"),
			ReferenceKind::Scope { scope, rule, .. } => f
				.debug_struct("SyntaxNode::Scope")
				.field("scope", scope)
				.field("rule_id", &rule.map(RuleId::get))
				.finish(),
		}
	}
}

/// Walks an include chain to its concrete end.
///
/// Each iteration takes one raw hop (no memoization of intermediates, no
/// re-entry into another reference's cell; hop inputs are lexical parents and
/// registered roots, which are always concrete). Revisiting a reference seen
/// earlier in the same walk means the chain cycles and can never produce a
/// rule, so it resolves to the empty node.
fn resolve(start: &SyntaxNode) -> SyntaxNode {
	let mut visited: SmallVec<[SyntaxNode; 4]> = SmallVec::new();
	visited.push(start.clone());
	let mut target = hop(start);
	while target.is_reference() {
		if visited.iter().any(|seen| SyntaxNode::ptr_eq(seen, &target)) {
			tracing::debug!("include chain cycles back on itself");
			return SyntaxNode::empty();
		}
		visited.push(target.clone());
		let next = hop(&target);
		target = next;
	}
	target
}

/// One hop: the node a reference points at directly, which may itself be a
/// reference. Concrete nodes hop to themselves.
fn hop(node: &SyntaxNode) -> SyntaxNode {
	let kind = match &node.inner.kind {
		NodeKind::Reference(reference) => &reference.kind,
		NodeKind::Rule(_) => return node.clone(),
	};
	match kind {
		ReferenceKind::Repository(rule_id) => match node.parent_node() {
			Some(parent) => parent.find_in_repository(*rule_id),
			None => SyntaxNode::empty(),
		},
		ReferenceKind::GrammarRoot => {
			let mut current = node.clone();
			while let Some(parent) = current.parent_node() {
				current = parent;
			}
			current
		}
		ReferenceKind::Scope { scope, rule, table } => {
			let Some(table) = table.upgrade() else {
				tracing::debug!(scope = scope.as_ref(), "syntax table dropped before scope include resolved");
				return SyntaxNode::empty();
			};
			let root = table.get_syntax(scope);
			match rule {
				Some(rule_id) => root.find_in_repository(*rule_id),
				None => root,
			}
		}
	}
}
