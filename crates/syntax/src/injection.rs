//! Injection descriptors.

use std::sync::Arc;

use crate::node::SyntaxNode;

/// A rule that may apply wherever its selector matches, independent of the
/// host grammar's pattern tree.
///
/// The selector is a scope-selector expression. It is opaque to this core;
/// the tokenizer evaluates it against its scope stack.
#[derive(Debug, Clone)]
pub struct Injection {
	selector: Arc<str>,
	target: SyntaxNode,
}

impl Injection {
	pub(crate) fn new(selector: Arc<str>, target: SyntaxNode) -> Self {
		Self { selector, target }
	}

	pub fn selector(&self) -> &str {
		&self.selector
	}

	pub fn target(&self) -> &SyntaxNode {
		&self.target
	}
}
