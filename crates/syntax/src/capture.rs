//! Capture descriptors.
//!
//! A rule's capture block maps regex group numbers to either a scope name to
//! tag the matched text with, or a nested rule the tokenizer re-enters for
//! the group's text. This core stores the descriptors only; matching happens
//! in the tokenizer.

use std::sync::Arc;

use crate::node::SyntaxNode;

/// What a single numbered capture group means.
///
/// Capture arrays on a node are dense and hole-preserving: the array is sized
/// to the highest used group index plus one, and groups the grammar never
/// mentions are `None`. Consumers skip holes.
#[derive(Debug, Clone)]
pub enum Capture {
	/// Tag the group's text with this scope name.
	Name(Arc<str>),
	/// Re-parse the group's text against this nested rule.
	Rule(SyntaxNode),
}

impl Capture {
	/// Returns the scope name for a `Name` capture.
	pub fn name(&self) -> Option<&str> {
		match self {
			Capture::Name(name) => Some(name),
			Capture::Rule(_) => None,
		}
	}

	/// Returns the nested rule for a `Rule` capture.
	pub fn rule(&self) -> Option<&SyntaxNode> {
		match self {
			Capture::Rule(rule) => Some(rule),
			Capture::Name(_) => None,
		}
	}
}
