#![allow(unused_crate_dependencies)]

//! End-to-end rule graph behavior over realistic grammars, public API only.

use proptest::prelude::*;
use serde_json::json;
use strata_plist::Plist;
use strata_syntax::{CaptureKey, HashInterner, StringKey, SyntaxNode, SyntaxTable};

fn plist(value: serde_json::Value) -> Plist {
	Plist::try_from(value).unwrap()
}

/// A small but complete configuration-file grammar: repository rules,
/// captures with holes, nested patterns, `$self`, and an injection.
fn conf_grammar() -> serde_json::Value {
	json!({
		"scopeName": "source.conf",
		"patterns": [
			{"include": "#comment"},
			{"include": "#section"},
			{"include": "#assignment"},
		],
		"repository": {
			"comment": {"match": "#.*$", "name": "comment.line.number-sign.conf"},
			"section": {
				"begin": "^\\[",
				"end": "\\]",
				"name": "entity.name.section.conf",
				"patterns": [{"include": "$self"}],
			},
			"assignment": {
				"match": "^(\\w+)\\s*=\\s*(.*)$",
				"captures": {
					"1": {"name": "variable.other.conf"},
					"2": {"patterns": [{"include": "#value"}]},
				},
			},
			"value": {
				"patterns": [
					{"match": "[0-9]+", "name": "constant.numeric.conf"},
					{"match": "\".*\"", "name": "string.quoted.double.conf"},
				],
			},
		},
		"injections": {
			"L:source.conf - string": {
				"patterns": [{"include": "#comment"}],
			},
		},
	})
}

/// A host grammar that embeds `source.conf` both by bare scope and by
/// scope#rule.
fn template_grammar() -> serde_json::Value {
	json!({
		"scopeName": "text.conf-template",
		"patterns": [
			{"begin": "\\{\\{", "end": "\\}\\}", "patterns": [{"include": "source.conf"}]},
			{"include": "source.conf#comment"},
		],
	})
}

#[test]
fn full_grammar_round_trip() {
	let table = SyntaxTable::new();
	let mut interner = HashInterner::new();

	let scope = table.load_syntax(&plist(conf_grammar()), &mut interner);
	assert_eq!(scope.as_deref(), Some("source.conf"));

	let root = table.get_syntax("source.conf");
	assert_eq!(root.scope_name(), Some("source.conf"));
	assert_eq!(root.children().len(), 3);
	assert_eq!(root.injections().len(), 1);

	// Includes are transparent: the first child reads as the comment rule.
	let comment = &root.children()[0];
	assert_eq!(comment.string_attribute(StringKey::Match), Some("#.*$"));
	assert_eq!(
		comment.string_attribute(StringKey::Name),
		Some("comment.line.number-sign.conf")
	);

	// The section rule keeps begin/end and recurses into the whole grammar.
	let section = &root.children()[1];
	assert_eq!(section.string_attribute(StringKey::Begin), Some("^\\["));
	assert_eq!(section.string_attribute(StringKey::End), Some("\\]"));
	let self_ref = &section.children()[0];
	assert_eq!(self_ref.scope_name(), Some("source.conf"));
	assert_eq!(self_ref.children().len(), 3);

	// Assignment captures: group 0 is a hole, 1 tags, 2 re-enters a rule.
	let assignment = &root.children()[2];
	let captures = assignment.capture_rules(CaptureKey::Captures).unwrap();
	assert_eq!(captures.len(), 3);
	assert!(captures[0].is_none());
	assert_eq!(
		captures[1].as_ref().and_then(|capture| capture.name()),
		Some("variable.other.conf")
	);
	let value_rule = captures[2].as_ref().and_then(|capture| capture.rule()).unwrap();
	let value_include = &value_rule.children()[0];
	assert_eq!(value_include.children().len(), 2);

	// Injection selector is opaque; its target resolves like any rule.
	let injection = &root.injections()[0];
	assert_eq!(injection.selector(), "L:source.conf - string");
	assert_eq!(
		injection.target().children()[0].string_attribute(StringKey::Match),
		Some("#.*$")
	);
}

#[test]
fn embedded_grammar_resolves_across_the_table() {
	let table = SyntaxTable::new();
	let mut interner = HashInterner::new();

	// Host loads before guest; nothing resolves until first access.
	table.load_syntax(&plist(template_grammar()), &mut interner);
	table.load_syntax(&plist(conf_grammar()), &mut interner);

	let host = table.get_syntax("text.conf-template");
	let embedded = &host.children()[0].children()[0];
	assert_eq!(embedded.scope_name(), Some("source.conf"));
	assert_eq!(embedded.children().len(), 3);

	let comment_ref = &host.children()[1];
	assert_eq!(
		comment_ref.string_attribute(StringKey::Name),
		Some("comment.line.number-sign.conf")
	);
	// Position stays in the host grammar even though content comes from the
	// guest.
	assert!(SyntaxNode::ptr_eq(&comment_ref.parent_node().unwrap(), &host));
}

#[test]
fn missing_guest_grammar_degrades_to_empty() {
	let table = SyntaxTable::new();
	let mut interner = HashInterner::new();
	table.load_syntax(&plist(template_grammar()), &mut interner);

	// source.conf was never installed: both embeds answer with nothing.
	let host = table.get_syntax("text.conf-template");
	assert!(host.children()[0].children()[0].children().is_empty());
	assert_eq!(host.children()[1].string_attribute(StringKey::Name), None);
}

#[test]
fn deep_self_recursion_walks_without_overflow() {
	let table = SyntaxTable::new();
	let mut interner = HashInterner::new();
	table.load_syntax(&plist(conf_grammar()), &mut interner);

	// Walk the graph the way a tokenizer does, guarding repeats by identity.
	let root = table.get_syntax("source.conf");
	let mut seen: Vec<SyntaxNode> = Vec::new();
	let mut queue = vec![root];
	while let Some(node) = queue.pop() {
		if seen.iter().any(|visited| SyntaxNode::ptr_eq(visited, &node)) {
			continue;
		}
		for child in node.children() {
			queue.push(child.clone());
		}
		for injection in node.injections() {
			queue.push(injection.target().clone());
		}
		seen.push(node);
	}
	// Root, its three includes, the section's self-include (whose children
	// are the root's own includes again, deduplicated by identity), and the
	// injection target with its comment include.
	assert!(seen.len() >= 6);
}

proptest! {
	#[test]
	fn children_preserve_declaration_order(names in prop::collection::vec("[a-z]{1,12}", 0..24)) {
		let patterns: Vec<serde_json::Value> =
			names.iter().map(|name| json!({"name": name})).collect();
		let table = SyntaxTable::new();
		let mut interner = HashInterner::new();
		table.load_syntax(
			&plist(json!({"scopeName": "source.prop", "patterns": patterns})),
			&mut interner,
		);

		let root = table.get_syntax("source.prop");
		let loaded: Vec<&str> = root
			.children()
			.iter()
			.filter_map(|child| child.string_attribute(StringKey::Name))
			.collect();
		prop_assert_eq!(loaded, names.iter().map(String::as_str).collect::<Vec<_>>());
	}
}
