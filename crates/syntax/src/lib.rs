//! TextMate grammar rule graphs.
//!
//! This crate loads declarative syntax-highlighting grammars into a queryable
//! rule graph. External collaborators parse grammar files into property-list
//! trees ([`strata_plist`]) and walk the resulting graph with a regex-driven
//! tokenizer; this crate owns what sits between: the rule data model, lazy
//! cycle-safe resolution of `include` indirections (within a grammar, to a
//! grammar's own root, and across grammars by scope name), and the scope
//! registry serving lock-free lookups to tokenizer threads.
//!
//! Everything here degrades instead of failing: unknown scopes, missing
//! repository rules, and cyclic include chains all answer with the shared
//! empty node, because a tokenizer must never fail a keystroke over a bad or
//! absent grammar.

mod capture;
mod constants;
mod injection;
mod interner;
mod node;
mod proxy;
mod table;

pub use capture::Capture;
pub use constants::{CaptureKey, StringKey};
pub use injection::Injection;
pub use interner::{HashInterner, Interner};
pub use node::{RuleId, SyntaxNode};
pub use table::SyntaxTable;
