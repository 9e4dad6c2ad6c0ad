//! String interning seam.
//!
//! Grammars repeat the same scope names and attribute strings heavily, both
//! within one file and across files. Every string the loader stores goes
//! through an [`Interner`] supplied by the caller per load call, so an editor
//! can pool strings across all of its grammars.

use std::sync::Arc;

use rustc_hash::FxHashSet;

/// Caller-supplied string pool.
pub trait Interner {
	/// Returns a shared copy of `text`, reusing an existing allocation when
	/// the same text was interned before.
	fn intern(&mut self, text: &str) -> Arc<str>;
}

/// Hash-set backed interner for callers without their own pool.
#[derive(Debug, Default)]
pub struct HashInterner {
	pool: FxHashSet<Arc<str>>,
}

impl HashInterner {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.pool.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pool.is_empty()
	}
}

impl Interner for HashInterner {
	fn intern(&mut self, text: &str) -> Arc<str> {
		if let Some(existing) = self.pool.get(text) {
			return existing.clone();
		}
		let interned: Arc<str> = Arc::from(text);
		self.pool.insert(interned.clone());
		interned
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn repeated_interns_share_one_allocation() {
		let mut interner = HashInterner::new();
		let first = interner.intern("source.js");
		let second = interner.intern("source.js");
		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(interner.len(), 1);
	}

	#[test]
	fn distinct_strings_stay_distinct() {
		let mut interner = HashInterner::new();
		let a = interner.intern("keyword.control");
		let b = interner.intern("keyword.operator");
		assert!(!Arc::ptr_eq(&a, &b));
		assert_eq!(interner.len(), 2);
	}
}
