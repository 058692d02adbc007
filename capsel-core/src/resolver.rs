//! Conditional expression resolver.
//!
//! Expressions select between alternative resource identifiers based on
//! feature values: `feature?whenTrue:whenFalse`. Either branch may itself be
//! a full expression (nesting is unbounded) or empty, meaning "no selection".
//!
//! Evaluation is a single left-to-right pass over the token stream with no
//! backtracking. Exactly one branch of every guard is evaluated; the other
//! branch's tokens are still walked, in skip mode, to keep the cursor
//! synchronized, but none of its feature guards are queried. Malformed input
//! (dangling `?`, stray `:`) never fails - missing pieces read as no
//! selection.

use tracing::{debug, trace};

use crate::cache::FeatureCache;

/// One token of a selection expression: a delimiter or an identifier run.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// The `?` delimiter.
    Query,
    /// The `:` delimiter.
    Colon,
    /// A maximal run of non-delimiter characters.
    Ident(String),
}

/// Splits an expression into delimiter tokens and identifier runs.
///
/// Runs are always non-empty: a delimiter terminates the current run, and
/// empty positions (leading/trailing/consecutive delimiters) are represented
/// by the absence of a token rather than an empty one.
fn tokenize(expression: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut run = String::new();
    for ch in expression.chars() {
        match ch {
            '?' | ':' => {
                if !run.is_empty() {
                    tokens.push(Token::Ident(std::mem::take(&mut run)));
                }
                tokens.push(if ch == '?' { Token::Query } else { Token::Colon });
            }
            _ => run.push(ch),
        }
    }
    if !run.is_empty() {
        tokens.push(Token::Ident(run));
    }
    tokens
}

/// Cursor over the token stream. Reading past the end yields `None`, which
/// the evaluator treats as an absent term.
struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
}

impl Cursor {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }
}

/// Evaluates one term of the expression.
///
/// In skip mode the term's tokens are consumed to keep the cursor in step,
/// but no feature guards are queried and the value is discarded by the
/// caller. Skip mode propagates to every nested guard.
fn eval_term(cursor: &mut Cursor, cache: &FeatureCache, skip: bool) -> Option<String> {
    let term = match cursor.next() {
        // Exhausted input: the term is absent.
        None => return None,
        // A colon in term position is an empty left side: no selection.
        Some(Token::Colon) => return None,
        Some(Token::Query) => "?".to_string(),
        Some(Token::Ident(name)) => name,
    };

    // Peek at the following token. A `?` makes the term a guard; anything
    // else (including end of input) makes it a plain identifier. The peeked
    // token is consumed either way, matching the single-pass cursor
    // discipline: a plain term at top level simply abandons the rest.
    let guarded = matches!(cursor.next(), Some(Token::Query));
    if !guarded {
        return Some(term);
    }

    if !skip && cache.query(term.as_str()) {
        trace!(feature = %term, "guard true, taking first branch");
        eval_term(cursor, cache, false)
    } else {
        // Walk the first branch without evaluating it, then evaluate the
        // second branch in the inherited mode.
        eval_term(cursor, cache, true);
        eval_term(cursor, cache, skip)
    }
}

/// Evaluates `expression` against `cache` and returns the selected
/// identifier, or `None` when the expression reduces to no selection.
///
/// The expression is re-tokenized on every call; there is no persisted AST.
pub fn select(expression: &str, cache: &FeatureCache) -> Option<String> {
    let mut cursor = Cursor::new(tokenize(expression));
    // Empty positions never reach here as identifiers: the tokenizer emits
    // no empty runs, and eval_term maps absent terms to None directly.
    let selected = eval_term(&mut cursor, cache, false);
    debug!(
        expression,
        selected = selected.as_deref().unwrap_or("<none>"),
        "expression resolved"
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FeatureValue;
    use crate::env::ProbeContext;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn cache_with(pairs: &[(&str, bool)]) -> FeatureCache {
        let cache = FeatureCache::new(ProbeContext::empty());
        for (name, value) in pairs {
            cache.register(*name, *value);
        }
        cache
    }

    #[test]
    fn empty_expression_selects_nothing() {
        let cache = cache_with(&[]);
        assert_eq!(select("", &cache), None);
    }

    #[test]
    fn plain_identifier_selects_itself() {
        let cache = cache_with(&[]);
        assert_eq!(select("modA", &cache), Some("modA".to_string()));
    }

    #[test]
    fn guard_true_takes_first_branch() {
        let cache = cache_with(&[("x", true)]);
        assert_eq!(select("x?modA:modB", &cache), Some("modA".to_string()));
    }

    #[test]
    fn guard_false_takes_second_branch() {
        let cache = cache_with(&[("x", false)]);
        assert_eq!(select("x?modA:modB", &cache), Some("modB".to_string()));
    }

    #[test]
    fn unregistered_guard_reads_false() {
        let cache = cache_with(&[]);
        assert_eq!(select("x?modA:modB", &cache), Some("modB".to_string()));
    }

    #[test]
    fn skipped_branch_never_queries_its_guards() {
        // With x false, the true branch y?modC:modD is walked but y must
        // never be queried.
        let cache = cache_with(&[("x", false)]);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        cache.register(
            "y",
            FeatureValue::probe(move |_, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }),
        );

        assert_eq!(
            select("x?y?modC:modD:modB", &cache),
            Some("modB".to_string())
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn nested_guards_evaluate_when_taken() {
        let cache = cache_with(&[("x", true), ("y", true)]);
        assert_eq!(
            select("x?y?modC:modD:modB", &cache),
            Some("modC".to_string())
        );

        let cache = cache_with(&[("x", true), ("y", false)]);
        assert_eq!(
            select("x?y?modC:modD:modB", &cache),
            Some("modD".to_string())
        );
    }

    #[test]
    fn nested_expression_in_false_branch() {
        let cache = cache_with(&[("x", false), ("y", true)]);
        assert_eq!(select("x?a:y?b:c", &cache), Some("b".to_string()));
    }

    #[test]
    fn deep_nesting_resolves() {
        let cache = cache_with(&[("a", false), ("b", false), ("c", true)]);
        assert_eq!(select("a?m1:b?m2:c?m3:m4", &cache), Some("m3".to_string()));
    }

    // Ground truth for delimiter edge cases: these follow from the
    // single-pass cursor discipline, not from a cleaner grammar.

    #[test]
    fn leading_colon_selects_nothing() {
        let cache = cache_with(&[]);
        assert_eq!(select(":modB", &cache), None);
    }

    #[test]
    fn dangling_guard_selects_nothing() {
        let cache = cache_with(&[("modA", true)]);
        assert_eq!(select("modA?", &cache), None);

        let cache = cache_with(&[("modA", false)]);
        assert_eq!(select("modA?", &cache), None);
    }

    #[test]
    fn empty_true_branch() {
        // x true selects the empty branch, i.e. nothing.
        let cache = cache_with(&[("x", true)]);
        assert_eq!(select("x?:modB", &cache), None);

        let cache = cache_with(&[("x", false)]);
        assert_eq!(select("x?:modB", &cache), Some("modB".to_string()));
    }

    #[test]
    fn empty_false_branch() {
        let cache = cache_with(&[("x", true)]);
        assert_eq!(select("x?modA:", &cache), Some("modA".to_string()));

        let cache = cache_with(&[("x", false)]);
        assert_eq!(select("x?modA:", &cache), None);
    }

    #[test]
    fn plain_term_abandons_trailing_tokens() {
        let cache = cache_with(&[]);
        assert_eq!(select("a:b", &cache), Some("a".to_string()));
    }

    #[test]
    fn guard_queries_run_left_to_right_only_as_needed() {
        // The winning branch is found without touching guards to its right.
        let cache = cache_with(&[("a", true)]);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        cache.register(
            "b",
            FeatureValue::probe(move |_, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }),
        );

        assert_eq!(select("a?m1:b?m2:m3", &cache), Some("m1".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
