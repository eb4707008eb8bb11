//! Result sinks: where complete bindings go.
//!
//! A sink sees one call per complete binding, in depth-first order, with the
//! matched key of every depth `1..=max_depth`. Returning
//! [`ControlFlow::Break`] stops the join.

use std::ops::ControlFlow;

use leapjoin_storage::Key;

pub trait ResultSink {
    fn on_match(&mut self, keys: &[Key]) -> ControlFlow<()>;
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn on_match(&mut self, keys: &[Key]) -> ControlFlow<()> {
        (**self).on_match(keys)
    }
}

/// Counts bindings without looking at them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountSink {
    pub count: u64,
}

impl ResultSink for CountSink {
    fn on_match(&mut self, _keys: &[Key]) -> ControlFlow<()> {
        self.count += 1;
        ControlFlow::Continue(())
    }
}

/// Materialises every binding.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectSink {
    pub tuples: Vec<Vec<Key>>,
}

impl ResultSink for CollectSink {
    fn on_match(&mut self, keys: &[Key]) -> ControlFlow<()> {
        self.tuples.push(keys.to_vec());
        ControlFlow::Continue(())
    }
}

/// Adapts a closure into a sink.
pub struct FnSink<F>(pub F);

impl<F> ResultSink for FnSink<F>
where
    F: FnMut(&[Key]) -> ControlFlow<()>,
{
    fn on_match(&mut self, keys: &[Key]) -> ControlFlow<()> {
        (self.0)(keys)
    }
}

/// Forwards at most `limit` bindings to the inner sink, then stops the join.
#[derive(Debug)]
pub struct Limit<S> {
    inner: S,
    limit: u64,
    seen: u64,
}

impl<S> Limit<S> {
    pub fn new(inner: S, limit: u64) -> Self {
        Self {
            inner,
            limit,
            seen: 0,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ResultSink> ResultSink for Limit<S> {
    fn on_match(&mut self, keys: &[Key]) -> ControlFlow<()> {
        if self.seen >= self.limit {
            return ControlFlow::Break(());
        }
        self.seen += 1;
        if self.inner.on_match(keys).is_break() || self.seen >= self.limit {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
