//! The action trait and its combinators.

use std::sync::Arc;

use crate::{Request, RequestPredicate, WeftError};

/// Explicit result of one action step.
///
/// `Halt` means a terminal response exists and no later step in the chain
/// may run. Combinators consult only this value; they never inspect the
/// response fields behind an action's back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Processing may continue with the next action in the chain.
    Continue,
    /// A terminal response has been produced; skip the rest of the chain.
    Halt,
}

impl Flow {
    /// True if this step ended the chain.
    pub fn is_halt(self) -> bool {
        matches!(self, Flow::Halt)
    }

    /// Derive the flow from the current response state.
    ///
    /// For actions that mutate the raw response handle directly: yields
    /// `Continue` while the response is still open (no status other than
    /// 200, no entity) and `Halt` once it is terminal.
    pub fn of(req: &Request) -> Flow {
        if req.is_ok() {
            Flow::Continue
        } else {
            Flow::Halt
        }
    }
}

/// A composable unit of request-processing work.
///
/// Actions run against a `&mut Request` and report how the chain should
/// proceed. Plain closures of the right shape are actions:
///
/// ```rust,ignore
/// let hello = |req: &mut Request| -> Result<Flow, WeftError> {
///     req.markup().p().write("hello").end()?;
///     Ok(Flow::Continue)
/// };
/// ```
pub trait Action: Send + Sync {
    /// Perform this step. Errors abort the remaining chain unmodified.
    fn apply(&self, req: &mut Request) -> Result<Flow, WeftError>;
}

impl<F> Action for F
where
    F: Fn(&mut Request) -> Result<Flow, WeftError> + Send + Sync,
{
    fn apply(&self, req: &mut Request) -> Result<Flow, WeftError> {
        self(req)
    }
}

impl Action for Box<dyn Action> {
    fn apply(&self, req: &mut Request) -> Result<Flow, WeftError> {
        (**self).apply(req)
    }
}

impl Action for Arc<dyn Action> {
    fn apply(&self, req: &mut Request) -> Result<Flow, WeftError> {
        (**self).apply(req)
    }
}

/// Combinator adapters available on every action.
pub trait ActionExt: Action + Sized {
    /// Run `self`, then `after` - but only if `self` yielded `Continue`.
    ///
    /// This is the short-circuit law: once any step halts the chain, no
    /// subsequent step runs.
    fn and_then<B: Action>(self, after: B) -> AndThen<Self, B> {
        AndThen {
            first: self,
            second: after,
        }
    }

    /// Run `before` first, then `self`. Order convenience for `and_then`.
    fn compose<B: Action>(self, before: B) -> AndThen<B, Self> {
        AndThen {
            first: before,
            second: self,
        }
    }

    /// Surround `self` with a leading and a trailing action.
    fn wrap<B: Action, C: Action>(self, before: B, after: C) -> AndThen<AndThen<B, Self>, C> {
        self.compose(before).and_then(after)
    }

    /// Run `self` only when the pure predicate holds; otherwise no-op.
    fn filter<P>(self, predicate: P) -> Filter<Self, P>
    where
        P: Fn(&Request) -> bool + Send + Sync,
    {
        Filter {
            action: self,
            predicate,
        }
    }

    /// Run `self` only when the fallible predicate passes.
    ///
    /// A predicate error propagates exactly like an action error.
    fn filter_request<P: RequestPredicate>(self, predicate: P) -> FilterRequest<Self, P> {
        FilterRequest {
            action: self,
            predicate,
        }
    }
}

impl<A: Action> ActionExt for A {}

/// Sequential composition of two actions. See [`ActionExt::and_then`].
pub struct AndThen<A, B> {
    first: A,
    second: B,
}

impl<A: Action, B: Action> Action for AndThen<A, B> {
    fn apply(&self, req: &mut Request) -> Result<Flow, WeftError> {
        match self.first.apply(req)? {
            Flow::Halt => Ok(Flow::Halt),
            Flow::Continue => self.second.apply(req),
        }
    }
}

/// Conditional gate over a pure predicate. See [`ActionExt::filter`].
pub struct Filter<A, P> {
    action: A,
    predicate: P,
}

impl<A, P> Action for Filter<A, P>
where
    A: Action,
    P: Fn(&Request) -> bool + Send + Sync,
{
    fn apply(&self, req: &mut Request) -> Result<Flow, WeftError> {
        if (self.predicate)(req) {
            self.action.apply(req)
        } else {
            Ok(Flow::Continue)
        }
    }
}

/// Conditional gate over a fallible predicate. See [`ActionExt::filter_request`].
pub struct FilterRequest<A, P> {
    action: A,
    predicate: P,
}

impl<A, P> Action for FilterRequest<A, P>
where
    A: Action,
    P: RequestPredicate,
{
    fn apply(&self, req: &mut Request) -> Result<Flow, WeftError> {
        if self.predicate.test(req)? {
            self.action.apply(req)
        } else {
            Ok(Flow::Continue)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::Method;

    use super::*;
    use crate::RequestHead;

    fn make_request() -> Request {
        Request::new(RequestHead::new(Method::GET, "/test"))
    }

    fn counting(counter: &'static AtomicUsize, flow: Flow) -> impl Action {
        move |_: &mut Request| -> Result<Flow, WeftError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(flow)
        }
    }

    // === and_then Tests ===

    #[test]
    fn test_and_then_runs_both_on_continue() {
        static A: AtomicUsize = AtomicUsize::new(0);
        static B: AtomicUsize = AtomicUsize::new(0);

        let chain = counting(&A, Flow::Continue).and_then(counting(&B, Flow::Continue));
        let flow = chain.apply(&mut make_request()).unwrap();

        assert_eq!(flow, Flow::Continue);
        assert_eq!(A.load(Ordering::SeqCst), 1);
        assert_eq!(B.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_and_then_short_circuits_on_halt() {
        static A: AtomicUsize = AtomicUsize::new(0);
        static B: AtomicUsize = AtomicUsize::new(0);

        let chain = counting(&A, Flow::Halt).and_then(counting(&B, Flow::Continue));
        let flow = chain.apply(&mut make_request()).unwrap();

        assert_eq!(flow, Flow::Halt);
        assert_eq!(A.load(Ordering::SeqCst), 1);
        assert_eq!(B.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_and_then_aborts_on_error() {
        static B: AtomicUsize = AtomicUsize::new(0);

        let failing = |_: &mut Request| -> Result<Flow, WeftError> {
            Err(WeftError::action("boom"))
        };
        let chain = failing.and_then(counting(&B, Flow::Continue));

        assert!(chain.apply(&mut make_request()).is_err());
        assert_eq!(B.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_compose_runs_before_first() {
        static FIRST: AtomicUsize = AtomicUsize::new(0);

        let probe = |_: &mut Request| -> Result<Flow, WeftError> {
            // `before` must already have run by the time `self` does
            assert_eq!(FIRST.load(Ordering::SeqCst), 1);
            Ok(Flow::Continue)
        };
        let chain = probe.compose(counting(&FIRST, Flow::Continue));

        chain.apply(&mut make_request()).unwrap();
    }

    // === filter Tests ===

    #[test]
    fn test_filter_false_is_noop() {
        static A: AtomicUsize = AtomicUsize::new(0);

        let chain = counting(&A, Flow::Halt).filter(|_| false);
        let flow = chain.apply(&mut make_request()).unwrap();

        assert_eq!(flow, Flow::Continue);
        assert_eq!(A.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_filter_true_runs_action() {
        static A: AtomicUsize = AtomicUsize::new(0);

        let chain = counting(&A, Flow::Halt).filter(|_| true);
        let flow = chain.apply(&mut make_request()).unwrap();

        assert_eq!(flow, Flow::Halt);
        assert_eq!(A.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_filter_request_error_propagates() {
        static A: AtomicUsize = AtomicUsize::new(0);

        let failing = |_: &mut Request| -> Result<bool, WeftError> {
            Err(WeftError::action("predicate failed"))
        };
        let chain = counting(&A, Flow::Continue).filter_request(failing);

        assert!(chain.apply(&mut make_request()).is_err());
        assert_eq!(A.load(Ordering::SeqCst), 0);
    }

    // === Flow Tests ===

    #[test]
    fn test_flow_of_open_response() {
        let req = make_request();
        assert_eq!(Flow::of(&req), Flow::Continue);
    }

    #[test]
    fn test_flow_of_terminal_response() {
        let mut req = make_request();
        req.response_mut().set_status(http::StatusCode::NOT_FOUND);
        assert_eq!(Flow::of(&req), Flow::Halt);
    }
}
