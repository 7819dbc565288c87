//! Request predicates used by the filter combinators.

use crate::{Request, Value, WeftError};

/// A test against the request that may itself fail.
///
/// Predicates gate actions through
/// [`ActionExt::filter_request`](crate::ActionExt::filter_request) and the
/// builder's handler- and chain-level filters. A predicate that can never
/// fail is usually better written as the pure `Fn(&Request) -> bool` form
/// accepted by [`ActionExt::filter`](crate::ActionExt::filter).
///
/// An example use is authentication: Basic or Digest auth checks need the
/// decoded request and may hit I/O, so they live here.
pub trait RequestPredicate: Send + Sync {
    /// Test the request; `Err` aborts the chain like an action error.
    fn test(&self, req: &mut Request) -> Result<bool, WeftError>;
}

impl<F> RequestPredicate for F
where
    F: Fn(&mut Request) -> Result<bool, WeftError> + Send + Sync,
{
    fn test(&self, req: &mut Request) -> Result<bool, WeftError> {
        self(req)
    }
}

impl RequestPredicate for Box<dyn RequestPredicate> {
    fn test(&self, req: &mut Request) -> Result<bool, WeftError> {
        (**self).test(req)
    }
}

/// Logical combinators available on every predicate.
pub trait RequestPredicateExt: RequestPredicate + Sized {
    /// Passes only when both predicates pass. Short-circuits on false.
    fn and<O: RequestPredicate>(self, other: O) -> And<Self, O> {
        And { a: self, b: other }
    }

    /// Passes when either predicate passes. Short-circuits on true.
    fn or<O: RequestPredicate>(self, other: O) -> Or<Self, O> {
        Or { a: self, b: other }
    }

    /// Inverts the result; errors still propagate.
    fn negate(self) -> Not<Self> {
        Not { inner: self }
    }
}

impl<P: RequestPredicate> RequestPredicateExt for P {}

/// Conjunction of two predicates. See [`RequestPredicateExt::and`].
pub struct And<A, B> {
    a: A,
    b: B,
}

impl<A: RequestPredicate, B: RequestPredicate> RequestPredicate for And<A, B> {
    fn test(&self, req: &mut Request) -> Result<bool, WeftError> {
        Ok(self.a.test(req)? && self.b.test(req)?)
    }
}

/// Disjunction of two predicates. See [`RequestPredicateExt::or`].
pub struct Or<A, B> {
    a: A,
    b: B,
}

impl<A: RequestPredicate, B: RequestPredicate> RequestPredicate for Or<A, B> {
    fn test(&self, req: &mut Request) -> Result<bool, WeftError> {
        Ok(self.a.test(req)? || self.b.test(req)?)
    }
}

/// Negation of a predicate. See [`RequestPredicateExt::negate`].
pub struct Not<P> {
    inner: P,
}

impl<P: RequestPredicate> RequestPredicate for Not<P> {
    fn test(&self, req: &mut Request) -> Result<bool, WeftError> {
        Ok(!self.inner.test(req)?)
    }
}

/// Passes when the named attribute is set to any value.
pub fn attribute_present(name: impl Into<String>) -> AttributePresent {
    AttributePresent { name: name.into() }
}

/// Predicate type returned by [`attribute_present`].
pub struct AttributePresent {
    name: String,
}

impl RequestPredicate for AttributePresent {
    fn test(&self, req: &mut Request) -> Result<bool, WeftError> {
        Ok(req.attr_present(&self.name))
    }
}

/// Passes when the named attribute is boolean `true` or the string `"true"`.
///
/// A missing attribute, or any other stored value, tests false.
pub fn attribute_true(name: impl Into<String>) -> AttributeTrue {
    AttributeTrue { name: name.into() }
}

/// Predicate type returned by [`attribute_true`].
pub struct AttributeTrue {
    name: String,
}

impl RequestPredicate for AttributeTrue {
    fn test(&self, req: &mut Request) -> Result<bool, WeftError> {
        Ok(match req.attr(&self.name) {
            Some(Value::Bool(v)) => *v,
            Some(Value::Str(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use http::Method;

    use super::*;
    use crate::RequestHead;

    fn make_request() -> Request {
        Request::new(RequestHead::new(Method::GET, "/"))
    }

    fn always(result: bool) -> impl RequestPredicate {
        move |_: &mut Request| -> Result<bool, WeftError> { Ok(result) }
    }

    #[test]
    fn test_and_both_true() {
        let mut req = make_request();
        assert!(always(true).and(always(true)).test(&mut req).unwrap());
        assert!(!always(true).and(always(false)).test(&mut req).unwrap());
        assert!(!always(false).and(always(true)).test(&mut req).unwrap());
    }

    #[test]
    fn test_or_either_true() {
        let mut req = make_request();
        assert!(always(false).or(always(true)).test(&mut req).unwrap());
        assert!(!always(false).or(always(false)).test(&mut req).unwrap());
    }

    #[test]
    fn test_negate() {
        let mut req = make_request();
        assert!(always(false).negate().test(&mut req).unwrap());
        assert!(!always(true).negate().test(&mut req).unwrap());
    }

    #[test]
    fn test_attribute_present() {
        let mut req = make_request();
        assert!(!attribute_present("flag").test(&mut req).unwrap());

        req.set_attr("flag", 1i64);
        assert!(attribute_present("flag").test(&mut req).unwrap());
    }

    #[test]
    fn test_attribute_true_coercion() {
        let mut req = make_request();
        assert!(!attribute_true("flag").test(&mut req).unwrap());

        req.set_attr("flag", true);
        assert!(attribute_true("flag").test(&mut req).unwrap());

        req.set_attr("flag", "TRUE");
        assert!(attribute_true("flag").test(&mut req).unwrap());

        req.set_attr("flag", "yes");
        assert!(!attribute_true("flag").test(&mut req).unwrap());

        req.set_attr("flag", 1i64);
        assert!(!attribute_true("flag").test(&mut req).unwrap());
    }
}
