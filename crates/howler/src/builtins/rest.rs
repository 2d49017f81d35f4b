//! Implementation of the `rest` builtin.

use std::rc::Rc;

use super::{must_be_array, wrong_arity, Builtin};
use crate::value::Value;

/// Returns a fresh array holding everything but the first element, or `null`
/// for an empty array.
pub fn call(args: &[Value]) -> Value {
    let [arg] = args else {
        return wrong_arity(args.len(), 1);
    };
    match arg {
        Value::Array(elements) if !elements.is_empty() => {
            Value::Array(Rc::new(elements[1..].to_vec()))
        }
        Value::Array(_) => Value::Null,
        other => must_be_array(Builtin::Rest, other),
    }
}
