//! Implementation of the `first` builtin.

use super::{must_be_array, wrong_arity, Builtin};
use crate::value::Value;

/// Returns the first element of an array, or `null` when it is empty.
pub fn call(args: &[Value]) -> Value {
    let [arg] = args else {
        return wrong_arity(args.len(), 1);
    };
    match arg {
        Value::Array(elements) => elements.first().cloned().unwrap_or(Value::Null),
        other => must_be_array(Builtin::First, other),
    }
}
