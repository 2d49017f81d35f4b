//! Implementation of the `last` builtin.

use super::{must_be_array, wrong_arity, Builtin};
use crate::value::Value;

/// Returns the last element of an array, or `null` when it is empty.
pub fn call(args: &[Value]) -> Value {
    let [arg] = args else {
        return wrong_arity(args.len(), 1);
    };
    match arg {
        Value::Array(elements) => elements.last().cloned().unwrap_or(Value::Null),
        other => must_be_array(Builtin::Last, other),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_last() {
        let array = Value::Array(Rc::new(vec![Value::Integer(1), Value::Integer(2)]));
        assert_eq!(call(&[array]), Value::Integer(2));
        assert_eq!(call(&[Value::Array(Rc::new(vec![]))]), Value::Null);
    }
}
