//! Implementation of the `len` builtin.

use super::wrong_arity;
use crate::value::Value;

/// Returns the length of a string (in bytes; identifiers and literals are
/// ASCII) or the number of elements of an array.
pub fn call(args: &[Value]) -> Value {
    let [arg] = args else {
        return wrong_arity(args.len(), 1);
    };
    match arg {
        Value::Str(text) => Value::Integer(text.len() as i64),
        Value::Array(elements) => Value::Integer(elements.len() as i64),
        other => Value::Error(format!(
            "argument to 'len' not supported, got {}",
            other.type_name()
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_len() {
        assert_eq!(call(&[Value::Str(Rc::from("four"))]), Value::Integer(4));
        assert_eq!(call(&[Value::Str(Rc::from(""))]), Value::Integer(0));
        assert_eq!(call(&[Value::Array(Rc::new(vec![]))]), Value::Integer(0));
        assert_eq!(
            call(&[Value::Integer(1)]),
            Value::Error("argument to 'len' not supported, got INTEGER".to_string())
        );
        assert_eq!(
            call(&[Value::Integer(1), Value::Integer(2)]),
            Value::Error("wrong number of arguments. got=2, want=1".to_string())
        );
    }
}
