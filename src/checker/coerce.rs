//! Coercion chains between compatible types.
//!
//! The checker may insert a dereference (L-value to value), a widening
//! (subrange to its base, free) and a narrowing (base into a subrange,
//! bounds-checked at runtime); nothing else converts implicitly. Error
//! types absorb: coercing from or to the error type silently succeeds.

use crate::ast::{ExpKind, ExpNode};
use crate::types::Type;

use super::{typed, StaticChecker, TypeInfo};

impl StaticChecker<'_> {
    /// Insert the minimal chain of nodes giving `exp` the type `target`.
    /// A failure is reported as incompatible types and hands the expression
    /// back unchanged.
    pub(crate) fn coerce_exp(
        &mut self,
        target: &Type,
        exp: ExpNode<TypeInfo>,
    ) -> ExpNode<TypeInfo> {
        match self.try_coerce(target, exp, true) {
            Ok(exp) => exp,
            Err(exp) => {
                self.errors.error(
                    format!("cannot coerce {} to {target}", exp.ty()),
                    exp.location,
                );
                exp
            }
        }
    }

    /// Like `coerce_exp` but never inserts a runtime-checked narrowing and
    /// never reports; used to probe the members of an intersection type.
    pub(crate) fn coerce_to_type(
        &self,
        target: &Type,
        exp: ExpNode<TypeInfo>,
    ) -> Result<ExpNode<TypeInfo>, ExpNode<TypeInfo>> {
        self.try_coerce(target, exp, false)
    }

    fn try_coerce(
        &self,
        target: &Type,
        exp: ExpNode<TypeInfo>,
        allow_narrow: bool,
    ) -> Result<ExpNode<TypeInfo>, ExpNode<TypeInfo>> {
        if matches!(target, Type::Error) || matches!(exp.ty(), Type::Error) {
            return Ok(exp);
        }
        if exp.ty() == target {
            return Ok(exp);
        }
        // argument lists coerce element-wise against a product type
        if let (Type::Product(expected), ExpKind::Arguments(_)) = (target, &exp.kind) {
            return self.coerce_arguments(expected, exp, allow_narrow);
        }

        let original = exp.clone();
        let mut exp = exp;
        if let Type::Reference(referenced) = exp.ty().clone() {
            let location = exp.location;
            exp = typed(location, *referenced, ExpKind::Dereference(Box::new(exp)));
            if exp.ty() == target {
                return Ok(exp);
            }
        }
        if let Type::Subrange { base, .. } = exp.ty().clone() {
            let location = exp.location;
            exp = typed(location, *base, ExpKind::WidenSubrange(Box::new(exp)));
            if exp.ty() == target {
                return Ok(exp);
            }
        }
        if allow_narrow {
            if let Type::Subrange { base, .. } = target {
                if exp.ty() == base.as_ref() {
                    let location = exp.location;
                    return Ok(typed(
                        location,
                        target.clone(),
                        ExpKind::NarrowSubrange(Box::new(exp)),
                    ));
                }
            }
        }
        Err(original)
    }

    fn coerce_arguments(
        &self,
        expected: &[Type],
        exp: ExpNode<TypeInfo>,
        allow_narrow: bool,
    ) -> Result<ExpNode<TypeInfo>, ExpNode<TypeInfo>> {
        let ExpNode {
            location,
            kind: ExpKind::Arguments(args),
            ..
        } = exp.clone()
        else {
            return Err(exp);
        };
        if expected.len() != args.len() {
            return Err(exp);
        }
        let mut coerced = Vec::with_capacity(args.len());
        for (arg, target) in args.into_iter().zip(expected) {
            match self.try_coerce(target, arg, allow_narrow) {
                Ok(arg) => coerced.push(arg),
                Err(_) => return Err(exp),
            }
        }
        let ty = Type::Product(coerced.iter().map(|arg| arg.ty().clone()).collect());
        Ok(typed(location, ty, ExpKind::Arguments(coerced)))
    }
}
