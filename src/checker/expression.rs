//! Expression transforms: identifier binding, operator overload selection
//! and the record / pointer forms.

use crate::ast::{ExpKind, ExpNode, Location, Operator};
use crate::symtab::SymEntry;
use crate::types::{self, Type};

use super::{typed, StaticChecker, TypeInfo};

impl StaticChecker<'_> {
    pub(crate) fn check_expression(&mut self, exp: ExpNode<()>) -> ExpNode<TypeInfo> {
        let ExpNode { location, kind, .. } = exp;
        match kind {
            ExpKind::Error => typed(location, Type::Error, ExpKind::Error),
            ExpKind::Constant(value) => typed(location, Type::Int, ExpKind::Constant(value)),
            ExpKind::Identifier(name) => self.check_identifier(name, location),
            // already-bound variables just get their reference type back
            ExpKind::Variable(entry) => {
                let ty = match &self.symtab.entry(entry).kind {
                    SymEntry::Variable { ty, .. } => Type::reference(ty.clone()),
                    _ => Type::Error,
                };
                typed(location, ty, ExpKind::Variable(entry))
            }
            ExpKind::Read => typed(location, Type::Int, ExpKind::Read),
            ExpKind::Operator { op, arg } => self.check_operator(op, *arg, location),
            ExpKind::Arguments(args) => {
                let args: Vec<_> = args
                    .into_iter()
                    .map(|arg| self.check_expression(arg))
                    .collect();
                let ty = Type::Product(args.iter().map(|arg| arg.ty().clone()).collect());
                typed(location, ty, ExpKind::Arguments(args))
            }
            ExpKind::Dereference(inner) => {
                let inner = self.check_expression(*inner);
                let ty = match inner.ty() {
                    Type::Reference(referenced) => referenced.as_ref().clone(),
                    Type::Error => Type::Error,
                    _ => {
                        self.errors.error("variable expected", inner.location);
                        Type::Error
                    }
                };
                typed(location, ty, ExpKind::Dereference(Box::new(inner)))
            }
            // Coercion nodes are inserted by the checker itself; meeting one
            // again is a no-op apart from re-deriving its type.
            ExpKind::NarrowSubrange(inner) => {
                let inner = self.check_expression(*inner);
                let ty = inner.ty().clone();
                typed(location, ty, ExpKind::NarrowSubrange(Box::new(inner)))
            }
            ExpKind::WidenSubrange(inner) => {
                let inner = self.check_expression(*inner);
                let ty = match inner.ty() {
                    Type::Subrange { base, .. } => base.as_ref().clone(),
                    other => other.clone(),
                };
                typed(location, ty, ExpKind::WidenSubrange(Box::new(inner)))
            }
            ExpKind::FieldAccess { record, field } => {
                self.check_field_access(*record, field, location)
            }
            ExpKind::PointerDereference(inner) => self.check_pointer_dereference(*inner, location),
            ExpKind::New(type_name) => self.check_new(type_name, location),
            ExpKind::RecordConstructor { type_name, fields } => {
                self.check_record_constructor(type_name, fields, location)
            }
        }
    }

    fn check_identifier(&mut self, name: String, location: Location) -> ExpNode<TypeInfo> {
        let entry = self
            .symtab
            .lookup(&name)
            .map(|entry| (entry, self.symtab.entry(entry).kind.clone()));
        match entry {
            Some((_, SymEntry::Constant { ty, value })) => {
                typed(location, ty, ExpKind::Constant(value))
            }
            // The variable keeps its L-value-ness: its type is a reference
            // to the declared type, for downstream coercion to unwrap.
            Some((entry, SymEntry::Variable { ty, .. })) => {
                typed(location, Type::reference(ty), ExpKind::Variable(entry))
            }
            Some(_) => {
                self.errors.error(
                    format!("constant or variable identifier required: {name}"),
                    location,
                );
                typed(location, Type::Error, ExpKind::Error)
            }
            None => {
                self.errors
                    .error(format!("undefined identifier {name}"), location);
                typed(location, Type::Error, ExpKind::Error)
            }
        }
    }

    fn check_operator(
        &mut self,
        op: Operator,
        arg: ExpNode<()>,
        location: Location,
    ) -> ExpNode<TypeInfo> {
        let arg = self.check_expression(arg);
        let Some(entry) = self.symtab.lookup_operator(op.name()) else {
            unreachable!("operator {op} missing from the operator namespace");
        };
        let SymEntry::Operator { ty } = self.symtab.entry(entry).kind.clone() else {
            unreachable!("operator namespace holds a non-operator entry for {op}");
        };
        let (arg, ty) = match ty {
            Type::Function { arg: expected, result } => {
                match self.try_coerce_operand(&expected, arg) {
                    Ok(arg) => (arg, *result),
                    Err(arg) => {
                        self.errors.error(
                            format!("type of argument {} does not match {expected}", arg.ty()),
                            location,
                        );
                        (arg, Type::Error)
                    }
                }
            }
            Type::Intersection(members) => self.select_overload(members, arg, location),
            _ => unreachable!("operator {op} carries a non-function type"),
        };
        typed(
            location,
            ty,
            ExpKind::Operator {
                op,
                arg: Box::new(arg),
            },
        )
    }

    fn try_coerce_operand(
        &mut self,
        expected: &Type,
        arg: ExpNode<TypeInfo>,
    ) -> Result<ExpNode<TypeInfo>, ExpNode<TypeInfo>> {
        // operands only ever widen; narrowing into an operator never occurs
        self.coerce_to_type(expected, arg)
    }

    /// The first member (in declaration order) whose argument type accepts
    /// the argument wins; its result type becomes the operator's type.
    fn select_overload(
        &mut self,
        members: Vec<Type>,
        arg: ExpNode<TypeInfo>,
        location: Location,
    ) -> (ExpNode<TypeInfo>, Type) {
        for member in &members {
            let Type::Function { arg: expected, result } = member else {
                continue;
            };
            if let Ok(arg) = self.coerce_to_type(expected, arg.clone()) {
                return (arg, result.as_ref().clone());
            }
        }
        self.errors.error(
            format!(
                "type of argument {} does not match {}",
                arg.ty(),
                Type::Intersection(members)
            ),
            location,
        );
        (arg, Type::Error)
    }

    fn check_field_access(
        &mut self,
        record: ExpNode<()>,
        field: String,
        location: Location,
    ) -> ExpNode<TypeInfo> {
        let record = self.check_expression(record);
        let scope = self.symtab.current_scope();
        let ty = match self.symtab.record_fields(scope, record.ty()) {
            Some(fields) => match types::field_offset(&fields, &field) {
                // the access itself stays an L-value
                Some((_, field_ty)) => Type::reference(field_ty),
                None => {
                    self.errors.error(
                        format!("{} has no field {field}", Type::Record(fields)),
                        location,
                    );
                    Type::Error
                }
            },
            None => {
                if !matches!(record.ty(), Type::Error) {
                    self.errors.error("record type required", record.location);
                }
                Type::Error
            }
        };
        typed(
            location,
            ty,
            ExpKind::FieldAccess {
                record: Box::new(record),
                field,
            },
        )
    }

    fn check_pointer_dereference(
        &mut self,
        inner: ExpNode<()>,
        location: Location,
    ) -> ExpNode<TypeInfo> {
        let inner = self.check_expression(inner);
        let scope = self.symtab.current_scope();
        match self.symtab.pointer_target(scope, inner.ty()) {
            Some(target) => {
                // the pointer value itself is needed; load it out of the
                // L-value holding it
                let inner = match inner.ty().clone() {
                    Type::Reference(pointer) => {
                        let inner_location = inner.location;
                        typed(inner_location, *pointer, ExpKind::Dereference(Box::new(inner)))
                    }
                    _ => inner,
                };
                typed(
                    location,
                    Type::reference(target),
                    ExpKind::PointerDereference(Box::new(inner)),
                )
            }
            None => {
                if !matches!(inner.ty(), Type::Error) {
                    self.errors.error("pointer type required", inner.location);
                }
                typed(
                    location,
                    Type::Error,
                    ExpKind::PointerDereference(Box::new(inner)),
                )
            }
        }
    }

    fn check_new(&mut self, type_name: String, location: Location) -> ExpNode<TypeInfo> {
        let entry = self
            .symtab
            .lookup(&type_name)
            .map(|entry| self.symtab.entry(entry).kind.clone());
        let ty = match entry {
            Some(SymEntry::TypeAlias { ty }) => match self.symtab.resolve(&ty) {
                pointer @ Type::Pointer(_) => pointer,
                Type::Error => Type::Error,
                _ => {
                    self.errors.error(
                        format!("pointer type required for new: {type_name}"),
                        location,
                    );
                    Type::Error
                }
            },
            Some(_) => {
                self.errors
                    .error(format!("type identifier required: {type_name}"), location);
                Type::Error
            }
            None => {
                self.errors
                    .error(format!("undefined identifier {type_name}"), location);
                Type::Error
            }
        };
        typed(location, ty, ExpKind::New(type_name))
    }

    fn check_record_constructor(
        &mut self,
        type_name: String,
        fields: Vec<ExpNode<()>>,
        location: Location,
    ) -> ExpNode<TypeInfo> {
        let fields: Vec<_> = fields
            .into_iter()
            .map(|field| self.check_expression(field))
            .collect();
        let entry = self
            .symtab
            .lookup(&type_name)
            .map(|entry| self.symtab.entry(entry).kind.clone());
        let declared = match entry {
            Some(SymEntry::TypeAlias { ty }) => match self.symtab.resolve(&ty) {
                Type::Record(declared) => Some(declared),
                Type::Error => None,
                _ => {
                    self.errors
                        .error(format!("record type required: {type_name}"), location);
                    None
                }
            },
            Some(_) => {
                self.errors
                    .error(format!("type identifier required: {type_name}"), location);
                None
            }
            None => {
                self.errors
                    .error(format!("undefined identifier {type_name}"), location);
                None
            }
        };
        let Some(declared) = declared else {
            return typed(
                location,
                Type::Error,
                ExpKind::RecordConstructor { type_name, fields },
            );
        };
        if declared.len() != fields.len() {
            self.errors.error(
                format!(
                    "record constructor has {} expressions but {} fields",
                    fields.len(),
                    declared.len()
                ),
                location,
            );
            return typed(
                location,
                Type::Error,
                ExpKind::RecordConstructor { type_name, fields },
            );
        }
        // expressions match fields by position
        let fields = fields
            .into_iter()
            .zip(declared.iter())
            .map(|(exp, (_, field_ty))| self.coerce_exp(field_ty, exp))
            .collect();
        typed(
            location,
            Type::Record(declared),
            ExpKind::RecordConstructor { type_name, fields },
        )
    }
}
