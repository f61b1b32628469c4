// analyzer/layout.rs
//
// Shadow representations: the `{tag, data}` struct behind a sum type and
// the `{data, length, capacity}` struct behind a dynamic array. Shared by
// type analysis and metadata deserialisation.

use glint_frontend::{
    EvalValue, ExprKind, Member, Module, SemaState, StructType, TypeId, TypeKind,
};

/// Lay out `members` in order: align each to its own alignment, total size
/// rounded up to the struct's alignment. An empty struct has size 0.
pub(crate) fn compute_struct_layout(
    module: &Module,
    members: &mut [Member],
) -> (usize, usize) {
    let mut byte_size = 0usize;
    let mut alignment = 1usize;
    for member in members.iter_mut() {
        let msize = module.size_of(member.ty);
        let malign = module.align_of(member.ty).max(1);
        member.byte_offset = glint_frontend::module::align_to(byte_size, malign);
        byte_size = member.byte_offset + msize;
        alignment = alignment.max(malign);
    }
    let byte_size = if byte_size == 0 {
        0
    } else {
        glint_frontend::module::align_to(byte_size, alignment)
    };
    (byte_size, alignment)
}

/// Materialise the `{tag, data}` struct of a sum type. The tag is an enum
/// of the member names valued 0..N-1; the data is a union of the member
/// types.
pub(crate) fn build_sum_shadow(module: &mut Module, sum: TypeId) -> TypeId {
    let TypeKind::Sum { members, .. } = module.types.get(sum).kind.clone() else {
        unreachable!("build_sum_shadow on a non-sum type");
    };
    let span = module.types.get(sum).span;

    // The tag enum.
    let scope = module.new_scope(Some(module.global_scope));
    let tag_enum = module.types.alloc(
        TypeKind::Enum {
            underlying: TypeId::INT,
            enumerators: Vec::new(),
            scope,
        },
        span,
    );
    let mut enumerators = Vec::with_capacity(members.len());
    for (index, member) in members.iter().enumerate() {
        let init = module.alloc_expr(
            ExprKind::Constant {
                operand: None,
                value: EvalValue::Int(index as i64),
            },
            tag_enum,
            member.span,
        );
        module.expr_mut(init).state = SemaState::Done;
        let decl = module.alloc_expr(
            ExprKind::EnumeratorDecl {
                name: member.name,
                init: Some(init),
            },
            tag_enum,
            member.span,
        );
        module.expr_mut(decl).state = SemaState::Done;
        let _ = module.declare(scope, member.name, decl);
        enumerators.push(decl);
    }
    if let TypeKind::Enum { enumerators: e, .. } = &mut module.types.get_mut(tag_enum).kind {
        *e = enumerators;
    }
    module.types.get_mut(tag_enum).state = SemaState::Done;

    // The data union.
    let mut union_size = 0usize;
    let mut union_align = 1usize;
    for member in &members {
        union_size = union_size.max(module.size_of(member.ty));
        union_align = union_align.max(module.align_of(member.ty));
    }
    let data_union = module.types.alloc(
        TypeKind::Union {
            members: members.clone(),
            byte_size: union_size,
            alignment: union_align,
        },
        span,
    );
    module.types.get_mut(data_union).state = SemaState::Done;

    let tag_name = module.interner.intern("tag");
    let data_name = module.interner.intern("data");
    let mut struct_members = vec![
        Member {
            name: tag_name,
            ty: tag_enum,
            byte_offset: 0,
            span,
        },
        Member {
            name: data_name,
            ty: data_union,
            byte_offset: 0,
            span,
        },
    ];
    let (byte_size, alignment) = compute_struct_layout(module, &mut struct_members);
    let shadow = module.types.alloc(
        TypeKind::Struct(StructType {
            members: struct_members,
            byte_size,
            alignment,
        }),
        span,
    );
    module.types.get_mut(shadow).state = SemaState::Done;
    shadow
}

/// Materialise the `{data, length, capacity}` struct of a dynamic array.
pub(crate) fn build_dynamic_array_shadow(module: &mut Module, dynarray: TypeId) -> TypeId {
    let TypeKind::DynamicArray { elem, .. } = module.types.get(dynarray).kind else {
        unreachable!("build_dynamic_array_shadow on a non-dynamic-array type");
    };
    let span = module.types.get(dynarray).span;

    let data_ptr = module.types.alloc(TypeKind::Pointer { elem }, span);
    module.types.get_mut(data_ptr).state = SemaState::Done;

    let data_name = module.interner.intern("data");
    let length_name = module.interner.intern("length");
    let capacity_name = module.interner.intern("capacity");
    let mut members = vec![
        Member {
            name: data_name,
            ty: data_ptr,
            byte_offset: 0,
            span,
        },
        Member {
            name: length_name,
            ty: TypeId::INT,
            byte_offset: 0,
            span,
        },
        Member {
            name: capacity_name,
            ty: TypeId::INT,
            byte_offset: 0,
            span,
        },
    ];
    let (byte_size, alignment) = compute_struct_layout(module, &mut members);
    let shadow = module.types.alloc(
        TypeKind::Struct(StructType {
            members,
            byte_size,
            alignment,
        }),
        span,
    );
    module.types.get_mut(shadow).state = SemaState::Done;
    shadow
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_frontend::Span;

    fn sum_of_int_and_byte(module: &mut Module) -> TypeId {
        let a = module.interner.intern("a");
        let b = module.interner.intern("b");
        module.types.alloc(
            TypeKind::Sum {
                members: vec![
                    Member {
                        name: a,
                        ty: TypeId::INT,
                        byte_offset: 0,
                        span: Span::default(),
                    },
                    Member {
                        name: b,
                        ty: TypeId::BYTE,
                        byte_offset: 0,
                        span: Span::default(),
                    },
                ],
                byte_size: 8,
                alignment: 8,
                shadow: None,
            },
            Span::default(),
        )
    }

    #[test]
    fn sum_shadow_is_tag_then_data() {
        let mut module = Module::new("test");
        let sum = sum_of_int_and_byte(&mut module);
        let shadow = build_sum_shadow(&mut module, sum);

        let TypeKind::Struct(s) = &module.types.get(shadow).kind else {
            panic!("shadow must be a struct");
        };
        assert_eq!(s.members.len(), 2);
        assert_eq!(module.interner.resolve(s.members[0].name), "tag");
        assert_eq!(module.interner.resolve(s.members[1].name), "data");

        let TypeKind::Enum { enumerators, .. } = &module.types.get(s.members[0].ty).kind
        else {
            panic!("tag must be an enum");
        };
        let names: Vec<&str> = enumerators
            .iter()
            .map(|&e| {
                let ExprKind::EnumeratorDecl { name, .. } = module.expr(e).kind else {
                    panic!("enumerator decl");
                };
                module.interner.resolve(name)
            })
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn dynamic_array_shadow_layout() {
        let mut module = Module::new("test");
        let dynarray = module.types.alloc(
            TypeKind::DynamicArray {
                elem: TypeId::INT,
                initial_size: None,
                shadow: None,
            },
            Span::default(),
        );
        let shadow = build_dynamic_array_shadow(&mut module, dynarray);
        let TypeKind::Struct(s) = &module.types.get(shadow).kind else {
            panic!("shadow must be a struct");
        };
        let names: Vec<&str> = s
            .members
            .iter()
            .map(|m| module.interner.resolve(m.name))
            .collect();
        assert_eq!(names, ["data", "length", "capacity"]);
        assert_eq!(s.members[1].byte_offset, 8);
        assert_eq!(s.members[2].byte_offset, 16);
        assert_eq!(s.byte_size, 24);
        assert_eq!(s.alignment, 8);
    }

    #[test]
    fn struct_layout_pads_and_aligns() {
        let mut module = Module::new("test");
        let a = module.interner.intern("a");
        let b = module.interner.intern("b");
        let mut members = vec![
            Member {
                name: a,
                ty: TypeId::BYTE,
                byte_offset: 0,
                span: Span::default(),
            },
            Member {
                name: b,
                ty: TypeId::INT,
                byte_offset: 0,
                span: Span::default(),
            },
        ];
        let (size, align) = compute_struct_layout(&module, &mut members);
        assert_eq!(members[0].byte_offset, 0);
        assert_eq!(members[1].byte_offset, 8);
        assert_eq!(size, 16);
        assert_eq!(align, 8);
    }

    #[test]
    fn empty_struct_has_size_zero() {
        let module = Module::new("test");
        let mut members = Vec::new();
        let (size, align) = compute_struct_layout(&module, &mut members);
        assert_eq!(size, 0);
        assert_eq!(align, 1);
    }
}
