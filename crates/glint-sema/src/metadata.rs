// metadata.rs
//
// The `.gmeta` blob: a one-byte version, three magic bytes, then a flat
// type table and the module's exported declarations. Deserialisation is the
// exact inverse and lands the declarations in the importing module's global
// scope.

use rustc_hash::FxHashMap;
use thiserror::Error;

use glint_frontend::{
    BuiltinType, EvalValue, ExprKind, FfiType, FuncAttrs, Linkage, Member, Module, Param,
    SemaState, Span, StructType, TypeId, TypeKind,
};

use crate::analyzer::layout;

pub const METADATA_FILE_EXTENSION: &str = ".gmeta";
pub const METADATA_SECTION_NAME: &str = ".glint_metadata";

pub struct ModuleDescription;

impl ModuleDescription {
    pub const DEFAULT_VERSION: u8 = 1;
    pub const MAGIC_BYTE0: u8 = 0xC0;
    pub const MAGIC_BYTE1: u8 = 0xFF;
    pub const MAGIC_BYTE2: u8 = 0xEE;

    pub fn has_valid_magic(blob: &[u8]) -> bool {
        blob.len() >= 4
            && blob[0] == Self::DEFAULT_VERSION
            && blob[1] == Self::MAGIC_BYTE0
            && blob[2] == Self::MAGIC_BYTE1
            && blob[3] == Self::MAGIC_BYTE2
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MetadataError {
    #[error("unexpected end of metadata")]
    UnexpectedEof,
    #[error("invalid magic bytes")]
    BadMagic,
    #[error("unknown tag {0}")]
    BadTag(u8),
    #[error("invalid string encoding")]
    BadString,
    #[error("unresolved type cannot be serialised")]
    UnresolvedType,
    #[error("index {0} out of range")]
    BadIndex(u32),
}

mod tag {
    pub const BUILTIN: u8 = 0;
    pub const FFI: u8 = 1;
    pub const INTEGER: u8 = 2;
    pub const POINTER: u8 = 3;
    pub const REFERENCE: u8 = 4;
    pub const ARRAY: u8 = 5;
    pub const DYNAMIC_ARRAY: u8 = 6;
    pub const STRUCT: u8 = 7;
    pub const UNION: u8 = 8;
    pub const SUM: u8 = 9;
    pub const ENUM: u8 = 10;
    pub const FUNCTION: u8 = 11;
}

mod decl_kind {
    pub const VAR: u8 = 0;
    pub const FUNC: u8 = 1;
    pub const TYPE: u8 = 2;
    pub const TYPE_ALIAS: u8 = 3;
}

// ---------------------------------------------------------------------------
// Serialisation
// ---------------------------------------------------------------------------

/// Serialise the module's exported surface (everything in the global scope
/// that was not itself imported).
pub fn serialise(module: &Module) -> Result<Vec<u8>, MetadataError> {
    let mut encoder = Encoder {
        module,
        memo: FxHashMap::default(),
        entries: Vec::new(),
    };

    let mut decls = Vec::new();
    let global = module.global_scope;
    for (name, list) in module.scope(global).symbols_in_order() {
        for &decl in list.iter() {
            let expr = module.expr(decl);
            let kind = match &expr.kind {
                ExprKind::VarDecl { linkage, .. } if *linkage != Linkage::Imported => {
                    decl_kind::VAR
                }
                ExprKind::FuncDecl { linkage, .. } if *linkage != Linkage::Imported => {
                    decl_kind::FUNC
                }
                ExprKind::TypeDecl { .. } => decl_kind::TYPE,
                ExprKind::TypeAliasDecl { .. } => decl_kind::TYPE_ALIAS,
                _ => continue,
            };
            let ty = encoder.type_index(expr.ty)?;
            decls.push((kind, module.interner.resolve(name).to_string(), ty));
        }
    }

    let mut out = vec![
        ModuleDescription::DEFAULT_VERSION,
        ModuleDescription::MAGIC_BYTE0,
        ModuleDescription::MAGIC_BYTE1,
        ModuleDescription::MAGIC_BYTE2,
    ];
    put_u32(&mut out, encoder.entries.len() as u32);
    for entry in &encoder.entries {
        out.extend_from_slice(entry.as_ref().expect("entry encoded"));
    }
    put_u32(&mut out, decls.len() as u32);
    for (kind, name, ty) in decls {
        out.push(kind);
        put_str(&mut out, &name);
        put_u32(&mut out, ty);
    }
    Ok(out)
}

struct Encoder<'m> {
    module: &'m Module,
    memo: FxHashMap<TypeId, u32>,
    entries: Vec<Option<Vec<u8>>>,
}

impl<'m> Encoder<'m> {
    /// Flat-table index for `ty`, encoding it (and its children) on first
    /// sight. Indices are assigned before recursing so cyclic type graphs
    /// terminate.
    fn type_index(&mut self, ty: TypeId) -> Result<u32, MetadataError> {
        if let Some(&index) = self.memo.get(&ty) {
            return Ok(index);
        }
        let index = self.entries.len() as u32;
        self.memo.insert(ty, index);
        self.entries.push(None);

        let mut buf = Vec::new();
        match &self.module.types.get(ty).kind.clone() {
            TypeKind::Builtin(b) => {
                buf.push(tag::BUILTIN);
                buf.push(builtin_code(*b));
            }
            TypeKind::Ffi(f) => {
                buf.push(tag::FFI);
                buf.push(ffi_code(*f));
            }
            TypeKind::Integer { signed, bits } => {
                buf.push(tag::INTEGER);
                buf.push(u8::from(*signed));
                put_u16(&mut buf, *bits);
            }
            TypeKind::Named { .. } => return Err(MetadataError::UnresolvedType),
            TypeKind::Pointer { elem } => {
                buf.push(tag::POINTER);
                let elem = self.type_index(*elem)?;
                put_u32(&mut buf, elem);
            }
            TypeKind::Reference { elem } => {
                buf.push(tag::REFERENCE);
                let elem = self.type_index(*elem)?;
                put_u32(&mut buf, elem);
            }
            TypeKind::Array { elem, .. } => {
                buf.push(tag::ARRAY);
                let elem = self.type_index(*elem)?;
                put_u32(&mut buf, elem);
                let len = self.module.array_len(ty).unwrap_or(0);
                put_u64(&mut buf, len as u64);
            }
            TypeKind::DynamicArray { elem, .. } => {
                buf.push(tag::DYNAMIC_ARRAY);
                let elem = self.type_index(*elem)?;
                put_u32(&mut buf, elem);
            }
            TypeKind::Struct(s) => {
                buf.push(tag::STRUCT);
                put_u16(&mut buf, s.members.len() as u16);
                for member in &s.members {
                    put_str(&mut buf, self.module.interner.resolve(member.name));
                    let mty = self.type_index(member.ty)?;
                    put_u32(&mut buf, mty);
                    put_u32(&mut buf, member.byte_offset as u32);
                }
                put_u32(&mut buf, s.byte_size as u32);
                put_u16(&mut buf, s.alignment as u16);
            }
            TypeKind::Union {
                members,
                byte_size,
                alignment,
            } => {
                buf.push(tag::UNION);
                self.encode_plain_members(&mut buf, members, *byte_size, *alignment)?;
            }
            TypeKind::Sum {
                members,
                byte_size,
                alignment,
                ..
            } => {
                buf.push(tag::SUM);
                self.encode_plain_members(&mut buf, members, *byte_size, *alignment)?;
            }
            TypeKind::Enum {
                underlying,
                enumerators,
                ..
            } => {
                buf.push(tag::ENUM);
                let underlying = self.type_index(*underlying)?;
                put_u32(&mut buf, underlying);
                put_u16(&mut buf, enumerators.len() as u16);
                for &enumerator in enumerators {
                    let expr = self.module.expr(enumerator);
                    let ExprKind::EnumeratorDecl { name, init } = &expr.kind else {
                        continue;
                    };
                    put_str(&mut buf, self.module.interner.resolve(*name));
                    let value = init
                        .and_then(|i| crate::eval::evaluate(self.module, i))
                        .and_then(|v| v.as_int())
                        .unwrap_or(0);
                    put_u64(&mut buf, value as u64);
                }
            }
            TypeKind::Function { ret, params, attrs } => {
                buf.push(tag::FUNCTION);
                let ret = self.type_index(*ret)?;
                put_u32(&mut buf, ret);
                put_u16(&mut buf, params.len() as u16);
                for param in params {
                    match param.name {
                        Some(name) => {
                            buf.push(1);
                            put_str(&mut buf, self.module.interner.resolve(name));
                        }
                        None => buf.push(0),
                    }
                    let pty = self.type_index(param.ty)?;
                    put_u32(&mut buf, pty);
                }
                buf.push(attr_bits(*attrs));
            }
        }

        self.entries[index as usize] = Some(buf);
        Ok(index)
    }

    fn encode_plain_members(
        &mut self,
        buf: &mut Vec<u8>,
        members: &[Member],
        byte_size: usize,
        alignment: usize,
    ) -> Result<(), MetadataError> {
        put_u16(buf, members.len() as u16);
        for member in members {
            put_str(buf, self.module.interner.resolve(member.name));
            let mty = self.type_index(member.ty)?;
            put_u32(buf, mty);
        }
        put_u32(buf, byte_size as u32);
        put_u16(buf, alignment as u16);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Deserialisation
// ---------------------------------------------------------------------------

enum RawType {
    Builtin(u8),
    Ffi(u8),
    Integer { signed: bool, bits: u16 },
    Pointer(u32),
    Reference(u32),
    Array { elem: u32, len: u64 },
    DynamicArray(u32),
    Struct {
        members: Vec<(String, u32, u32)>,
        byte_size: u32,
        alignment: u16,
    },
    Union {
        members: Vec<(String, u32)>,
        byte_size: u32,
        alignment: u16,
    },
    Sum {
        members: Vec<(String, u32)>,
        byte_size: u32,
        alignment: u16,
    },
    Enum {
        underlying: u32,
        enumerators: Vec<(String, i64)>,
    },
    Function {
        ret: u32,
        params: Vec<(Option<String>, u32)>,
        attrs: u8,
    },
}

/// Deserialise a metadata blob into this module's symbol space.
pub fn deserialise(module: &mut Module, blob: &[u8]) -> Result<(), MetadataError> {
    if !ModuleDescription::has_valid_magic(blob) {
        return Err(MetadataError::BadMagic);
    }
    let mut reader = Reader {
        blob,
        position: 4,
    };

    let type_count = reader.u32()? as usize;
    let mut raw_types = Vec::with_capacity(type_count);
    for _ in 0..type_count {
        raw_types.push(read_raw_type(&mut reader)?);
    }

    // Phase 1: allocate an id per entry; builtins map back to reserved ids.
    let mut ids = Vec::with_capacity(type_count);
    for raw in &raw_types {
        let id = match raw {
            RawType::Builtin(code) => builtin_from_code(*code)?,
            RawType::Ffi(code) => ffi_from_code(*code)?,
            _ => module.types.alloc(
                TypeKind::Builtin(BuiltinType::Unknown),
                Span::default(),
            ),
        };
        ids.push(id);
    }
    let lookup = |index: u32| -> Result<TypeId, MetadataError> {
        ids.get(index as usize)
            .copied()
            .ok_or(MetadataError::BadIndex(index))
    };

    // Phase 2: fill in the node kinds, now that every child has an id.
    for (i, raw) in raw_types.iter().enumerate() {
        let id = ids[i];
        let kind = match raw {
            RawType::Builtin(_) | RawType::Ffi(_) => continue,
            RawType::Integer { signed, bits } => TypeKind::Integer {
                signed: *signed,
                bits: *bits,
            },
            RawType::Pointer(elem) => TypeKind::Pointer { elem: lookup(*elem)? },
            RawType::Reference(elem) => TypeKind::Reference { elem: lookup(*elem)? },
            RawType::Array { elem, len } => {
                let size = module.alloc_expr(
                    ExprKind::Constant {
                        operand: None,
                        value: EvalValue::Int(*len as i64),
                    },
                    TypeId::INT,
                    Span::default(),
                );
                module.expr_mut(size).state = SemaState::Done;
                TypeKind::Array {
                    elem: lookup(*elem)?,
                    size,
                }
            }
            RawType::DynamicArray(elem) => TypeKind::DynamicArray {
                elem: lookup(*elem)?,
                initial_size: None,
                shadow: None,
            },
            RawType::Struct {
                members,
                byte_size,
                alignment,
            } => {
                let members = members
                    .iter()
                    .map(|(name, ty, offset)| {
                        Ok(Member {
                            name: module.interner.intern(name),
                            ty: lookup(*ty)?,
                            byte_offset: *offset as usize,
                            span: Span::default(),
                        })
                    })
                    .collect::<Result<Vec<_>, MetadataError>>()?;
                TypeKind::Struct(StructType {
                    members,
                    byte_size: *byte_size as usize,
                    alignment: *alignment as usize,
                })
            }
            RawType::Union {
                members,
                byte_size,
                alignment,
            } => TypeKind::Union {
                members: plain_members(module, members, &lookup)?,
                byte_size: *byte_size as usize,
                alignment: *alignment as usize,
            },
            RawType::Sum {
                members,
                byte_size,
                alignment,
            } => TypeKind::Sum {
                members: plain_members(module, members, &lookup)?,
                byte_size: *byte_size as usize,
                alignment: *alignment as usize,
                shadow: None,
            },
            RawType::Enum {
                underlying,
                enumerators,
            } => {
                let scope = module.new_scope(Some(module.global_scope));
                let mut decls = Vec::with_capacity(enumerators.len());
                for (name, value) in enumerators {
                    let name = module.interner.intern(name);
                    let init = module.alloc_expr(
                        ExprKind::Constant {
                            operand: None,
                            value: EvalValue::Int(*value),
                        },
                        id,
                        Span::default(),
                    );
                    module.expr_mut(init).state = SemaState::Done;
                    let decl = module.alloc_expr(
                        ExprKind::EnumeratorDecl {
                            name,
                            init: Some(init),
                        },
                        id,
                        Span::default(),
                    );
                    module.expr_mut(decl).state = SemaState::Done;
                    let _ = module.declare(scope, name, decl);
                    decls.push(decl);
                }
                TypeKind::Enum {
                    underlying: lookup(*underlying)?,
                    enumerators: decls,
                    scope,
                }
            }
            RawType::Function { ret, params, attrs } => {
                let params = params
                    .iter()
                    .map(|(name, ty)| {
                        Ok(Param {
                            name: name.as_deref().map(|n| module.interner.intern(n)),
                            ty: lookup(*ty)?,
                            span: Span::default(),
                        })
                    })
                    .collect::<Result<Vec<_>, MetadataError>>()?;
                TypeKind::Function {
                    ret: lookup(*ret)?,
                    params,
                    attrs: attrs_from_bits(*attrs),
                }
            }
        };
        let node = module.types.get_mut(id);
        node.kind = kind;
        node.state = SemaState::Done;
    }

    // Phase 3: shadow representations need every member kind in place.
    for (i, raw) in raw_types.iter().enumerate() {
        match raw {
            RawType::Sum { .. } => {
                let shadow = layout::build_sum_shadow(module, ids[i]);
                if let TypeKind::Sum { shadow: slot, .. } =
                    &mut module.types.get_mut(ids[i]).kind
                {
                    *slot = Some(shadow);
                }
            }
            RawType::DynamicArray(_) => {
                let shadow = layout::build_dynamic_array_shadow(module, ids[i]);
                if let TypeKind::DynamicArray { shadow: slot, .. } =
                    &mut module.types.get_mut(ids[i]).kind
                {
                    *slot = Some(shadow);
                }
            }
            _ => {}
        }
    }

    // Declarations, straight into the global scope.
    let decl_count = reader.u32()? as usize;
    for _ in 0..decl_count {
        let kind = reader.u8()?;
        let name_str = reader.str()?;
        let ty = lookup(reader.u32()?)?;
        let name = module.interner.intern(&name_str);
        let kind = match kind {
            decl_kind::VAR => ExprKind::VarDecl {
                name,
                init: None,
                linkage: Linkage::Imported,
            },
            decl_kind::FUNC => {
                let scope = module.new_scope(Some(module.global_scope));
                ExprKind::FuncDecl {
                    name,
                    body: None,
                    scope,
                    linkage: Linkage::Imported,
                    param_decls: Vec::new(),
                }
            }
            decl_kind::TYPE => ExprKind::TypeDecl { name },
            decl_kind::TYPE_ALIAS => ExprKind::TypeAliasDecl { name },
            other => return Err(MetadataError::BadTag(other)),
        };
        let is_var = matches!(kind, ExprKind::VarDecl { .. });
        let decl = module.alloc_expr(kind, ty, Span::default());
        module.expr_mut(decl).state = SemaState::Done;
        module.expr_mut(decl).lvalue = is_var;
        let _ = module.declare(module.global_scope, name, decl);
    }

    Ok(())
}

fn read_raw_type(reader: &mut Reader) -> Result<RawType, MetadataError> {
    Ok(match reader.u8()? {
        tag::BUILTIN => RawType::Builtin(reader.u8()?),
        tag::FFI => RawType::Ffi(reader.u8()?),
        tag::INTEGER => RawType::Integer {
            signed: reader.u8()? != 0,
            bits: reader.u16()?,
        },
        tag::POINTER => RawType::Pointer(reader.u32()?),
        tag::REFERENCE => RawType::Reference(reader.u32()?),
        tag::ARRAY => RawType::Array {
            elem: reader.u32()?,
            len: reader.u64()?,
        },
        tag::DYNAMIC_ARRAY => RawType::DynamicArray(reader.u32()?),
        tag::STRUCT => {
            let count = reader.u16()? as usize;
            let mut members = Vec::with_capacity(count);
            for _ in 0..count {
                let name = reader.str()?;
                let ty = reader.u32()?;
                let offset = reader.u32()?;
                members.push((name, ty, offset));
            }
            RawType::Struct {
                members,
                byte_size: reader.u32()?,
                alignment: reader.u16()?,
            }
        }
        tag::UNION => {
            let (members, byte_size, alignment) = read_plain_members(reader)?;
            RawType::Union {
                members,
                byte_size,
                alignment,
            }
        }
        tag::SUM => {
            let (members, byte_size, alignment) = read_plain_members(reader)?;
            RawType::Sum {
                members,
                byte_size,
                alignment,
            }
        }
        tag::ENUM => {
            let underlying = reader.u32()?;
            let count = reader.u16()? as usize;
            let mut enumerators = Vec::with_capacity(count);
            for _ in 0..count {
                let name = reader.str()?;
                let value = reader.u64()? as i64;
                enumerators.push((name, value));
            }
            RawType::Enum {
                underlying,
                enumerators,
            }
        }
        tag::FUNCTION => {
            let ret = reader.u32()?;
            let count = reader.u16()? as usize;
            let mut params = Vec::with_capacity(count);
            for _ in 0..count {
                let name = if reader.u8()? != 0 {
                    Some(reader.str()?)
                } else {
                    None
                };
                let ty = reader.u32()?;
                params.push((name, ty));
            }
            RawType::Function {
                ret,
                params,
                attrs: reader.u8()?,
            }
        }
        other => return Err(MetadataError::BadTag(other)),
    })
}

fn read_plain_members(
    reader: &mut Reader,
) -> Result<(Vec<(String, u32)>, u32, u16), MetadataError> {
    let count = reader.u16()? as usize;
    let mut members = Vec::with_capacity(count);
    for _ in 0..count {
        let name = reader.str()?;
        let ty = reader.u32()?;
        members.push((name, ty));
    }
    Ok((members, reader.u32()?, reader.u16()?))
}

fn plain_members(
    module: &mut Module,
    members: &[(String, u32)],
    lookup: &impl Fn(u32) -> Result<TypeId, MetadataError>,
) -> Result<Vec<Member>, MetadataError> {
    members
        .iter()
        .map(|(name, ty)| {
            Ok(Member {
                name: module.interner.intern(name),
                ty: lookup(*ty)?,
                byte_offset: 0,
                span: Span::default(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Wire helpers
// ---------------------------------------------------------------------------

struct Reader<'b> {
    blob: &'b [u8],
    position: usize,
}

impl<'b> Reader<'b> {
    fn bytes(&mut self, n: usize) -> Result<&'b [u8], MetadataError> {
        let out = self
            .blob
            .get(self.position..self.position + n)
            .ok_or(MetadataError::UnexpectedEof)?;
        self.position += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, MetadataError> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, MetadataError> {
        Ok(u16::from_le_bytes(self.bytes(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, MetadataError> {
        Ok(u32::from_le_bytes(self.bytes(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, MetadataError> {
        Ok(u64::from_le_bytes(self.bytes(8)?.try_into().unwrap()))
    }

    fn str(&mut self) -> Result<String, MetadataError> {
        let len = self.u16()? as usize;
        let bytes = self.bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| MetadataError::BadString)
    }
}

fn put_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_u16(buf, s.len() as u16);
    buf.extend_from_slice(s.as_bytes());
}

fn builtin_code(b: BuiltinType) -> u8 {
    match b {
        BuiltinType::Unknown => 0,
        BuiltinType::Void => 1,
        BuiltinType::Bool => 2,
        BuiltinType::Byte => 3,
        BuiltinType::Int => 4,
        BuiltinType::UInt => 5,
        BuiltinType::OverloadSet => 6,
    }
}

fn builtin_from_code(code: u8) -> Result<TypeId, MetadataError> {
    Ok(match code {
        0 => TypeId::UNKNOWN,
        1 => TypeId::VOID,
        2 => TypeId::BOOL,
        3 => TypeId::BYTE,
        4 => TypeId::INT,
        5 => TypeId::UINT,
        6 => TypeId::OVERLOAD_SET,
        other => return Err(MetadataError::BadTag(other)),
    })
}

fn ffi_code(f: FfiType) -> u8 {
    match f {
        FfiType::CChar => 0,
        FfiType::CShort => 1,
        FfiType::CInt => 2,
        FfiType::CLong => 3,
        FfiType::CLongLong => 4,
        FfiType::CUChar => 5,
        FfiType::CUShort => 6,
        FfiType::CUInt => 7,
        FfiType::CULong => 8,
        FfiType::CULongLong => 9,
    }
}

fn ffi_from_code(code: u8) -> Result<TypeId, MetadataError> {
    Ok(match code {
        0 => TypeId::C_CHAR,
        1 => TypeId::C_SHORT,
        2 => TypeId::C_INT,
        3 => TypeId::C_LONG,
        4 => TypeId::C_LONG_LONG,
        5 => TypeId::C_UCHAR,
        6 => TypeId::C_USHORT,
        7 => TypeId::C_UINT,
        8 => TypeId::C_ULONG,
        9 => TypeId::C_ULONG_LONG,
        other => return Err(MetadataError::BadTag(other)),
    })
}

fn attr_bits(attrs: FuncAttrs) -> u8 {
    u8::from(attrs.const_)
        | u8::from(attrs.discardable) << 1
        | u8::from(attrs.inline) << 2
        | u8::from(attrs.noinline) << 3
        | u8::from(attrs.noreturn) << 4
        | u8::from(attrs.pure) << 5
        | u8::from(attrs.used) << 6
}

fn attrs_from_bits(bits: u8) -> FuncAttrs {
    FuncAttrs {
        const_: bits & 1 != 0,
        discardable: bits & 2 != 0,
        inline: bits & 4 != 0,
        noinline: bits & 8 != 0,
        noreturn: bits & 16 != 0,
        pure: bits & 32 != 0,
        used: bits & 64 != 0,
    }
}
