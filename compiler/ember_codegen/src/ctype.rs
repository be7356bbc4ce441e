//! Mapping from inferred types to C type syntax.

use ember_ir::StringInterner;
use ember_types::{Capacity, TypeData, TypeId, TypeInterner};

/// Maps interned types to the C spellings the emitter writes out.
///
/// Two forms matter: the bare type text (`c_type`) for casts and
/// prototypes, and the declaration form (`declaration`) which places the
/// identifier inside array suffixes where C requires it.
pub struct CTypeMapper<'a> {
    names: &'a StringInterner,
    types: &'a TypeInterner,
}

impl<'a> CTypeMapper<'a> {
    pub fn new(names: &'a StringInterner, types: &'a TypeInterner) -> Self {
        CTypeMapper { names, types }
    }

    /// The bare C type for an id. Fixed arrays decay to their element
    /// pointer here; use [`CTypeMapper::declaration`] for definitions.
    pub fn c_type(&self, id: TypeId) -> String {
        match self.types.lookup(id) {
            TypeData::Number | TypeData::Bool => "int16_t".to_owned(),
            TypeData::Str => "char *".to_owned(),
            TypeData::Void | TypeData::Error => "void".to_owned(),
            TypeData::Array { elem, capacity } => match capacity {
                Capacity::Fixed(_) => format!("{} *", self.c_type(elem)),
                Capacity::Dynamic => self.dynamic_array_type(elem),
            },
            TypeData::Dict { .. } => "dict_t *".to_owned(),
            TypeData::Struct { .. } => format!("obj_{}_t", id.index()),
            TypeData::Prototype { ret, .. } => self.c_type(ret),
        }
    }

    /// The typedef name backing a dynamic array of `elem`.
    pub fn dynamic_array_type(&self, elem: TypeId) -> String {
        match self.types.lookup(elem) {
            TypeData::Str => "arr_str_t".to_owned(),
            _ => "arr_int16_t_t".to_owned(),
        }
    }

    /// A full declarator: `int16_t xs[3]`, `char * s`, `dict_t * d`.
    pub fn declaration(&self, id: TypeId, name: &str) -> String {
        match self.types.lookup(id) {
            TypeData::Array {
                elem,
                capacity: Capacity::Fixed(n),
            } => format!("{} {name}[{n}]", self.c_type(elem)),
            _ => format!("{} {name}", self.c_type(id)),
        }
    }

    /// printf conversion for a value of this type.
    pub fn printf_spec(&self, id: TypeId) -> &'static str {
        match self.types.lookup(id) {
            TypeData::Str => "%s",
            _ => "%d",
        }
    }

    /// Typedef text for one deduplicated struct shape.
    pub fn struct_typedef(&self, id: TypeId) -> Option<String> {
        let TypeData::Struct { fields } = self.types.lookup(id) else {
            return None;
        };
        let mut out = String::from("typedef struct {\n");
        for (field, field_ty) in &fields {
            let field_name = self.names.lookup(*field);
            out.push_str("    ");
            out.push_str(&self.declaration(*field_ty, field_name));
            out.push_str(";\n");
        }
        out.push_str(&format!("}} obj_{}_t;\n", id.index()));
        Some(out)
    }

    /// Typedefs for every struct shape in the program, catalog order.
    pub fn struct_typedefs(&self) -> Vec<String> {
        self.types
            .struct_catalog()
            .into_iter()
            .filter_map(|(id, _)| self.struct_typedef(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn primitives() {
        let names = StringInterner::new();
        let types = TypeInterner::new();
        let mapper = CTypeMapper::new(&names, &types);

        assert_eq!(mapper.c_type(TypeId::NUMBER), "int16_t");
        assert_eq!(mapper.c_type(TypeId::BOOL), "int16_t");
        assert_eq!(mapper.c_type(TypeId::STR), "char *");
        assert_eq!(mapper.declaration(TypeId::STR, "s"), "char * s");
    }

    #[test]
    fn fixed_array_declares_with_suffix() {
        let names = StringInterner::new();
        let types = TypeInterner::new();
        let mapper = CTypeMapper::new(&names, &types);

        let fixed = types.array(TypeId::NUMBER, Capacity::Fixed(3));
        assert_eq!(mapper.declaration(fixed, "xs"), "int16_t xs[3]");
        assert_eq!(mapper.c_type(fixed), "int16_t *");
    }

    #[test]
    fn dynamic_arrays_use_struct_typedef() {
        let names = StringInterner::new();
        let types = TypeInterner::new();
        let mapper = CTypeMapper::new(&names, &types);

        let nums = types.array(TypeId::NUMBER, Capacity::Dynamic);
        let strs = types.array(TypeId::STR, Capacity::Dynamic);
        assert_eq!(mapper.c_type(nums), "arr_int16_t_t");
        assert_eq!(mapper.c_type(strs), "arr_str_t");
    }

    #[test]
    fn struct_typedef_text() {
        let names = StringInterner::new();
        let types = TypeInterner::new();
        let mapper = CTypeMapper::new(&names, &types);

        let x = names.intern("x");
        let label = names.intern("label");
        let id = types.struct_type(vec![(x, TypeId::NUMBER), (label, TypeId::STR)]);

        let expected = format!(
            "typedef struct {{\n    int16_t x;\n    char * label;\n}} obj_{}_t;\n",
            id.index()
        );
        assert_eq!(mapper.struct_typedef(id), Some(expected));
    }

    #[test]
    fn printf_specs() {
        let names = StringInterner::new();
        let types = TypeInterner::new();
        let mapper = CTypeMapper::new(&names, &types);

        assert_eq!(mapper.printf_spec(TypeId::NUMBER), "%d");
        assert_eq!(mapper.printf_spec(TypeId::STR), "%s");
    }
}
