//! Struct layout
//!
//! A [`StructLayout`] is computed once, when its struct definition is
//! resolved, and never changes afterwards. Fields are placed in declaration
//! order at the next offset that satisfies their natural alignment.

use super::{alignof_type, sizeof_type};
use crate::types::Type;
use rustc_hash::FxHashMap;

/// All struct layouts of a translation unit, keyed by struct tag.
pub type Layouts = FxHashMap<String, StructLayout>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: String,
    pub ty: Type,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub name: String,
    pub fields: Vec<FieldLayout>,
    pub size: usize,
    pub align: usize,
}

/// One element of a struct's storage: a field or a run of padding bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member<'a> {
    Field(&'a FieldLayout),
    Padding(usize),
}

fn align_to(offset: usize, align: usize) -> usize {
    offset.div_ceil(align) * align
}

impl StructLayout {
    /// Lay out `fields` in order. Every field type must already have a
    /// known layout in `layouts`.
    pub fn compute(name: &str, fields: &[(String, Type)], layouts: &Layouts) -> Self {
        let mut offset = 0;
        let mut align = 1;
        let mut placed = Vec::with_capacity(fields.len());

        for (field_name, ty) in fields {
            let field_align = alignof_type(ty, layouts);
            offset = align_to(offset, field_align);
            placed.push(FieldLayout {
                name: field_name.clone(),
                ty: ty.clone(),
                offset,
            });
            offset += sizeof_type(ty, layouts);
            align = align.max(field_align);
        }

        StructLayout {
            name: name.to_string(),
            fields: placed,
            size: align_to(offset, align),
            align,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields interleaved with the padding that separates them, including
    /// tail padding up to `size`.
    pub fn members(&self, layouts: &Layouts) -> Vec<Member<'_>> {
        let mut members = Vec::new();
        let mut offset = 0;
        for field in &self.fields {
            if field.offset > offset {
                members.push(Member::Padding(field.offset - offset));
            }
            members.push(Member::Field(field));
            offset = field.offset + sizeof_type(&field.ty, layouts);
        }
        if self.size > offset {
            members.push(Member::Padding(self.size - offset));
        }
        members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_of(fields: &[(&str, Type)], layouts: &Layouts) -> StructLayout {
        let fields: Vec<_> = fields
            .iter()
            .map(|(n, t)| (n.to_string(), t.clone()))
            .collect();
        StructLayout::compute("s", &fields, layouts)
    }

    #[test]
    fn test_padding_between_fields() {
        let layouts = Layouts::default();
        let layout = layout_of(&[("c", Type::Char), ("i", Type::INT), ("d", Type::Char)], &layouts);

        let offsets: Vec<_> = layout.fields.iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 4, 8]);
        assert_eq!(layout.size, 12);
        assert_eq!(layout.align, 4);
    }

    #[test]
    fn test_members_include_tail_padding() {
        let layouts = Layouts::default();
        let layout = layout_of(&[("p", Type::Char.pointer_to()), ("c", Type::Char)], &layouts);

        let members = layout.members(&layouts);
        assert_eq!(members.len(), 3);
        assert_eq!(members[2], Member::Padding(7));
        assert_eq!(layout.size, 16);
    }

    #[test]
    fn test_nested_struct_uses_inner_alignment() {
        let mut layouts = Layouts::default();
        let inner = layout_of(&[("a", Type::Char), ("b", Type::Int(crate::types::IntType::SHORT))], &layouts);
        layouts.insert("inner".into(), StructLayout { name: "inner".into(), ..inner });

        let outer = layout_of(&[("c", Type::Char), ("in", Type::Struct("inner".into()))], &layouts);
        assert_eq!(outer.field("in").map(|f| f.offset), Some(2));
        assert_eq!(outer.size, 6);
    }

    #[test]
    fn test_empty_struct() {
        let layout = layout_of(&[], &Layouts::default());
        assert_eq!(layout.size, 0);
        assert!(layout.members(&Layouts::default()).is_empty());
    }
}
