//! Binding manifest: slots, descriptor ranges and binding parameters.
//!
//! The implicit uniform buffer always comes first, at constant-buffer slot
//! 0. Resources follow grouped by category (constant, read-only,
//! read-write), each group in slot order.

use serde::Serialize;

use crate::capture::CapturedField;
use crate::types::Category;

/// One binding: a category-local slot and, for resources, the position of
/// the capture it binds in the descriptor's resource list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BindingSlot {
    pub category: Category,
    pub index: u32,
    pub resource: Option<usize>,
}

impl BindingSlot {
    pub const UNIFORM: BindingSlot = BindingSlot {
        category: Category::ConstantBuffer,
        index: 0,
        resource: None,
    };

    pub fn is_uniform(&self) -> bool {
        self.resource.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RangeKind {
    /// Constant buffer view, register `bN`.
    Cbv,
    /// Shader resource view, register `tN`.
    Srv,
    /// Unordered access view, register `uN`.
    Uav,
}

impl RangeKind {
    pub fn of(category: Category) -> Self {
        match category {
            Category::ScalarOrVector | Category::ConstantBuffer => RangeKind::Cbv,
            Category::ReadOnlyBuffer => RangeKind::Srv,
            Category::ReadWriteBuffer => RangeKind::Uav,
        }
    }

    /// HLSL register class letter.
    pub fn register_class(self) -> char {
        match self {
            RangeKind::Cbv => 'b',
            RangeKind::Srv => 't',
            RangeKind::Uav => 'u',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DescriptorRange {
    pub kind: RangeKind,
    pub count: u32,
    pub base_register: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Visibility {
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BindingParameter {
    pub visibility: Visibility,
    pub range: DescriptorRange,
}

const RESOURCE_ORDER: [Category; 3] = [
    Category::ConstantBuffer,
    Category::ReadOnlyBuffer,
    Category::ReadWriteBuffer,
];

/// Slot sequence for a resource list.
pub fn assemble(resources: &[CapturedField]) -> Vec<BindingSlot> {
    let mut slots = vec![BindingSlot::UNIFORM];
    for category in RESOURCE_ORDER {
        let mut group: Vec<BindingSlot> = resources
            .iter()
            .enumerate()
            .filter(|(_, f)| f.category == category)
            .filter_map(|(position, f)| {
                f.slot.map(|index| BindingSlot {
                    category,
                    index,
                    resource: Some(position),
                })
            })
            .collect();
        group.sort_by_key(|s| s.index);
        slots.extend(group);
    }
    slots
}

/// One parameter per slot, each a single-descriptor range.
pub fn parameters(slots: &[BindingSlot]) -> Vec<BindingParameter> {
    slots
        .iter()
        .map(|slot| BindingParameter {
            visibility: Visibility::All,
            range: DescriptorRange {
                kind: RangeKind::of(slot.category),
                count: 1,
                base_register: slot.index,
            },
        })
        .collect()
}
