mod estimate;
mod fringe_constant;
pub mod lenient;
mod line_item;
mod template;

pub use estimate::{Estimate, EstimateStatus, MarkupPct};
pub use fringe_constant::FringeConstant;
pub use line_item::{
    EquipmentItem, ItemMeta, LaborItem, LineItem, LineItemCategory, MaterialItem, OverheadItem,
    SimpleItem, Uom,
};
pub use template::{StoredProposal, Template};
