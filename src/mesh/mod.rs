mod aero;
mod beam;

pub use aero::{AeroMesh, PanelGeometry, PanelGeometryTangent};
pub use beam::{CrossSection, CrossSectionTangent, SectionFamily, StructMesh};
