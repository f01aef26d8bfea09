pub mod builder;
pub mod explicit;
pub mod implicit;

use crate::model::{ParseWarning, StructureFormat, StructureTree};

/// A parsed structure plus the uncertainties flagged along the way.
#[derive(Debug, Clone)]
pub struct StructureOutcome {
    pub tree: StructureTree,
    pub format: StructureFormat,
    pub warnings: Vec<ParseWarning>,
}

/// Run the parser variant selected by the detected format over the cleaned
/// line stream.
pub fn parse_structure(lines: &[String], format: StructureFormat) -> StructureOutcome {
    let (tree, warnings) = match format {
        StructureFormat::Explicit => explicit::parse(lines),
        StructureFormat::Implicit => implicit::parse(lines),
    };
    StructureOutcome {
        tree,
        format,
        warnings,
    }
}
