//! Built-in tool implementations
//!
//! Worker nodes run tools from a [`ToolCatalog`] built once at startup.
//!
//! | Tool | Queue |
//! |------|-------|
//! | `add`, `subtract`, `multiply`, `divide` | `math_queue` |
//! | `uppercase`, `lowercase` | `text_queue` |

pub mod math;
pub mod text;

pub use math::{MathOp, MathTool};
pub use text::CaseTool;

use relay_domain::ToolCatalog;

/// Catalog with every built-in tool
pub fn builtin_catalog() -> ToolCatalog {
    let mut catalog = ToolCatalog::new();
    for tool in MathTool::all() {
        catalog = catalog.with_tool(tool);
    }
    catalog
        .with_tool(CaseTool::uppercase())
        .with_tool(CaseTool::lowercase())
}
