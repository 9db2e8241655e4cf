//! Birkman assessment provider: the remote API client, the grid rasterizer
//! and the component label table.

pub mod client;
pub mod grid;
pub mod labels;

pub use client::BirkmanApiClient;
pub use grid::GridRenderer;
pub use labels::component_label;
