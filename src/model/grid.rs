use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which of the two renderings of a node a piece of layout state belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayoutMode {
    /// Expanded, free-form draggable grid.
    Fullscreen,
    /// Compact inline card; only `x`/`w` (order and column span) are meaningful.
    Normal,
}

impl LayoutMode {
    pub const ALL: [LayoutMode; 2] = [LayoutMode::Fullscreen, LayoutMode::Normal];
}

/// Position and size in grid cells, plus optional resize limits.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GridRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<u32>,
}

impl GridRect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self { Self { x, y, w, h, ..Self::default() } }

    pub fn bottom(&self) -> u32 { self.y.saturating_add(self.h) }

    /// Enforces `w, h >= 1`.
    pub fn normalized(self) -> Self { Self { w: self.w.max(1), h: self.h.max(1), ..self } }

    pub fn with_y(self, y: u32) -> Self { Self { y, ..self } }
}

/// The unit exchanged with the grid renderer. `id` names either a block or a
/// tab group; see [`crate::model::LayoutSlot`] for the disambiguated form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GridItem {
    pub id: String,
    #[serde(flatten)]
    pub rect: GridRect,
}

impl GridItem {
    pub fn new(id: impl Into<String>, x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { id: id.into(), rect: GridRect::new(x, y, w, h) }
    }

    pub fn with_rect(id: impl Into<String>, rect: GridRect) -> Self { Self { id: id.into(), rect } }
}

/// User-adjusted resize limits for one block in one mode.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SizeOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<u32>,
}

impl SizeOverride {
    pub fn is_empty(&self) -> bool { *self == Self::default() }

    /// Fields set on `self` win over those on `base`.
    pub fn merged_over(&self, base: &SizeOverride) -> SizeOverride {
        SizeOverride {
            min_w: self.min_w.or(base.min_w),
            min_h: self.min_h.or(base.min_h),
            max_w: self.max_w.or(base.max_w),
            max_h: self.max_h.or(base.max_h),
        }
    }
}

/// Lowest occupied row across `rects`, i.e. the first free row below them.
pub fn layout_bottom<'a>(rects: impl IntoIterator<Item = &'a GridRect>) -> u32 {
    rects.into_iter().map(GridRect::bottom).max().unwrap_or(0)
}
