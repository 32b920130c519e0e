use super::{BlockDefinition, FullscreenLayout, NormalLayout};

struct Seed {
    id: &'static str,
    title: &'static str,
    icon: &'static str,
    col_span: u32,
    rect: (u32, u32, u32, u32),
    min: Option<(u32, u32)>,
    collapsible: bool,
}

const fn block(
    id: &'static str,
    title: &'static str,
    icon: &'static str,
    col_span: u32,
    rect: (u32, u32, u32, u32),
) -> Seed {
    Seed { id, title, icon, col_span, rect, min: None, collapsible: false }
}

const fn panel(
    id: &'static str,
    title: &'static str,
    icon: &'static str,
    rect: (u32, u32, u32, u32),
    min: (u32, u32),
) -> Seed {
    Seed { id, title, icon, col_span: 2, rect, min: Some(min), collapsible: true }
}

const FINDZ: &[Seed] = &[
    block("path", "Path", "folder", 2, (0, 0, 2, 2)),
    block("filter", "Filter", "filter", 1, (2, 0, 2, 2)),
    block("options", "Options", "sliders", 1, (0, 2, 2, 2)),
    panel("results", "Results", "list", (0, 4, 4, 4), (2, 2)),
    panel("log", "Log", "terminal", (2, 2, 2, 2), (2, 1)),
];

const TRENAME: &[Seed] = &[
    block("path", "Path", "folder", 2, (0, 0, 2, 2)),
    block("rules", "Rename rules", "pencil", 2, (2, 0, 2, 3)),
    block("operation", "Operation", "play", 1, (0, 2, 2, 1)),
    panel("preview", "Preview", "eye", (0, 3, 4, 4), (2, 2)),
    panel("log", "Log", "terminal", (0, 7, 4, 2), (2, 1)),
];

const MIGRATEF: &[Seed] = &[
    block("source", "Source", "folder", 2, (0, 0, 2, 2)),
    block("destination", "Destination", "folder-input", 2, (2, 0, 2, 2)),
    block("options", "Options", "sliders", 1, (0, 2, 2, 2)),
    panel("progress", "Progress", "loader", (2, 2, 2, 2), (2, 1)),
    panel("log", "Log", "terminal", (0, 4, 4, 3), (2, 1)),
];

const BANDIA: &[Seed] = &[
    block("paths", "Archives", "file-archive", 2, (0, 0, 2, 3)),
    block("options", "Extract options", "sliders", 1, (2, 0, 2, 2)),
    block("operation", "Operation", "play", 1, (2, 2, 2, 1)),
    panel("progress", "Progress", "loader", (0, 3, 4, 2), (2, 1)),
    panel("log", "Log", "terminal", (0, 5, 4, 3), (2, 1)),
];

const CRASHU: &[Seed] = &[
    block("sources", "Source folders", "folders", 2, (0, 0, 2, 2)),
    block("target", "Target", "target", 2, (2, 0, 2, 2)),
    block("matching", "Matching", "sliders", 1, (0, 2, 2, 2)),
    block("operation", "Operation", "play", 1, (2, 2, 2, 2)),
    panel("pairs", "Similar folders", "list", (0, 4, 4, 4), (2, 2)),
    panel("log", "Log", "terminal", (0, 8, 4, 2), (2, 1)),
];

const LINKU: &[Seed] = &[
    block("path", "Path", "folder", 2, (0, 0, 2, 2)),
    block("target", "Link target", "link", 2, (2, 0, 2, 2)),
    block("operation", "Operation", "play", 1, (0, 2, 2, 1)),
    panel("info", "Path info", "info", (2, 2, 2, 3), (2, 2)),
    panel("links", "Recorded links", "list", (0, 5, 4, 3), (2, 2)),
];

pub(super) fn catalog() -> Vec<(&'static str, Vec<BlockDefinition>)> {
    [
        ("findz", FINDZ),
        ("trename", TRENAME),
        ("migratef", MIGRATEF),
        ("bandia", BANDIA),
        ("crashu", CRASHU),
        ("linku", LINKU),
    ]
    .into_iter()
    .map(|(node_type, seeds)| (node_type, seeds.iter().enumerate().map(definition).collect()))
    .collect()
}

fn definition((order, seed): (usize, &Seed)) -> BlockDefinition {
    let (x, y, w, h) = seed.rect;
    BlockDefinition {
        id: seed.id.to_owned(),
        title: seed.title.to_owned(),
        icon: seed.icon.to_owned(),
        normal_layout: NormalLayout {
            col_span: Some(seed.col_span),
            row_span: None,
            hidden: false,
            order: Some(order as i32),
        },
        fullscreen_layout: FullscreenLayout {
            x,
            y,
            w,
            h,
            min_w: seed.min.map(|(w, _)| w),
            min_h: seed.min.map(|(_, h)| h),
        },
        collapsible: seed.collapsible,
        default_collapsed: false,
    }
}
