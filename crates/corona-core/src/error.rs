pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("size.radius must be a positive number (got {radius})")]
    InvalidRadius { radius: f64 },

    #[error("radialUnits must extend past 0 on at least one layer")]
    EmptyRadialRange,

    #[error("layer \"{layer}\" uses angleMode \"align\" but does not set alignWith")]
    MissingAlignWith { layer: String },

    #[error("layer \"{layer}\" aligns with \"{align_with}\", which is not an earlier layer")]
    UnknownAlignLayer { layer: String, align_with: String },

    #[error("layer \"{layer}\" cannot align with \"{align_with}\": it has no keyed root arcs")]
    NoAlignableArcs { layer: String, align_with: String },

    #[error(
        "layer \"{layer}\": root node \"{node}\" needs a key to align with layer \"{align_with}\""
    )]
    MissingAlignKey {
        layer: String,
        align_with: String,
        node: String,
    },

    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
