use structopt::StructOpt;

/// Knobs for planning. Tools can embed these with `#[structopt(flatten)]`.
#[derive(Clone, Debug, PartialEq, StructOpt)]
pub struct PlanOptions {
    /// Seconds of clearance (yellow) the conflict resolver inserts after every movement group.
    #[structopt(long, default_value = "1.0")]
    pub clearance_seconds: f64,
    /// How far the phase builder's walk around the cycle may land from the cycle boundary.
    #[structopt(long, default_value = "0.000001")]
    pub tolerance: f64,
    /// By default, the conflict resolver leaves intersections without any detected conflict
    /// alone. Resolve every intersection instead.
    #[structopt(long)]
    pub always_resolve: bool,
    /// The phase builder normally skips intersections with more than 4 approaches or 4 outgoing
    /// links. Build those too.
    #[structopt(long)]
    pub include_special_layouts: bool,
}

impl Default for PlanOptions {
    fn default() -> PlanOptions {
        PlanOptions {
            clearance_seconds: 1.0,
            tolerance: crate::EPSILON,
            always_resolve: false,
            include_special_layouts: false,
        }
    }
}
