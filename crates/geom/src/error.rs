#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum GeomError {
    /// The requested pen position is outside the region the arm can reach.
    ///
    /// `distance` is measured from the arm's base: the shoulder for a two-link
    /// arm, and the midpoint between the motors for a pantograph.
    #[error(
        "cannot reach ({x:.3}, {y:.3}): it is {distance:.3}cm from the base, \
         but the arm reaches between {min_reach:.3}cm and {max_reach:.3}cm"
    )]
    UnreachablePosition {
        x: f64,
        y: f64,
        distance: f64,
        min_reach: f64,
        max_reach: f64,
    },
}
