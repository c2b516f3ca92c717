use crate::coord::Coordinate;
use crate::envelope::Envelope;
use crate::error::TransformError;
use crate::geo::crs::{Crs, CrsId, CrsPair};

/// Converts coordinates between coordinate reference systems.
///
/// Implementations are expected to be deterministic: transforming a batch gives the same results as transforming its
/// coordinates one by one.
pub trait ProjectionEngine {
    /// All the CRSs the engine can transform between.
    fn crs_list(&self) -> &[Crs];

    /// Description of the CRS with the given id, if the engine knows it.
    fn crs(&self, id: &CrsId) -> Option<&Crs> {
        self.crs_list().iter().find(|crs| &crs.id == id)
    }

    /// Transforms the coordinates from `pair.source` into `pair.target`.
    ///
    /// The result has the same length and order as the input, and each coordinate keeps its number of components. If
    /// any coordinate cannot be transformed, the whole batch fails.
    fn transform(
        &self,
        pair: &CrsPair,
        coordinates: &[Coordinate],
    ) -> Result<Vec<Coordinate>, TransformError>;

    /// Envelope of the area where the CRS can be used, in the CRS's own axis order and units.
    fn domain_of(&self, id: &CrsId) -> Result<Envelope, TransformError>;
}
