use crate::domains::export::progress::{ProgressObserver, PROGRESS_INTERVAL};
use crate::domains::export::types::MassPropertySummary;
use crate::domains::imodel::{ElementId, GeometryEngine, MassPropertiesOperation, MassPropertiesRequest};
use crate::errors::ExportResult;

/// Sums volume, area and length over groups of elements.
///
/// A measure reported as `0` or not reported at all counts as "not
/// applicable": it is left out of both the sum and that measure's count.
/// Geometry that really measures zero is therefore indistinguishable from
/// missing geometry.
pub struct MassPropertyAggregator<'a> {
    geometry: &'a dyn GeometryEngine,
    progress: &'a dyn ProgressObserver,
}

impl<'a> MassPropertyAggregator<'a> {
    pub fn new(geometry: &'a dyn GeometryEngine, progress: &'a dyn ProgressObserver) -> Self {
        Self { geometry, progress }
    }

    /// Aggregate the measures of `ids`, querying each element on its own.
    ///
    /// Geometry engine failures are returned as-is.
    pub async fn calculate(&self, ids: &[ElementId]) -> ExportResult<MassPropertySummary> {
        let mut summary = MassPropertySummary::new(ids.len());

        for (count, id) in ids.iter().enumerate() {
            if count > 0 && count % PROGRESS_INTERVAL == 0 {
                self.progress.mass_properties_progress(count, &summary);
            }

            let mut request = MassPropertiesRequest {
                operation: MassPropertiesOperation::AccumulateVolumes,
                candidates: vec![*id],
            };
            let volume = self.geometry.mass_properties(&request).await?.volume;
            accumulate(&mut summary.volume, &mut summary.volume_count, volume);

            request.operation = MassPropertiesOperation::AccumulateAreas;
            let area = self.geometry.mass_properties(&request).await?.area;
            accumulate(&mut summary.area, &mut summary.area_count, area);

            request.operation = MassPropertiesOperation::AccumulateLengths;
            let length = self.geometry.mass_properties(&request).await?.length;
            accumulate(&mut summary.length, &mut summary.length_count, length);
        }

        Ok(summary)
    }
}

fn accumulate(total: &mut f64, count: &mut usize, value: Option<f64>) {
    let value = value.unwrap_or(0.0);
    if value != 0.0 {
        *total += value;
        *count += 1;
    }
}
