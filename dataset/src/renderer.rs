use std::path::Path;

use crate::{catalog::PartId, error::RenderError, params::SampleParameters};

/// Produces one image per call. Implementations typically own a single
/// mutable scene, so calls are always issued one at a time.
pub trait Renderer {
    /// Scene setup shared by every sample of `part` (model import, static
    /// geometry). Called once before the first sample of each part with the
    /// installed model file of that part.
    fn begin_part(&mut self, _part: &PartId, _model: &Path) -> Result<(), RenderError> {
        Ok(())
    }

    /// Renders `part` with `params` and writes exactly one image to `output`.
    fn render(
        &mut self,
        part: &PartId,
        params: &SampleParameters,
        output: &Path,
    ) -> Result<(), RenderError>;
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn begin_part(&mut self, part: &PartId, model: &Path) -> Result<(), RenderError> {
        (**self).begin_part(part, model)
    }

    fn render(
        &mut self,
        part: &PartId,
        params: &SampleParameters,
        output: &Path,
    ) -> Result<(), RenderError> {
        (**self).render(part, params, output)
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn begin_part(&mut self, part: &PartId, model: &Path) -> Result<(), RenderError> {
        (**self).begin_part(part, model)
    }

    fn render(
        &mut self,
        part: &PartId,
        params: &SampleParameters,
        output: &Path,
    ) -> Result<(), RenderError> {
        (**self).render(part, params, output)
    }
}
