use std::{
    collections::HashSet,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use rand::{RngCore, SeedableRng, rngs::SmallRng};
use rand_xoshiro::SplitMix64;

use crate::{
    catalog::{PartCatalog, PartId},
    config::GenerationConfig,
    error::{RenderError, Result},
    labels::LabelWriter,
    params::{ParameterGenerator, SampleParameters},
    renderer::Renderer,
    version,
};

/// Progress of a run. Every transition is reported to the observer set with
/// [`DatasetDriver::on_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    ResolvingCatalog,
    ResolvingOutput,
    Rendering { part: usize, sample: u32 },
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartReport {
    pub part: PartId,
    pub succeeded: u32,
    pub failed: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// The `v<N>` directory of this run.
    pub output_dir: PathBuf,
    pub parts: Vec<PartReport>,
    /// Candidates without an installed model.
    pub invalid: Vec<PartId>,
    pub images_succeeded: u64,
    pub images_failed: u64,
    pub seed: u64,
    /// Set when the stop flag ended the run early.
    pub stopped: bool,
    pub elapsed: Duration,
}

/// Rng of a single sample. Feeding it to [`ParameterGenerator::generate`]
/// reproduces the parameters stored with that sample's label.
pub fn sample_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

pub fn image_path(part_dir: &Path, part: &PartId, sample: u32) -> PathBuf {
    part_dir.join(format!("{part}_{sample}.png"))
}

/// Keeps the labels manifest and the images on disk in step: an image whose
/// label could not be written is removed. Returns whether the sample counts.
pub fn record_sample<W: Write>(
    labels: &mut LabelWriter<W>,
    part: &PartId,
    sample: u32,
    seed: u64,
    params: &SampleParameters,
    image: &Path,
) -> bool {
    let Err(err) = labels.append(part, sample, seed, params) else {
        return true;
    };
    log::warn!("part {part}, sample {sample}: label not written, dropping image: {err}");
    if let Err(err) = fs::remove_file(image) {
        log::warn!("could not remove {}: {err}", image.display());
    }
    false
}

type StateObserver = Box<dyn FnMut(DriverState)>;

pub struct DatasetDriver<R> {
    renderer: R,
    state: DriverState,
    stop: Option<Arc<AtomicBool>>,
    observer: Option<StateObserver>,
}

impl<R: Renderer> DatasetDriver<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            state: DriverState::Idle,
            stop: None,
            observer: None,
        }
    }

    /// Called on every state change, including each `Rendering` step.
    pub fn on_state(mut self, observer: impl FnMut(DriverState) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Checked once per sample boundary. Setting it ends the run after the
    /// sample in flight.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    pub fn run(&mut self, config: &GenerationConfig) -> Result<RunReport> {
        let res = self.run_inner(config);
        match res {
            Ok(_) => self.set_state(DriverState::Done),
            Err(ref err) => {
                log::error!("run failed: {err}");
                self.set_state(DriverState::Failed);
            }
        }
        res
    }

    fn set_state(&mut self, state: DriverState) {
        self.state = state;
        if let Some(observer) = self.observer.as_mut() {
            observer(state);
        }
    }

    fn run_inner(&mut self, config: &GenerationConfig) -> Result<RunReport> {
        let started = Instant::now();
        config.validate()?;
        let generator = ParameterGenerator::new(config)?;

        self.set_state(DriverState::ResolvingCatalog);
        let paths = &config.paths;
        let catalog = PartCatalog::resolve(&paths.candidates, &paths.assets, paths.list_format)?;
        let selected = catalog.select(config.subset.offset, config.subset.count);
        log::info!(
            "selected {} parts (offset {}, count {:?})",
            selected.len(),
            config.subset.offset,
            config.subset.count
        );

        self.set_state(DriverState::ResolvingOutput);
        let output_dir = version::create_next_version(&paths.output)?;
        let mut labels = LabelWriter::create(&output_dir)?;

        let seed = config.dataset.seed.unwrap_or_else(rand::random);
        log::info!("master seed {seed}");
        let mut seeds = SplitMix64::seed_from_u64(seed);

        let mut report = RunReport {
            output_dir,
            parts: Vec::with_capacity(selected.len()),
            invalid: catalog.invalid.clone(),
            images_succeeded: 0,
            images_failed: 0,
            seed,
            stopped: false,
            elapsed: Duration::ZERO,
        };

        let mut seen = HashSet::new();
        for (idx, part) in selected.iter().enumerate() {
            if !seen.insert(part) {
                log::warn!("part {part} listed more than once, skipping repeat");
                continue;
            }
            if self.stop_requested() {
                report.stopped = true;
                break;
            }
            let (part_report, interrupted) = self.render_part(
                config,
                &generator,
                &mut seeds,
                &mut labels,
                &report.output_dir,
                idx,
                part,
                catalog.model(part),
            );
            report.images_succeeded += u64::from(part_report.succeeded);
            report.images_failed += u64::from(part_report.failed);
            report.parts.push(part_report);
            if interrupted {
                report.stopped = true;
                break;
            }
        }

        labels.finish()?;
        report.elapsed = started.elapsed();
        log::info!(
            "{} images rendered, {} failed in {:.2?}{}",
            report.images_succeeded,
            report.images_failed,
            report.elapsed,
            if report.stopped { " (stopped)" } else { "" }
        );
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn render_part(
        &mut self,
        config: &GenerationConfig,
        generator: &ParameterGenerator,
        seeds: &mut SplitMix64,
        labels: &mut LabelWriter,
        output_dir: &Path,
        idx: usize,
        part: &PartId,
        model: Option<&Path>,
    ) -> (PartReport, bool) {
        let started = Instant::now();
        let samples = config.dataset.samples_per_part;
        let mut report = PartReport {
            part: part.clone(),
            succeeded: 0,
            failed: 0,
            elapsed: Duration::ZERO,
        };

        let part_dir = output_dir.join(part.as_str());
        let setup = model
            .ok_or_else(|| RenderError::failed("no model file"))
            .and_then(|model| {
                fs::create_dir_all(&part_dir)?;
                self.renderer.begin_part(part, model)
            });
        if let Err(err) = setup {
            log::warn!("part {part}: setup failed, skipping {samples} samples: {err}");
            // keep the seed stream aligned with a run where this part succeeded
            for _ in 0..samples {
                seeds.next_u64();
            }
            report.failed = samples;
            report.elapsed = started.elapsed();
            return (report, false);
        }

        let mut interrupted = false;
        for sample in 0..samples {
            if self.stop_requested() {
                log::info!("stop requested at part {part}, sample {sample}");
                interrupted = true;
                break;
            }
            self.set_state(DriverState::Rendering { part: idx, sample });

            let t = Instant::now();
            let seed = seeds.next_u64();
            let params = generator.generate(&mut sample_rng(seed));
            let out = image_path(&part_dir, part, sample);

            match self.renderer.render(part, &params, &out) {
                Ok(()) => {
                    if record_sample(labels, part, sample, seed, &params, &out) {
                        report.succeeded += 1;
                        log::debug!("render {part} ({sample}) [{:.2?}]: {}", t.elapsed(), out.display());
                    } else {
                        report.failed += 1;
                    }
                }
                Err(err) => {
                    report.failed += 1;
                    log::warn!("part {part}, sample {sample}: render failed: {err}");
                }
            }
        }

        report.elapsed = started.elapsed();
        log::info!(
            "finished part {part}: {} ok, {} failed in {:.2?}",
            report.succeeded,
            report.failed,
            report.elapsed
        );
        (report, interrupted)
    }

    fn stop_requested(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Material;
    use std::io;

    struct Full;

    impl Write for Full {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn params() -> SampleParameters {
        SampleParameters {
            lights: vec![],
            material: Material {
                diffuse_rgb: [0.5; 3],
                metallic: 0.0,
                specular: 0.5,
                roughness: 0.5,
            },
            rotation_euler: [0.0; 3],
        }
    }

    #[test]
    fn unlabelled_image_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let part = PartId::new("3001").unwrap();
        let image = image_path(dir.path(), &part, 0);
        fs::write(&image, b"png").unwrap();

        let mut labels = LabelWriter::new(Full);
        assert!(!record_sample(&mut labels, &part, 0, 1, &params(), &image));
        assert!(!image.exists());
    }

    #[test]
    fn labelled_image_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let part = PartId::new("3001").unwrap();
        let image = image_path(dir.path(), &part, 0);
        fs::write(&image, b"png").unwrap();

        let mut labels = LabelWriter::new(Vec::new());
        assert!(record_sample(&mut labels, &part, 0, 1, &params(), &image));
        assert!(image.is_file());
        assert_eq!(labels.get_ref().unwrap().iter().filter(|&&b| b == b'\n').count(), 1);
    }
}
