use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    process::Command,
};

use dataset::{PartId, RenderError, Renderer, SampleParameters, config::CommandConfig};

use crate::record::JobRecord;

/// Runs an external scene host once per sample:
/// `program args... <job.json>`. The job file sits next to the image and is
/// removed once the image exists.
pub struct CommandRenderer {
    pub program: String,
    pub args: Vec<String>,
    pub engine: String,
    pub resolution: [u32; 2],
    /// Part set up by the last `begin_part` and its model file.
    current: Option<(PartId, PathBuf)>,
}

impl CommandRenderer {
    pub fn new(cmd: &CommandConfig, engine: &str, resolution: [u32; 2]) -> Self {
        Self {
            program: cmd.program.clone(),
            args: cmd.args.clone(),
            engine: engine.to_string(),
            resolution,
            current: None,
        }
    }

    fn write_job(
        &self,
        job_path: &Path,
        part: &PartId,
        params: &SampleParameters,
        output: &Path,
    ) -> Result<(), RenderError> {
        let model = match &self.current {
            Some((id, model)) if id == part => model,
            _ => return Err(RenderError::failed(format!("part {part} was not set up"))),
        };
        let rec = JobRecord {
            schema: "v1",
            part,
            model,
            output,
            engine: &self.engine,
            resolution: self.resolution,
            params,
        };
        let mut writer = BufWriter::new(File::create(job_path)?);
        serde_json::to_writer_pretty(&mut writer, &rec).map_err(std::io::Error::from)?;
        writer.flush()?;
        Ok(())
    }
}

impl Renderer for CommandRenderer {
    fn begin_part(&mut self, part: &PartId, model: &Path) -> Result<(), RenderError> {
        self.current = Some((part.clone(), model.to_path_buf()));
        Ok(())
    }

    fn render(
        &mut self,
        part: &PartId,
        params: &SampleParameters,
        output: &Path,
    ) -> Result<(), RenderError> {
        let job_path = output.with_extension("json");
        self.write_job(&job_path, part, params, output)?;

        log::debug!("{} {:?} {}", self.program, self.args, job_path.display());
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&job_path)
            .status()
            .map_err(|err| RenderError::failed(format!("failed to start {}: {err}", self.program)))?;

        if !status.success() {
            return Err(RenderError::failed(format!(
                "{} exited with {status}, job kept at {}",
                self.program,
                job_path.display()
            )));
        }
        if !output.is_file() {
            return Err(RenderError::failed(format!(
                "{} finished but produced no image at {}",
                self.program,
                output.display()
            )));
        }
        fs::remove_file(&job_path)?;
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use dataset::Material;

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

    fn renderer(program: &str, args: &[&str]) -> CommandRenderer {
        CommandRenderer {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            engine: "eevee".to_string(),
            resolution: [64, 64],
            current: None,
        }
    }

    fn part() -> PartId {
        PartId::new("3001").unwrap()
    }

    fn ready(program: &str, args: &[&str]) -> CommandRenderer {
        let mut r = renderer(program, args);
        r.begin_part(&part(), Path::new("parts/3001.dat")).unwrap();
        r
    }

    #[test]
    fn successful_host_leaves_only_the_image() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("3001_0.png");
        // the script receives the job path as $0 and writes <job>.png
        let mut r = ready("sh", &["-c", r#"cp "$0" "${0%.json}.png""#]);
        r.render(&part(), &params(), &out).unwrap();

        let job: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(job["part"], "3001");
        assert_eq!(job["model"], "parts/3001.dat");
        assert_eq!(job["engine"], "eevee");
        assert_eq!(job["resolution"], serde_json::json!([64, 64]));
        assert!(!out.with_extension("json").exists());
    }

    #[test]
    fn failing_host_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("3001_0.png");
        let mut r = ready("false", &[]);
        let err = r.render(&part(), &params(), &out).unwrap_err();
        assert!(err.to_string().contains("exited"));
        assert!(out.with_extension("json").is_file());
    }

    #[test]
    fn host_without_output_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("3001_0.png");
        let mut r = ready("true", &[]);
        let err = r.render(&part(), &params(), &out).unwrap_err();
        assert!(err.to_string().contains("no image"));
    }

    #[test]
    fn missing_program_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("3001_0.png");
        let mut r = ready("definitely-not-a-real-host-binary", &[]);
        assert!(r.render(&part(), &params(), &out).is_err());
    }

    #[test]
    fn render_without_setup_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("3002_0.png");
        let mut r = ready("true", &[]);
        let other = PartId::new("3002").unwrap();
        let err = r.render(&other, &params(), &out).unwrap_err();
        assert!(err.to_string().contains("not set up"));
        assert!(!out.with_extension("json").exists());
    }
}
