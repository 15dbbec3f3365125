use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use serde::Serialize;

use crate::{catalog::PartId, params::SampleParameters};

pub const LABELS_FILE: &str = "labels.jsonl";

#[derive(Serialize, Debug)]
pub struct LabelRecord<'a> {
    pub schema: &'static str,
    /// Image path relative to the run directory.
    pub image: String,
    pub part: &'a PartId,
    pub sample: u32,
    pub seed: u64,
    pub params: &'a SampleParameters,
}

/// One JSON object per rendered image, appended as the run goes.
pub struct LabelWriter<W: Write = BufWriter<File>> {
    writer: Option<W>,
}

impl LabelWriter {
    pub fn create(run_dir: &Path) -> io::Result<Self> {
        let file = File::create(run_dir.join(LABELS_FILE))?;
        Ok(Self::new(BufWriter::with_capacity(1 << 20, file)))
    }

    pub fn finish(&mut self) -> io::Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.into_inner()?.sync_all()?;
        }
        Ok(())
    }
}

impl<W: Write> LabelWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    /// Serializes the whole line before writing, so a record that fails to
    /// serialize leaves nothing behind.
    pub fn append(
        &mut self,
        part: &PartId,
        sample: u32,
        seed: u64,
        params: &SampleParameters,
    ) -> io::Result<()> {
        let rec = LabelRecord {
            schema: "v1",
            image: format!("{part}/{part}_{sample}.png"),
            part,
            sample,
            seed,
            params,
        };
        let mut line = serde_json::to_vec(&rec)?;
        line.push(b'\n');
        if let Some(ref mut writer) = self.writer {
            writer.write_all(&line)?;
        }
        Ok(())
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.writer.as_ref()
    }
}

impl<W: Write> Drop for LabelWriter<W> {
    fn drop(&mut self) {
        if let Some(ref mut writer) = self.writer {
            let _ = writer.flush();
        }
    }
}
