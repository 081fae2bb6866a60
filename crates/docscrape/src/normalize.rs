//! Batch conversion of staged HTML and notebooks into Markdown or text

use crate::convert::{convert, ConvertOptions, OutputFormat};
use crate::notebook::notebook_to_markdown;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Stem of the combined output file
pub const CONSOLIDATED_STEM: &str = "consolidated";

/// A converted artifact
#[derive(Debug, Clone, Serialize)]
pub struct Converted {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// Summary of one normalize pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizeReport {
    pub converted: Vec<Converted>,
    /// Inputs that could not be read, parsed or written
    pub failed: Vec<PathBuf>,
    /// Combined output, when consolidation is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consolidated: Option<PathBuf>,
}

/// Converts every `.html` and `.ipynb` file in a directory
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    format: OutputFormat,
    options: ConvertOptions,
    consolidate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Html,
    Notebook,
}

impl InputKind {
    fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("html") {
            Some(InputKind::Html)
        } else if ext.eq_ignore_ascii_case("ipynb") {
            Some(InputKind::Notebook)
        } else {
            None
        }
    }
}

impl Normalizer {
    pub fn new(format: OutputFormat, options: ConvertOptions) -> Self {
        Self {
            format,
            options,
            consolidate: false,
        }
    }

    /// Also write every output, in name order, to `consolidated.<ext>`
    pub fn with_consolidation(mut self, consolidate: bool) -> Self {
        self.consolidate = consolidate;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Output path for a given input file
    ///
    /// HTML takes the format's extension; notebooks always become `.md`.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        match InputKind::of(input) {
            Some(InputKind::Notebook) => input.with_extension(OutputFormat::Markdown.extension()),
            _ => input.with_extension(self.format.extension()),
        }
    }

    /// Convert one file, overwriting any previous output
    pub fn convert_file(&self, input: &Path) -> io::Result<PathBuf> {
        let converted = self.render(input)?;
        let output = self.output_path(input);
        fs::write(&output, converted)?;
        Ok(output)
    }

    fn render(&self, input: &Path) -> io::Result<String> {
        let bytes = fs::read(input)?;
        let source = String::from_utf8_lossy(&bytes);
        match InputKind::of(input) {
            Some(InputKind::Notebook) => Ok(notebook_to_markdown(&source)?),
            _ => Ok(convert(&source, self.format, self.options)),
        }
    }

    /// Convert every `*.html` and `*.ipynb` file directly inside `dir`
    ///
    /// Files are processed in name order. The inputs are left in place. A
    /// file that fails is logged and recorded; the pass continues.
    pub fn normalize_dir(&self, dir: &Path) -> io::Result<NormalizeReport> {
        let mut report = NormalizeReport::default();

        let mut inputs: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && InputKind::of(path).is_some())
            .collect();
        inputs.sort();

        for input in inputs {
            match self.convert_file(&input) {
                Ok(output) => {
                    debug!(source = %input.display(), output = %output.display(), "converted");
                    report.converted.push(Converted {
                        source: input,
                        output,
                    });
                }
                Err(e) => {
                    warn!(file = %input.display(), error = %e, "conversion failed, skipping");
                    report.failed.push(input);
                }
            }
        }

        if self.consolidate {
            report.consolidated = Some(self.consolidate_outputs(dir, &report.converted)?);
        }

        info!(
            dir = %dir.display(),
            converted = report.converted.len(),
            failed = report.failed.len(),
            format = self.format.extension(),
            "normalize pass complete"
        );
        Ok(report)
    }

    fn consolidate_outputs(&self, dir: &Path, converted: &[Converted]) -> io::Result<PathBuf> {
        let target = dir
            .join(CONSOLIDATED_STEM)
            .with_extension(self.format.extension());

        let mut combined = String::new();
        for item in converted {
            combined.push_str(&fs::read_to_string(&item.output)?);
            combined.push_str("\n\n");
        }
        fs::write(&target, combined)?;

        info!(file = %target.display(), parts = converted.len(), "consolidated output written");
        Ok(target)
    }
}
