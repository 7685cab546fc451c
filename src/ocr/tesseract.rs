//! Tesseract command-line engine.

use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use image::DynamicImage;

use super::OcrEngine;
use crate::error::{Error, Result};

/// Runs the `tesseract` executable, piping a PNG in and reading text out.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    language: Option<String>,
    page_segmentation: Option<u8>,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            language: None,
            page_segmentation: None,
        }
    }
}

impl TesseractCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Recognition language(s), e.g. `eng` or `eng+deu`.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Page segmentation mode (`--psm`).
    pub fn with_page_segmentation(mut self, psm: u8) -> Self {
        self.page_segmentation = Some(psm);
        self
    }

    /// Whether the executable can be started.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok()
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.binary);
        command.arg("stdin").arg("stdout");
        if let Some(language) = &self.language {
            command.arg("-l").arg(language);
        }
        if let Some(psm) = self.page_segmentation {
            command.arg("--psm").arg(psm.to_string());
        }
        command
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &DynamicImage) -> Result<String> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;

        let mut child = self
            .command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Ocr(format!("failed to run {}: {}", self.binary.display(), e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .map_err(|e| Error::Ocr(format!("failed to send image: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::Ocr(format!("tesseract did not finish: {}", e)))?;
        if !output.status.success() {
            return Err(Error::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
