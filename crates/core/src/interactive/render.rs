//! Preview rendering boundary. The renderer is a black box that takes a
//! slug and an offset and either succeeds or fails.

use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};

pub trait PreviewRenderer {
    fn render(&mut self, slug: &str, offset: f64) -> Result<()>;
}

impl<P: PreviewRenderer + ?Sized> PreviewRenderer for &mut P {
    fn render(&mut self, slug: &str, offset: f64) -> Result<()> {
        (**self).render(slug, offset)
    }
}

/// Runs an external program once per preview.
///
/// `{slug}` and `{offset}` in the arguments are substituted; when neither
/// placeholder appears, `--slug <slug> --offset <offset>` is appended.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandRenderer {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
        }
    }

    /// Final argument list for one invocation.
    pub fn build_args(&self, slug: &str, offset: f64) -> Vec<String> {
        let offset = format!("{:.2}", offset);
        let templated = self
            .args
            .iter()
            .any(|a| a.contains("{slug}") || a.contains("{offset}"));
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{slug}", slug).replace("{offset}", &offset))
            .collect();
        if !templated {
            args.extend(["--slug".to_string(), slug.to_string(), "--offset".to_string(), offset]);
        }
        args
    }
}

impl PreviewRenderer for CommandRenderer {
    fn render(&mut self, slug: &str, offset: f64) -> Result<()> {
        let args = self.build_args(slug, offset);
        log::info!("$ {} {}", self.program, args.join(" "));
        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .with_context(|| format!("Failed to launch renderer: {}", self.program))?;
        if !status.success() {
            bail!("Renderer exited with {}", status);
        }
        Ok(())
    }
}
