use crate::prelude::*;
use crate::prelude::{eprintln, println};

#[derive(Debug, clap::Parser)]
#[command(name = "extract")]
#[command(about = "Extract the outline of a PDF file as JSON")]
pub struct App {
    /// Path to the PDF file
    pub path: std::path::PathBuf,
}

pub async fn run(app: App, global: crate::Global) -> Result<()> {
    if global.verbose {
        eprintln!("Reading {}...", app.path.display());
    }

    let bytes = std::fs::read(&app.path)
        .wrap_err_with(|| format!("cannot read {}", app.path.display()))?;
    let result = outline::extract_outline(&bytes).map_err(|e| eyre!(e))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
