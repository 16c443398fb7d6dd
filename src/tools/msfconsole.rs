use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::Invoker;
use crate::error::{EdgeError, Result, ToolError};

pub fn import_args(xml: &Path) -> Vec<String> {
    vec![
        "-q".to_string(),
        "-x".to_string(),
        format!("db_import {}; exit", xml.display()),
    ]
}

/// Imports one nmap XML file into the Metasploit database.
pub async fn import(
    invoker: &dyn Invoker,
    binary: &str,
    xml: &Path,
    timeout: Option<Duration>,
) -> std::result::Result<(), ToolError> {
    invoker.invoke(binary, &import_args(xml), timeout).await?;
    Ok(())
}

/// Lists `*.xml` files directly inside `dir`, sorted by name.
pub fn xml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| EdgeError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| EdgeError::io(dir, e))?.path();
        let is_xml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("xml"))
            .unwrap_or(false);
        if is_xml && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
