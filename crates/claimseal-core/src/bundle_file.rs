//! Reading and writing bundle files.
//!
//! `-` stands for stdin on read and stdout on write.

use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::domain::bundle::Bundle;
use crate::domain::error::Result;

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Raw bundle text, unvalidated.
pub async fn read_bundle_text(path: &Path) -> Result<String> {
    if is_stdio(path) {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        return Ok(text);
    }
    debug!(path = %path.display(), "reading bundle");
    Ok(tokio::fs::read_to_string(path).await?)
}

/// Write a bundle in canonical form, pretty-printed with a trailing newline.
pub async fn write_bundle(path: &Path, bundle: &Bundle) -> Result<()> {
    let mut text = bundle.to_json_pretty()?;
    text.push('\n');
    if is_stdio(path) {
        let mut out = tokio::io::stdout();
        out.write_all(text.as_bytes()).await?;
        out.flush().await?;
        return Ok(());
    }
    debug!(path = %path.display(), "writing bundle");
    tokio::fs::write(path, text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bundle::{parse_bundle, Claim};
    use render_client::{Execution, Snapshot};

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        let bundle = Bundle::draft(
            Claim::default(),
            Snapshot::new("draw()", 1, vec![0.0; 10], Execution::still()),
        );

        write_bundle(&path, &bundle).await.unwrap();
        let text = read_bundle_text(&path).await.unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(parse_bundle(&text).unwrap(), bundle);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = read_bundle_text(Path::new("/definitely/not/here.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("io error"));
    }
}
